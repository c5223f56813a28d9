// Severity tiers for the S4C metric
use crate::domain::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Good,
    Medium,
    Bad,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Good, Tier::Medium, Tier::Bad];
}

/// Two cut points; a boundary value belongs to the lower tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierBoundaries {
    good_max: f64,
    medium_max: f64,
}

impl TierBoundaries {
    pub fn new(good_max: f64, medium_max: f64) -> Result<Self, EngineError> {
        if !good_max.is_finite() || !medium_max.is_finite() || good_max >= medium_max {
            return Err(EngineError::InvalidConfig(format!(
                "tier boundaries must be finite and ascending, got {} / {}",
                good_max, medium_max
            )));
        }
        Ok(Self {
            good_max,
            medium_max,
        })
    }

    pub fn classify(&self, metric: f64) -> Tier {
        if metric <= self.good_max {
            Tier::Good
        } else if metric <= self.medium_max {
            Tier::Medium
        } else {
            Tier::Bad
        }
    }
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            good_max: 0.25,
            medium_max: 0.40,
        }
    }
}

/// The set of tiers currently shown by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFilter {
    tiers: BTreeSet<Tier>,
}

impl TierFilter {
    pub fn new<I: IntoIterator<Item = Tier>>(tiers: I) -> Self {
        Self {
            tiers: tiers.into_iter().collect(),
        }
    }

    pub fn allows(&self, tier: Tier) -> bool {
        self.tiers.contains(&tier)
    }

    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.tiers.iter().copied()
    }
}

impl Default for TierFilter {
    fn default() -> Self {
        Self::new(Tier::ALL)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub total: usize,
    pub good: usize,
    pub medium: usize,
    pub bad: usize,
}

impl TierCounts {
    pub fn tally<I: IntoIterator<Item = Tier>>(tiers: I) -> Self {
        tiers.into_iter().fold(Self::default(), |mut counts, tier| {
            counts.total += 1;
            match tier {
                Tier::Good => counts.good += 1,
                Tier::Medium => counts.medium += 1,
                Tier::Bad => counts.bad += 1,
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_belong_to_lower_tier() {
        let b = TierBoundaries::default();
        assert_eq!(b.classify(0.0), Tier::Good);
        assert_eq!(b.classify(0.25), Tier::Good);
        assert_eq!(b.classify(0.2500001), Tier::Medium);
        assert_eq!(b.classify(0.40), Tier::Medium);
        assert_eq!(b.classify(0.4000001), Tier::Bad);
    }

    #[test]
    fn test_boundaries_validation() {
        assert!(TierBoundaries::new(0.4, 0.25).is_err());
        assert!(TierBoundaries::new(0.3, 0.3).is_err());
        assert!(TierBoundaries::new(f64::NAN, 0.3).is_err());
        assert!(TierBoundaries::new(0.1, 0.2).is_ok());
    }

    #[test]
    fn test_filter_and_counts() {
        let filter = TierFilter::new([Tier::Bad]);
        assert!(filter.allows(Tier::Bad));
        assert!(!filter.allows(Tier::Good));
        assert!(TierFilter::default().allows(Tier::Medium));

        let counts = TierCounts::tally([Tier::Good, Tier::Bad, Tier::Bad]);
        assert_eq!(
            counts,
            TierCounts {
                total: 3,
                good: 1,
                medium: 0,
                bad: 2
            }
        );
    }

    #[test]
    fn test_tier_serde_is_lowercase() {
        let tiers: Vec<Tier> = serde_json::from_str(r#"["good","bad"]"#).unwrap();
        assert_eq!(tiers, vec![Tier::Good, Tier::Bad]);
        assert_eq!(serde_json::to_string(&Tier::Medium).unwrap(), "\"medium\"");
    }
}
