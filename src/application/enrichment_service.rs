// Enrichment service - staggered, best-effort place-name lookups
use crate::application::geocoder::Geocoder;
use crate::domain::alert::{EnrichmentResult, LookupRequest};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_PLACEHOLDER: &str = "location unavailable";

#[derive(Clone)]
pub struct EnrichmentService {
    geocoder: Arc<dyn Geocoder>,
    timeout: Duration,
    placeholder: String,
    spacing: Duration,
    next_free: Arc<Mutex<Instant>>,
}

impl EnrichmentService {
    /// `spacing` is the minimum gap kept between the last lookup of one batch
    /// and the first of the next.
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        timeout: Duration,
        placeholder: String,
        spacing: Duration,
    ) -> Self {
        Self {
            geocoder,
            timeout,
            placeholder,
            spacing,
            next_free: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Spawn one task per lookup. Each waits out its stagger delay, queries
    /// the geocoder and hands the result to `deliver`. Failures and timeouts
    /// deliver the placeholder; tasks are never cancelled.
    pub fn dispatch<F>(&self, lookups: Vec<LookupRequest>, deliver: F)
    where
        F: Fn(EnrichmentResult) + Clone + Send + 'static,
    {
        let base = self.reserve(&lookups);

        for lookup in lookups {
            let service = self.clone();
            let deliver = deliver.clone();

            tokio::spawn(async move {
                tokio::time::sleep_until(base + lookup.delay).await;
                let place = service.resolve(lookup.latitude, lookup.longitude).await;
                deliver(EnrichmentResult {
                    key: lookup.key,
                    place,
                });
            });
        }
    }

    /// Start of the window for a new batch. A batch keeps its own delays but
    /// never starts before the previous batch has finished its slots.
    fn reserve(&self, lookups: &[LookupRequest]) -> Instant {
        let now = Instant::now();
        let mut next_free = self
            .next_free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let base = (*next_free).max(now);
        if let Some(last) = lookups.iter().map(|lookup| lookup.delay).max() {
            *next_free = base + last + self.spacing;
        }
        base
    }

    async fn resolve(&self, latitude: f64, longitude: f64) -> String {
        match tokio::time::timeout(self.timeout, self.geocoder.reverse(latitude, longitude)).await {
            Ok(Ok(place)) => place,
            Ok(Err(e)) => {
                tracing::warn!(latitude, longitude, error = %e, "reverse geocoding failed");
                self.placeholder.clone()
            }
            Err(_) => {
                tracing::warn!(latitude, longitude, timeout = ?self.timeout, "reverse geocoding timed out");
                self.placeholder.clone()
            }
        }
    }
}
