// Memoizing geocoder decorator
use crate::application::geocoder::{GeocodeError, Geocoder};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Caches successful lookups by coordinates rounded to 4 decimal places
/// (about 11 m). Failures are not cached.
pub struct CachingGeocoder {
    inner: Arc<dyn Geocoder>,
    places: Mutex<HashMap<(i64, i64), String>>,
}

impl CachingGeocoder {
    pub fn new(inner: Arc<dyn Geocoder>) -> Self {
        Self {
            inner,
            places: Mutex::new(HashMap::new()),
        }
    }

    fn key(latitude: f64, longitude: f64) -> (i64, i64) {
        (
            (latitude * 10_000.0).round() as i64,
            (longitude * 10_000.0).round() as i64,
        )
    }

    fn cached(&self, key: (i64, i64)) -> Option<String> {
        self.places
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned()
    }
}

#[async_trait]
impl Geocoder for CachingGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let key = Self::key(latitude, longitude);
        if let Some(place) = self.cached(key) {
            tracing::trace!(latitude, longitude, "geocode cache hit");
            return Ok(place);
        }

        let place = self.inner.reverse(latitude, longitude).await?;
        self.places
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, place.clone());
        Ok(place)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn reverse(&self, latitude: f64, _longitude: f64) -> Result<String, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if latitude < 0.0 {
                Err(GeocodeError::NoPlace)
            } else {
                Ok("Hat Yai".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_hits_and_misses() {
        let inner = Arc::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
        });
        let cache = CachingGeocoder::new(inner.clone());

        assert_eq!(cache.reverse(7.00001, 100.47).await.unwrap(), "Hat Yai");
        assert_eq!(cache.reverse(7.00002, 100.47).await.unwrap(), "Hat Yai");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        assert!(cache.reverse(-7.0, 100.47).await.is_err());
        assert!(cache.reverse(-7.0, 100.47).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
