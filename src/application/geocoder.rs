// Geocoder seam - reverse lookup of coordinates to a place name
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(String),

    #[error("geocoding service returned status {0}")]
    Status(u16),

    #[error("geocoding response had no place name")]
    NoPlace,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a coordinate to a human-readable place name
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError>;
}
