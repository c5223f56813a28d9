// Longdo Map reverse-geocoding adapter
use crate::application::geocoder::{GeocodeError, Geocoder};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LongdoGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    #[serde(default)]
    aoi: Option<String>,
}

impl LongdoGeocoder {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn build_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}?lat={}&lon={}&key={}",
            self.endpoint,
            latitude,
            longitude,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl Geocoder for LongdoGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String, GeocodeError> {
        let url = self.build_url(latitude, longitude);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body = response
            .json::<AddressResponse>()
            .await
            .map_err(|e| GeocodeError::Transport(e.to_string()))?;

        match body.aoi {
            Some(aoi) if !aoi.trim().is_empty() => Ok(aoi),
            _ => Err(GeocodeError::NoPlace),
        }
    }
}
