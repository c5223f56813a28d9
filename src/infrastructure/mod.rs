// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod csv_source;
pub mod frame_broadcast;
pub mod geocode_cache;
pub mod longdo_geocoder;
pub mod mock_source;
pub mod tokio_scheduler;
