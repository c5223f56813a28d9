// Application layer - Use cases and the seams to external collaborators
pub mod enrichment_service;
pub mod frame_sink;
pub mod geocoder;
pub mod playback_engine;
pub mod playback_service;
pub mod scheduler;
