// Domain layer - Samples, series, classification and playback state
pub mod alert;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod sample;
pub mod series;
pub mod tier;
