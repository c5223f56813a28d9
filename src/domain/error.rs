// Engine error taxonomy

/// Errors reported by the playback engine at its boundary.
///
/// Neither variant is fatal to the process: `EmptyDataset` lets the caller
/// pick a fallback data source, `InvalidConfig` is raised before the engine
/// is built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("no valid samples survived parsing")]
    EmptyDataset,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
