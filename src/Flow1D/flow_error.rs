use super::phase_api::PhaseError;
use thiserror::Error;

/// Errors raised by the one-dimensional flow domain.
///
/// Configuration errors abort the operation that triggered them and leave the
/// domain in its previous configuration. `NotImplemented` marks a capability
/// this domain does not provide, so callers can tell it apart from a bug in
/// their setup.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
    #[error("Invalid transport model '{0}'")]
    InvalidTransportModel(String),
    #[error(
        "Thermal diffusion (the Soret effect) is enabled, and requires using a multicomponent transport model"
    )]
    SoretRequiresMulticomponent,
    #[error("The {side} boundary emissivity must be between 0.0 and 1.0, got {value}")]
    InvalidEmissivity { side: &'static str, value: f64 },
    #[error("Invalid refinement criteria: {0}")]
    InvalidRefineCriteria(String),
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    #[error("Size mismatch: {0}")]
    SizeMismatch(String),
    #[error("No component named '{0}'")]
    UnknownComponent(String),
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
    #[error("Phase error: {0}")]
    Phase(#[from] PhaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl FlowError {
    /// true for errors that signal an unsupported capability rather than a misconfiguration
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, FlowError::NotImplemented(_))
    }
}
