use thiserror::Error;

/// Errors surfaced by the analysis pipeline.
///
/// Unknown ingredient names are deliberately NOT represented here: the
/// aggregator recovers from them locally by skipping the line. Only
/// structurally invalid input or a missing model reaches the caller.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("health score model unavailable: {0}")]
    ModelUnavailable(String),
}
