//! The connector error taxonomy.

use thiserror::Error;

/// Everything this connector can fail with.
///
/// Identifier-resolution misses and per-link relation-expansion failures
/// are deliberately not represented here: the former pass the unresolved
/// value through, the latter are swallowed and logged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectorError {
    /// Missing or unusable connector configuration. Fatal for the whole
    /// batch, raised before any request is sent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad input for a single batch item, e.g. an empty field set on
    /// create/update or a missing record id on update.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport or backend failure, surfaced verbatim.
    #[error("request failed: {0}")]
    Transport(String),
}
