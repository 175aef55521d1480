use thiserror::Error;

/// Errors surfaced by the simulation engine.
///
/// Only the kinds that cross an API boundary as a `Result` are represented
/// here. Frame parse failures and routing failures are recoverable at the
/// point they happen (drop the packet, log, move on) and never need to
/// propagate, so they're logged via `tracing` instead of living in this
/// enum. Violations of a resource invariant (a chunk recycled while still
/// referenced, a write past a chunk's capacity) are not recoverable at all
/// and panic immediately instead of flowing through this type.
#[derive(Error, Debug)]
pub enum AraneidError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AraneidError>;
