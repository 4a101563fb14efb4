use thiserror::Error;

/// Result type for extraction
pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// A built-in symbol pattern failed to compile
    #[error("Invalid symbol pattern: {0}")]
    PatternError(#[from] regex::Error),
}
