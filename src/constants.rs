//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. byte sizes) from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is treated as an invariant shared across the embedding
//! gateway, vector index, and cluster engine. If you need runtime-configurable
//! dimensions:
//!
//! 1. Use [`DimConfig`] to pass dimensions through initialization
//! 2. Use [`validate_embedding_dim`] at module boundaries to catch mismatches early
//! 3. The compile-time constant remains as the default

/// Embedding width every memory vector must conform to (`D`).
pub const DEFAULT_EMBEDDING_DIM: usize = 3072;
pub const EMBEDDING_F32_BYTES: usize = DEFAULT_EMBEDDING_DIM * 4;

/// Default top-K returned by a similarity search when the caller doesn't ask for one.
pub const DEFAULT_TOP_K: usize = 10;

/// Upper bound on `topK` accepted by the search endpoint.
pub const MAX_TOP_K: usize = 200;

/// Length of a generated memory id (`YYYYMMDDHHMMSSmmmNNN`).
pub const MEMORY_ID_LEN: usize = 20;

/// Default deadline a read operation (clusters/topics/graph/trajectory)
/// waits for a coalesced build before surfacing `Timeout`. The build
/// itself is never cancelled by this; it keeps running and populates the
/// cache for the next caller.
pub const DEFAULT_READ_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

/// Runtime dimension configuration for modules that need to agree on vector
/// width at runtime rather than compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration with the specified embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Validates that this configuration is usable.
    ///
    /// Returns an error if `embedding_dim` is zero.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }

    /// Returns the number of bytes needed for an F32 representation.
    pub fn f32_bytes(&self) -> usize {
        self.embedding_dim * 4
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// Use this at module boundaries to catch dimension mismatches early, rather than
/// encountering silent data corruption or panics deep in the processing pipeline.
///
/// # Example
///
/// ```
/// use memoria::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// let provider_dim = 3072;
/// validate_embedding_dim(provider_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_dim_config_validate_success() {
        let config = DimConfig::new(3072);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dim_config_validate_zero() {
        let config = DimConfig::new(0);
        assert_eq!(config.validate(), Err(DimValidationError::ZeroDimension));
    }

    #[test]
    fn test_dim_config_byte_calculations() {
        let config = DimConfig::new(3072);
        assert_eq!(config.f32_bytes(), EMBEDDING_F32_BYTES);
    }

    #[test]
    fn test_validate_embedding_dim_match() {
        assert!(validate_embedding_dim(3072, 3072).is_ok());
    }

    #[test]
    fn test_validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(768, 3072),
            Err(DimValidationError::DimensionMismatch {
                expected: 3072,
                actual: 768
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = DimValidationError::ZeroDimension;
        assert_eq!(err.to_string(), "embedding dimension cannot be zero");

        let err = DimValidationError::DimensionMismatch {
            expected: 3072,
            actual: 768,
        };
        assert!(err.to_string().contains("3072"));
        assert!(err.to_string().contains("768"));
    }
}
