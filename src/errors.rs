//! Typed error definitions for the retargeting core.
//!
//! NO PANICS in consensus path - all errors are typed and recoverable.
//! Defense-in-depth: explicit error codes for observability and debugging.

use thiserror::Error;

/// Result type alias for retargeting operations
pub type Result<T> = std::result::Result<T, RetargetError>;

/// Retargeting-core errors - NEVER panic, always return typed error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetargetError {
    // ==================== ARITHMETIC ERRORS (BIG-001) ====================
    #[error("value out of range for i64: {context}")]
    OutOfRange { context: String },

    #[error("division by zero: {context}")]
    DivisionByZero { context: String },

    // ==================== COMPACT-TARGET ERRORS ====================
    #[error("invalid compact target 0x{nbits:08x}: negative={negative}, overflow={overflow}")]
    InvalidCompact {
        nbits: u32,
        negative: bool,
        overflow: bool,
    },

    // ==================== CODEC ERRORS ====================
    #[error("malformed varint encoding")]
    OverlongVarint,

    #[error("truncated big-integer encoding: expected {expected} bytes, got {actual}")]
    TruncatedEncoding { expected: usize, actual: usize },

    // ==================== CHAIN-VIEW ERRORS ====================
    #[error("chain view walk exhausted after {steps} steps")]
    ChainWalkExhausted { steps: u32 },
}

impl RetargetError {
    /// Stable machine-readable code for operator dashboards.
    pub fn error_code(&self) -> &'static str {
        match self {
            RetargetError::OutOfRange { .. } => "E1001",
            RetargetError::DivisionByZero { .. } => "E1002",
            RetargetError::InvalidCompact { .. } => "E2001",
            RetargetError::OverlongVarint => "E3001",
            RetargetError::TruncatedEncoding { .. } => "E3002",
            RetargetError::ChainWalkExhausted { .. } => "E4001",
        }
    }

    /// Whether a caller can reasonably retry or work around this (vs. a bug).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RetargetError::InvalidCompact { .. } | RetargetError::ChainWalkExhausted { .. }
        )
    }

    /// Whether this indicates a consensus-threatening condition worth paging on.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            RetargetError::DivisionByZero { .. } | RetargetError::TruncatedEncoding { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<RetargetError> {
        vec![
            RetargetError::OutOfRange {
                context: "test".into(),
            },
            RetargetError::DivisionByZero {
                context: "test".into(),
            },
            RetargetError::InvalidCompact {
                nbits: 0,
                negative: false,
                overflow: false,
            },
            RetargetError::OverlongVarint,
            RetargetError::TruncatedEncoding {
                expected: 4,
                actual: 2,
            },
            RetargetError::ChainWalkExhausted { steps: 144 },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(|e| e.error_code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes.len(), sorted.len());
    }

    #[test]
    fn recoverable_and_critical_are_disjoint() {
        for e in all_variants() {
            assert!(!(e.is_recoverable() && e.is_critical()));
        }
    }
}
