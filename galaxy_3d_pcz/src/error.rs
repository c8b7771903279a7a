//! Error types for the Galaxy3D portal-connected zone core
//!
//! Every failure raised here is a configuration or topology problem of the
//! scene (bad zone bounds, dangling portal, stale key). Expected conditions
//! such as an empty zone or an invisible portal are not errors.

use std::fmt;

/// Result type for zone/portal operations
pub type Galaxy3dResult<T> = Result<T, Galaxy3dError>;

/// Zone/portal core errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Galaxy3dError {
    /// Bad construction or resize parameters (degenerate bounds, depth, unmatched portal)
    InvalidConfiguration(String),

    /// A zone, portal, object or light key that no longer refers to anything
    InvalidKey(String),

    /// Internal topology inconsistency (portal without target zone, etc.)
    InvariantViolation(String),

    /// Name or registration already in use
    AlreadyExists(String),
}

impl fmt::Display for Galaxy3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Galaxy3dError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Galaxy3dError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            Galaxy3dError::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
            Galaxy3dError::AlreadyExists(msg) => write!(f, "Already exists: {}", msg),
        }
    }
}

impl std::error::Error for Galaxy3dError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
