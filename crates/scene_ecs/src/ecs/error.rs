//! ECS error types

use thiserror::Error;

use super::SystemType;
use crate::scene::LoadError;

/// Errors raised by the manager and built-in component parsing
#[derive(Error, Debug)]
pub enum EcsError {
    /// A system of the same type is already registered
    #[error("System '{0}' is already registered")]
    DuplicateSystem(SystemType),

    /// Unrecognized mesh, primitive or light kind
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    /// Parameters could not be parsed
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// A model was requested but no loader is installed
    #[error("No model loader installed")]
    LoaderMissing,

    /// Model loading failed
    #[error("Model load failed: {0}")]
    Load(#[from] LoadError),
}
