// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for hwbridge.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Resource access --
    /// A device node or HAL module is missing or inaccessible.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// An ioctl or HAL call returned a non-zero status.
    #[error("{operation} failed with status {status}")]
    OperationFailed {
        operation: &'static str,
        status: i32,
    },

    // -- Preconditions --
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    #[error("HAL version mismatch: expected {expected:#06x}, got {actual:#06x}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("operation not supported")]
    Unsupported,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Managed runtime --
    #[error("platform bridge error: {0}")]
    Bridge(String),
}

impl BridgeError {
    /// Shorthand for a HAL or ioctl call that returned `status`.
    pub fn failed(operation: &'static str, status: i32) -> Self {
        Self::OperationFailed { operation, status }
    }

    /// `true` when the error means "not there", as opposed to "there but broken".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ResourceUnavailable(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
