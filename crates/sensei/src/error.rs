// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by every SENSEI subsystem.
//!
//! All fallible operations in the crate return [`Result`]. The variants map
//! one-to-one onto the stable error codes surfaced in logs, so every layer
//! can report a failure without stringly-typed guessing.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by SENSEI operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // I/O and link errors
    // ========================================================================
    /// Socket or file I/O failure.
    Io(std::io::Error),
    /// A device packet could not be encoded (e.g. pin list overflow).
    Encoding(String),
    /// A received device packet failed CRC verification.
    BadCrc,
    /// An outbound packet was retransmitted too many times without an ack.
    TooManyTimeouts,

    // ========================================================================
    // Configuration errors
    // ========================================================================
    /// The configuration document is not well-formed.
    Parsing(String),
    /// A required key is missing or an enum string is not recognised.
    Parameter(String),

    // ========================================================================
    // Command application errors
    // ========================================================================
    /// A command carried a value outside its legal domain.
    InvalidValue,
    /// A scale range violated its ordering or resolution bounds.
    InvalidRange,
    /// A range was accepted but had to be clamped to stay consistent.
    ClipWarning,
    /// A user-frontend port outside the allowed 1000..=65535 window.
    InvalidPortNumber(i64),
    /// The command type is not meaningful for the receiving sensor type.
    UnhandledCommand,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Encoding(msg) => write!(f, "Packet encoding error: {}", msg),
            Error::BadCrc => write!(f, "Device packet failed CRC check"),
            Error::TooManyTimeouts => write!(f, "Packet retransmitted too many times without ack"),
            Error::Parsing(msg) => write!(f, "Configuration parsing error: {}", msg),
            Error::Parameter(msg) => write!(f, "Configuration parameter error: {}", msg),
            Error::InvalidValue => write!(f, "Value outside legal domain"),
            Error::InvalidRange => write!(f, "Invalid scale range"),
            Error::ClipWarning => write!(f, "Range clamped to stay consistent"),
            Error::InvalidPortNumber(port) => {
                write!(f, "Invalid port number: {} (must be 1000-65535)", port)
            }
            Error::UnhandledCommand => write!(f, "Command not handled for this sensor type"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
