//! Error Handling
//!
//! This module provides the error type shared by the recompiler components, built
//! with `thiserror`. Decoding never produces an error (unknown encodings decode to a
//! sentinel opcode), so the variants here cover the places where the pipeline can
//! actually refuse input.
//!
//! # Error Categories
//! - **Image errors**: malformed DOL/ELF containers, out-of-range reads
//! - **Configuration errors**: unparseable override documents, failed validation
//! - **Graph errors**: mutation of a function that was never added
//! - **I/O errors**: reading configuration or writing generated sources

use thiserror::Error;

/// Recompiler error types.
///
/// Every variant carries a suggestion so that a failed run tells the user what to
/// look at next.
#[derive(Error, Debug, Clone)]
pub enum RecompilerError {
    /// Binary container could not be parsed.
    #[error("Image parsing error: {message}\nSuggestion: {suggestion}")]
    ImageParseError { message: String, suggestion: String },

    /// Read outside of every mapped section.
    #[error("Address 0x{address:08X} is not mapped by any section\nSuggestion: {suggestion}")]
    UnmappedAddress { address: u32, suggestion: String },

    /// Configuration document could not be parsed.
    #[error("Configuration error: {message}\nSuggestion: {suggestion}")]
    ConfigError { message: String, suggestion: String },

    /// Configuration parsed but failed validation.
    #[error("Configuration rejected with {} error(s):\n{}", errors.len(), errors.join("\n"))]
    ValidationFailed { errors: Vec<String> },

    /// Graph mutation targeted an address with no function.
    #[error("No function at 0x{address:08X}\nSuggestion: {suggestion}")]
    UnknownFunction { address: u32, suggestion: String },

    /// Jump table violates the alignment/executable invariant.
    #[error("Invalid jump table at 0x{address:08X}: {message}")]
    InvalidJumpTable { address: u32, message: String },

    /// File system error while loading configuration or writing output.
    #[error("I/O error: {message}\nSuggestion: {suggestion}")]
    IoError { message: String, suggestion: String },
}

impl RecompilerError {
    /// Create an image parse error with context.
    pub fn image_parse(message: impl Into<String>) -> Self {
        Self::ImageParseError {
            message: message.into(),
            suggestion: "Check that the executable is unpacked and not corrupted.".to_string(),
        }
    }

    /// Create an unmapped-address error.
    pub fn unmapped(address: u32) -> Self {
        let suggestion = if address & 3 != 0 {
            "Address is not word aligned. Check the pointer being followed."
        } else {
            "Address lies outside every section. Check section bounds in the image."
        };
        Self::UnmappedAddress {
            address,
            suggestion: suggestion.to_string(),
        }
    }

    /// Create a configuration error with context.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            suggestion: "Check the TOML syntax and that addresses are written as integers or \"0x\" strings."
                .to_string(),
        }
    }

    /// Create an unknown-function error.
    pub fn unknown_function(address: u32) -> Self {
        Self::UnknownFunction {
            address,
            suggestion: "Call add_function before mutating the function.".to_string(),
        }
    }

    /// Create an invalid jump table error.
    pub fn invalid_jump_table(address: u32, message: impl Into<String>) -> Self {
        Self::InvalidJumpTable {
            address,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RecompilerError {
    #[cold] // Error paths are cold
    fn from(err: std::io::Error) -> Self {
        RecompilerError::IoError {
            message: err.to_string(),
            suggestion: "Check file permissions and that the path exists.".to_string(),
        }
    }
}

impl From<toml::de::Error> for RecompilerError {
    #[cold]
    fn from(err: toml::de::Error) -> Self {
        RecompilerError::config(err.to_string())
    }
}

impl From<goblin::error::Error> for RecompilerError {
    #[cold]
    fn from(err: goblin::error::Error) -> Self {
        RecompilerError::image_parse(err.to_string())
    }
}

/// Result alias used by the library components.
pub type RecompilerResult<T> = std::result::Result<T, RecompilerError>;
