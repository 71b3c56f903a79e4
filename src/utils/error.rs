//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while decoding a single log, bytecode or assembly line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid line format: {0}")]
    InvalidFormat(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid number '{value}': {reason}")]
    InvalidNumber { value: String, reason: String },

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("Unknown architecture: {0}")]
    UnknownArchitecture(String),
}

/// Errors raised by the compilation event model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Compilation index {index} out of range for {member} ({count} compilations)")]
    InvalidSelection {
        member: String,
        index: usize,
        count: usize,
    },
}

/// Errors that abort the annotation build of a single member
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Annotation at bci {bci} of {member} does not match any instruction ({tag})")]
    OffsetMismatch {
        member: String,
        bci: u32,
        tag: String,
    },

    #[error("Compilation {index} of {member} has no parse tree")]
    MissingParse { member: String, index: usize },

    #[error("Compilation index {index} out of range for {member}")]
    UnknownCompilation { member: String, index: usize },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors from the source-path profile store
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Profile TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Profile TOML serialization error: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Profile '{0}' is built in and cannot be removed")]
    BuiltinProfile(String),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid profile name: '{0}'")]
    InvalidName(String),
}
