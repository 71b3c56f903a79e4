//! JIT log parsing.
//!
//! This module handles:
//! - Reassembling HotSpot's line-oriented tag stream into tag trees
//! - Decoding J9 and Zing single-line compile records
//! - Detecting which dialect a log is written in
//! - Member signatures shared across formats

pub mod format;
pub mod hotspot;
pub mod j9;
pub mod signature;
pub mod tag;
pub mod tag_processor;
pub mod zing;

// Re-export main types
pub use format::{parse_lines, JitLogParser, LogFormat};
pub use hotspot::{HotSpotLogParser, TagKind, TaskMethodIndex};
pub use j9::{parse_j9_line, J9CompileLine, J9LogParser, J9Outcome};
pub use signature::{MemberSignature, Modifier};
pub use tag::{parse_tag_line, LogTag, TagLine};
pub use tag_processor::TagProcessor;
pub use zing::{classify_line, ZingCompilation, ZingLineKind, ZingLogParser};
