//! Compilation event model.
//!
//! This module holds:
//! - The package → class → member tree (arena with index back-links)
//! - Per-member compilation records and their lifecycle
//! - Format-neutral events that parsers apply to the model

pub mod compilation;
pub mod events;
pub mod tree;

// Re-export main types
pub use compilation::{
    CompilationRecord, CompilationState, CompileKey, CompileKind, Temperature, VendorDetail,
};
pub use events::CompilationEvent;
pub use tree::{
    ClassDescriptor, ClassId, JitModel, MemberDescriptor, MemberId, PackageDescriptor, PackageId,
};
