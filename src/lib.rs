//! JIT Trace Studio
//!
//! Structured analysis of JVM JIT compilation logs from HotSpot,
//! OpenJ9 and Zing, correlated with bytecode and disassembly.
//!
//! This crate provides the core implementation for the
//! `jit-trace` CLI tool.
//!
//! ## Getting Started
//!
//! Most users should install and use the CLI:
//!
//! ```bash
//! cargo install jit-trace-studio
//! jit-trace analyze --log hotspot_pid1234.log --summary
//! ```
//!
//! Library users feed lines to a [`parser::JitLogParser`] and query the
//! resulting [`model::JitModel`].

pub mod analysis;
pub mod assembly;
pub mod bytecode;
pub mod commands;
pub mod model;
pub mod output;
pub mod parser;
pub mod utils;
