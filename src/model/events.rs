//! Format-neutral compilation events and their application to the model.
//!
//! Every vendor parser reduces its input to these events. Events are applied
//! in the order they appear in the log; nothing is reordered or buffered.

use super::compilation::{CompilationState, CompileKey, VendorDetail};
use super::tree::{JitModel, MemberId};
use crate::parser::signature::MemberSignature;
use crate::parser::tag::LogTag;
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use log::debug;

/// A single lifecycle event for one compile id
#[derive(Debug, Clone)]
pub enum CompilationEvent {
    /// Creates a new QUEUED record
    Queued {
        key: CompileKey,
        signature: MemberSignature,
        tier: Option<u8>,
        stamp_ms: Option<u64>,
        bytecode_size: Option<u64>,
        vendor: VendorDetail,
    },
    /// Compilation work began; attaches the task subtree when there is one
    ///
    /// `queued_ms` restates the queue time when the VM reports how long the
    /// task waited rather than when it was queued. `vendor` replaces the
    /// detail recorded at queue time.
    Started {
        key: CompileKey,
        stamp_ms: Option<u64>,
        queued_ms: Option<u64>,
        vendor: Option<VendorDetail>,
        tag: Option<LogTag>,
    },
    /// nmethod emitted at `[address, address + size)`
    Installed {
        key: CompileKey,
        address: u64,
        size: u64,
        stamp_ms: Option<u64>,
        compiler: Option<String>,
        tier: Option<u8>,
    },
    Failed {
        key: CompileKey,
        reason: Option<String>,
        stamp_ms: Option<u64>,
    },
}

impl CompilationEvent {
    pub fn key(&self) -> &CompileKey {
        match self {
            CompilationEvent::Queued { key, .. }
            | CompilationEvent::Started { key, .. }
            | CompilationEvent::Installed { key, .. }
            | CompilationEvent::Failed { key, .. } => key,
        }
    }
}

impl JitModel {
    /// Apply one event
    ///
    /// **Public** - the only way parsers mutate the model
    ///
    /// Returns the member and record index touched. Events for unknown
    /// compile ids and transitions out of terminal states are reported to
    /// `diagnostics` and otherwise dropped.
    pub fn apply(
        &mut self,
        event: CompilationEvent,
        diagnostics: &mut Diagnostics,
    ) -> Option<(MemberId, usize)> {
        let event = match event {
            CompilationEvent::Queued {
                key,
                signature,
                tier,
                stamp_ms,
                bytecode_size,
                vendor,
            } => {
                let member = self.get_or_create_member(&signature);
                let descriptor = self.member_mut(member);
                let index = descriptor.push_compilation(&key);
                if let Some(record) = descriptor.compilation_mut(index) {
                    record.tier = tier;
                    record.queued_ms = stamp_ms;
                    record.bytecode_size = bytecode_size;
                    record.vendor = vendor;
                }
                if self.compile_ids.insert(key.clone(), (member, index)).is_some() {
                    debug!("Compile id {} reused, latest queue entry wins", key);
                }
                return Some((member, index));
            }
            other => other,
        };

        let Some((member, index)) = self.compile_ids.get(event.key()).copied() else {
            diagnostics.report(
                DiagnosticKind::UnknownCompileId,
                format!("Event for unknown compile id {} dropped", event.key()),
            );
            return None;
        };
        let record = self.member_mut(member).compilation_mut(index)?;

        let transition = match event {
            CompilationEvent::Queued { .. } => Ok(()),
            CompilationEvent::Started {
                stamp_ms,
                queued_ms,
                vendor,
                tag,
                ..
            } => {
                if stamp_ms.is_some() {
                    record.compile_start_ms = stamp_ms;
                }
                if queued_ms.is_some() {
                    record.queued_ms = queued_ms;
                }
                if let Some(vendor) = vendor {
                    record.vendor = vendor;
                }
                if tag.is_some() {
                    record.tag = tag;
                }
                Ok(())
            }
            CompilationEvent::Installed {
                address,
                size,
                stamp_ms,
                compiler,
                tier,
                ..
            } => {
                if compiler.is_some() {
                    record.compiler = compiler;
                }
                if tier.is_some() {
                    record.tier = tier;
                }
                record.mark_installed(address, size, stamp_ms)
            }
            CompilationEvent::Failed {
                reason, stamp_ms, ..
            } => record.mark_failed(reason, stamp_ms),
        };

        if let Err(state) = transition {
            let compile_id = record.key();
            diagnostics.report(
                DiagnosticKind::InvalidTransition,
                format!(
                    "Compile id {} already {}, ignoring further completion",
                    compile_id, state
                ),
            );
        }
        Some((member, index))
    }

    /// Count of records currently in a state
    pub fn count_in_state(&self, state: CompilationState) -> usize {
        self.compilations().filter(|c| c.state() == state).count()
    }
}
