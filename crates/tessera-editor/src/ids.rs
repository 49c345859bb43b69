//! Node ID allocation for editor commands.
//!
//! Commands never mint IDs themselves; the caller injects a generator, so
//! tests and collaborative sessions can control the sequence.

use tessera_core::NodeId;

/// Source of fresh node IDs.
///
/// Implementations need not know the document: commands skip any ID that
/// is already taken and ask again.
pub trait IdGenerator {
    fn next_id(&mut self, prefix: &str) -> NodeId;
}

/// Monotonic `<prefix>_<n>` IDs, `n` starting at 1 and shared across
/// prefixes.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue a sequence, e.g. after loading a document that already
    /// used IDs up to `last`.
    pub fn starting_after(last: u64) -> Self {
        Self { next: last }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> NodeId {
        self.next += 1;
        NodeId::intern(&format!("{prefix}_{}", self.next))
    }
}
