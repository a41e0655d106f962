//! # Gradient Skip Set
//!
//! A per-step transient set of parameter identities whose update must be
//! bypassed (e.g. parameters not involved in this step's loss). Populated
//! externally before `step()`, consumed entry-by-entry as the update loop
//! visits each parameter, and required to be empty once the pass completes.
//! A leftover entry means the caller registered a parameter the optimizer
//! never visited, which is a consistency bug, not a recoverable condition.

use crate::tensor::ParamId;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct GradSkipSet {
    set: HashSet<ParamId>,
}

impl GradSkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parameter to be skipped on the next step.
    pub fn mark(&mut self, id: ParamId) {
        self.set.insert(id);
    }

    /// Consumes an entry. Returns whether the parameter was marked.
    pub fn take(&mut self, id: ParamId) -> bool {
        self.set.remove(&id)
    }

    pub fn contains(&self, id: ParamId) -> bool {
        self.set.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Empties the set, returning the leftover identities in sorted order
    /// (sorted so error messages are deterministic).
    pub fn drain(&mut self) -> Vec<ParamId> {
        let mut leftover: Vec<ParamId> = self.set.drain().collect();
        leftover.sort();
        leftover
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::zeros;

    #[test]
    fn mark_take_drain() {
        let a = zeros(&[1], true);
        let b = zeros(&[1], true);
        let mut skip = GradSkipSet::new();
        skip.mark(a.id());
        skip.mark(b.id());
        assert_eq!(skip.len(), 2);
        assert!(skip.take(a.id()));
        assert!(!skip.take(a.id()));
        let leftover = skip.drain();
        assert_eq!(leftover, vec![b.id()]);
        assert!(skip.is_empty());
    }
}
