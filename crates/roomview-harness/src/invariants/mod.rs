//! Invariant checking for room view tests.
//!
//! Invariants are properties that must always hold during execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible action sequences.
//!
//! # Architecture
//!
//! The coordinator's observable state is captured into a [`ViewSnapshot`]
//! after every action. Each registered [`Invariant`] sees the snapshot before
//! and after the action, so both state and transition properties can be
//! expressed.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let before = ViewSnapshot::capture(&coordinator);
//! coordinator.handle(action, &cache);
//! registry.assert_all(&before, &ViewSnapshot::capture(&coordinator), "after action");
//! ```

mod checks;
mod snapshot;

pub use checks::{ChangeIsNotified, LoadingHasNoRoom, ReplyMatchesRoom};
pub use snapshot::ViewSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked across one coordinator step.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant given the snapshots before and after a step.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, previous: &ViewSnapshot, current: &ViewSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard view invariants.
    ///
    /// Includes:
    /// - [`ReplyMatchesRoom`]: pending reply belongs to the shown room
    /// - [`LoadingHasNoRoom`]: no room ID while an alias is loading
    /// - [`ChangeIsNotified`]: every change bumps the revision
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ReplyMatchesRoom);
        registry.add(LoadingHasNoRoom);
        registry.add(ChangeIsNotified);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants across one step.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(
        &self,
        previous: &ViewSnapshot,
        current: &ViewSnapshot,
    ) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(previous, current).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on the first failing step.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, previous: &ViewSnapshot, current: &ViewSnapshot, context: &str) {
        if let Err(violations) = self.check_all(previous, current) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn initial_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        let snapshot = ViewSnapshot::initial();
        assert!(registry.check_all(&snapshot, &snapshot).is_ok());
    }
}
