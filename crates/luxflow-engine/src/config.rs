//! Serializable patch plans
//!
//! A [`PatchPlan`] is the persistable form of a router's patch table:
//! which backend output line each universe should dispatch to. Plans
//! apply entry-by-entry so one bad binding (a missing backend after a
//! hot-unplug, say) does not block the rest.

use serde::{Deserialize, Serialize};

use luxflow_core::EngineError;

use crate::router::OutputRouter;

/// One universe-to-backend binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Universe index
    pub universe: usize,
    /// Backend name as registered with the router
    pub backend: String,
    /// Output line index on the backend
    pub output: usize,
}

/// A set of patch bindings to apply to a router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchPlan {
    /// Bindings, applied in order
    pub entries: Vec<PatchEntry>,
}

impl PatchPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding.
    pub fn add(&mut self, universe: usize, backend: impl Into<String>, output: usize) {
        self.entries.push(PatchEntry {
            universe,
            backend: backend.into(),
            output,
        });
    }

    /// Apply every entry to `router`, returning the entries that failed
    /// together with their errors. Successful entries stay applied.
    pub fn apply(&self, router: &OutputRouter) -> Vec<(PatchEntry, EngineError)> {
        let mut failures = Vec::new();
        for entry in &self.entries {
            if let Err(e) = router.set_patch(entry.universe, &entry.backend, entry.output) {
                failures.push((entry.clone(), e));
            }
        }
        failures
    }

    /// Snapshot the currently patched universes of `router`.
    pub fn capture(router: &OutputRouter) -> Self {
        let mut plan = Self::new();
        for universe in 0..router.universe_count() {
            if let Some((backend, output)) = router.patch_info(universe) {
                plan.add(universe, backend, output);
            }
        }
        plan
    }
}
