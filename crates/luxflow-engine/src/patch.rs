//! Universe patch bindings
//!
//! An [`OutputPatch`] binds one universe to exactly one (backend, output
//! line) pair and owns the open/close lifecycle of that line. A patch
//! with no binding is the unpatched state and silently discards
//! dispatch for its universe.

use std::sync::{Arc, Weak};

use luxflow_core::{EngineError, Result, UNIVERSE_SIZE};
use tracing::{debug, warn};

use crate::backend::OutputBackend;

/// Binding between one universe and one backend output line.
///
/// Holds the backend weakly; if the backend is dropped out from under
/// the patch, dispatch degrades to a silent discard instead of keeping
/// the driver alive.
#[derive(Clone)]
pub struct OutputPatch {
    universe: usize,
    binding: Option<Binding>,
}

#[derive(Clone)]
struct Binding {
    backend: Weak<dyn OutputBackend>,
    backend_name: String,
    output: usize,
}

impl OutputPatch {
    pub(crate) fn new(universe: usize) -> Self {
        Self {
            universe,
            binding: None,
        }
    }

    /// The universe this patch slot belongs to.
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Whether a backend line is currently bound.
    pub fn is_patched(&self) -> bool {
        self.binding.is_some()
    }

    /// Name of the bound backend, if any.
    pub fn backend_name(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.backend_name.as_str())
    }

    /// Bound output line index, if any.
    pub fn output(&self) -> Option<usize> {
        self.binding.as_ref().map(|b| b.output)
    }

    /// Bind this universe to `output` on `backend`, opening the line.
    ///
    /// Any previous binding is closed first. An invalid output index or
    /// an open failure leaves the patch unset and returns the error.
    pub fn set(&mut self, backend: &Arc<dyn OutputBackend>, output: usize) -> Result<()> {
        self.unset();

        if output >= backend.outputs().len() {
            return Err(EngineError::InvalidOutput {
                backend: backend.name().to_string(),
                output,
            });
        }

        if let Err(e) = backend.open_output(output) {
            warn!(
                universe = self.universe,
                backend = backend.name(),
                output,
                error = %e,
                "failed to open backend output"
            );
            return Err(e);
        }

        debug!(
            universe = self.universe,
            backend = backend.name(),
            output,
            "universe patched"
        );
        self.binding = Some(Binding {
            backend: Arc::downgrade(backend),
            backend_name: backend.name().to_string(),
            output,
        });
        Ok(())
    }

    /// Close the bound line and clear the binding. Safe on an already
    /// unset patch.
    pub fn unset(&mut self) {
        let Some(binding) = self.binding.take() else {
            return;
        };
        let Some(backend) = binding.backend.upgrade() else {
            return;
        };
        if let Err(e) = backend.close_output(binding.output) {
            warn!(
                universe = self.universe,
                backend = binding.backend_name,
                output = binding.output,
                error = %e,
                "failed to close backend output"
            );
        }
    }

    /// Forward one universe's worth of bytes to the bound backend.
    ///
    /// No-op when unpatched. Backend write errors are swallowed so one
    /// failing device cannot stall the tick.
    pub fn dispatch(&self, data: &[u8; UNIVERSE_SIZE]) {
        let Some(binding) = &self.binding else {
            return;
        };
        let Some(backend) = binding.backend.upgrade() else {
            return;
        };
        if let Err(e) = backend.write_universe(binding.output, data) {
            debug!(
                universe = self.universe,
                backend = binding.backend_name,
                error = %e,
                "backend write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn dummy(outputs: usize) -> (Arc<DummyBackend>, Arc<dyn OutputBackend>) {
        let concrete = Arc::new(DummyBackend::new(outputs));
        let erased: Arc<dyn OutputBackend> = concrete.clone();
        (concrete, erased)
    }

    #[test]
    fn test_set_opens_line() {
        let (concrete, backend) = dummy(2);
        let mut patch = OutputPatch::new(0);

        patch.set(&backend, 1).unwrap();
        assert!(patch.is_patched());
        assert_eq!(patch.backend_name(), Some("Dummy"));
        assert_eq!(patch.output(), Some(1));
        assert_eq!(concrete.open_count(1), 1);
    }

    #[test]
    fn test_invalid_output_leaves_patch_unset() {
        let (_, backend) = dummy(1);
        let mut patch = OutputPatch::new(0);
        patch.set(&backend, 0).unwrap();

        assert!(patch.set(&backend, 5).is_err());
        assert!(!patch.is_patched());
    }

    #[test]
    fn test_replacing_binding_closes_old_line() {
        let (concrete, backend) = dummy(2);
        let mut patch = OutputPatch::new(0);

        patch.set(&backend, 0).unwrap();
        patch.set(&backend, 1).unwrap();
        assert_eq!(concrete.open_count(0), 0);
        assert_eq!(concrete.open_count(1), 1);
    }

    #[test]
    fn test_unset_is_idempotent() {
        let (concrete, backend) = dummy(1);
        let mut patch = OutputPatch::new(0);
        patch.set(&backend, 0).unwrap();

        patch.unset();
        patch.unset();
        assert!(!patch.is_patched());
        assert_eq!(concrete.open_count(0), 0);
    }

    #[test]
    fn test_dispatch_unpatched_is_noop() {
        let patch = OutputPatch::new(0);
        patch.dispatch(&[0u8; UNIVERSE_SIZE]);
    }

    #[test]
    fn test_dispatch_survives_dropped_backend() {
        let mut patch = OutputPatch::new(0);
        {
            let (_, backend) = dummy(1);
            patch.set(&backend, 0).unwrap();
        }
        // Backend is gone; dispatch and unset must both degrade quietly.
        patch.dispatch(&[0u8; UNIVERSE_SIZE]);
        patch.unset();
    }
}
