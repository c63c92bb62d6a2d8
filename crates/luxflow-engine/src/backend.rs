//! Output backend interface and built-in backends
//!
//! Hardware adapters (USB dongles, MIDI converters, network nodes) live
//! behind the [`OutputBackend`] trait. The router never sees a concrete
//! driver type; it routes universes to whatever implements the trait.
//!
//! Implementations must not block indefinitely in [`write_universe`]:
//! the frame cadence tolerates a slow backend degrading its own output
//! freshness, but drivers are expected to buffer internally and return
//! promptly.
//!
//! [`write_universe`]: OutputBackend::write_universe

use luxflow_core::{EngineError, Result, UNIVERSE_SIZE};
use parking_lot::Mutex;
use tracing::trace;

/// Name under which [`OutputRouter`](crate::router::OutputRouter)
/// auto-registers the built-in dummy backend.
pub const DUMMY_BACKEND_NAME: &str = "Dummy";

/// Capability interface implemented by every output adapter.
///
/// Backends are shared behind `Arc` across patches and administrative
/// threads, so all methods take `&self`; implementations use interior
/// mutability for sockets, sequence counters and open counts.
pub trait OutputBackend: Send + Sync {
    /// Stable backend name, unique within a router's registry.
    fn name(&self) -> &str;

    /// Human-readable labels of this backend's output lines. Used for
    /// administrative binding only, not in the tick path.
    fn outputs(&self) -> Vec<String>;

    /// Open an output line. Idempotent: opening an already-open line
    /// increments its open count and succeeds.
    fn open_output(&self, output: usize) -> Result<()>;

    /// Close an output line. Always safe to call; the underlying
    /// resource is released when the open count returns to zero.
    fn close_output(&self, output: usize) -> Result<()>;

    /// Write one universe's worth of channel data to an output line.
    fn write_universe(&self, output: usize, data: &[u8; UNIVERSE_SIZE]) -> Result<()>;
}

/// No-op sink backend.
///
/// Auto-registered by the router and patched to every universe at
/// construction so the engine is always in a valid, dispatchable state
/// with zero real hardware attached. Open counts are tracked so tests
/// can assert open/close balance.
pub struct DummyBackend {
    open_counts: Mutex<Vec<usize>>,
}

impl DummyBackend {
    /// Create a dummy backend with `outputs` output lines.
    pub fn new(outputs: usize) -> Self {
        Self {
            open_counts: Mutex::new(vec![0; outputs]),
        }
    }

    /// Current open count for an output line; 0 for unknown lines.
    pub fn open_count(&self, output: usize) -> usize {
        self.open_counts.lock().get(output).copied().unwrap_or(0)
    }
}

impl OutputBackend for DummyBackend {
    fn name(&self) -> &str {
        DUMMY_BACKEND_NAME
    }

    fn outputs(&self) -> Vec<String> {
        let count = self.open_counts.lock().len();
        (0..count).map(|i| format!("Dummy output {}", i + 1)).collect()
    }

    fn open_output(&self, output: usize) -> Result<()> {
        let mut counts = self.open_counts.lock();
        let Some(count) = counts.get_mut(output) else {
            return Err(EngineError::InvalidOutput {
                backend: DUMMY_BACKEND_NAME.to_string(),
                output,
            });
        };
        *count += 1;
        Ok(())
    }

    fn close_output(&self, output: usize) -> Result<()> {
        let mut counts = self.open_counts.lock();
        if let Some(count) = counts.get_mut(output) {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }

    fn write_universe(&self, output: usize, _data: &[u8; UNIVERSE_SIZE]) -> Result<()> {
        trace!(output, "dummy backend discarding universe");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_balance() {
        let backend = DummyBackend::new(2);
        assert_eq!(backend.open_count(0), 0);

        backend.open_output(0).unwrap();
        backend.open_output(0).unwrap();
        assert_eq!(backend.open_count(0), 2);

        backend.close_output(0).unwrap();
        assert_eq!(backend.open_count(0), 1);

        // Closing an already-closed line stays at zero.
        backend.close_output(0).unwrap();
        backend.close_output(0).unwrap();
        assert_eq!(backend.open_count(0), 0);
    }

    #[test]
    fn test_invalid_output_rejected_on_open() {
        let backend = DummyBackend::new(1);
        assert!(matches!(
            backend.open_output(1),
            Err(EngineError::InvalidOutput { output: 1, .. })
        ));
    }

    #[test]
    fn test_write_is_noop() {
        let backend = DummyBackend::new(1);
        let frame = [0u8; UNIVERSE_SIZE];
        backend.write_universe(0, &frame).unwrap();
        // Unknown outputs are silently discarded too.
        backend.write_universe(5, &frame).unwrap();
    }

    #[test]
    fn test_output_labels() {
        let backend = DummyBackend::new(3);
        let labels = backend.outputs();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], "Dummy output 1");
    }
}
