//! Frame aggregation and dispatch
//!
//! The [`OutputRouter`] owns the shared [`FrameBuffer`], the per-universe
//! patch table, the backend registry and the blackout override. Producers
//! gain exclusive write access through [`claim`](OutputRouter::claim) and
//! the composed frame is delivered to backends by
//! [`dump`](OutputRouter::dump).
//!
//! The buffer lock is held only while a claim is outstanding and while
//! `dump` snapshots the frame, never across backend I/O. A stuck driver
//! therefore degrades only its own output freshness; it can never stall
//! the next tick's claim.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use luxflow_core::{EngineError, FrameBuffer, Result, UNIVERSE_SIZE};
use parking_lot::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::backend::{DummyBackend, OutputBackend, DUMMY_BACKEND_NAME};
use crate::patch::OutputPatch;

const BLACKOUT_FRAME: [u8; UNIVERSE_SIZE] = [0u8; UNIVERSE_SIZE];

/// Exclusive write access to the shared frame buffer.
///
/// Dropping the claim releases it. While a claim is live, no dump or
/// second claim can observe the buffer, which is what rules out torn
/// frames.
pub type BufferClaim<'a> = MutexGuard<'a, FrameBuffer>;

/// Routes composed universes to patched backends.
pub struct OutputRouter {
    buffer: Mutex<FrameBuffer>,
    patches: Mutex<Vec<OutputPatch>>,
    backends: Mutex<HashMap<String, Arc<dyn OutputBackend>>>,
    blackout: AtomicBool,
}

impl OutputRouter {
    /// Create a router spanning `universes` universes.
    ///
    /// A [`DummyBackend`] is auto-registered and patched to every
    /// universe, so a fresh router is always dispatchable even with no
    /// real hardware attached.
    pub fn new(universes: usize) -> Self {
        let router = Self {
            buffer: Mutex::new(FrameBuffer::new(universes)),
            patches: Mutex::new((0..universes).map(OutputPatch::new).collect()),
            backends: Mutex::new(HashMap::new()),
            blackout: AtomicBool::new(false),
        };

        let dummy: Arc<dyn OutputBackend> = Arc::new(DummyBackend::new(universes));
        if router.register_backend(dummy).is_ok() {
            for universe in 0..universes {
                if let Err(e) = router.set_patch(universe, DUMMY_BACKEND_NAME, universe) {
                    error!(universe, error = %e, "failed to auto-patch dummy backend");
                }
            }
        }
        router
    }

    /// Number of universes this router spans.
    pub fn universe_count(&self) -> usize {
        self.patches.lock().len()
    }

    /// Acquire exclusive write access to the frame buffer.
    ///
    /// Blocks while another claim is outstanding. Release by dropping
    /// the returned guard.
    pub fn claim(&self) -> BufferClaim<'_> {
        self.buffer.lock()
    }

    /// Deliver the current frame to all patched backends.
    ///
    /// Snapshots the frame and the blackout flag under the buffer lock,
    /// then dispatches with no lock held. With blackout active every
    /// patched universe receives zeros; the stored buffer keeps its
    /// values either way.
    pub fn dump(&self) {
        let (frame, blackout) = {
            let buffer = self.buffer.lock();
            (
                buffer.as_slice().to_vec(),
                self.blackout.load(Ordering::SeqCst),
            )
        };
        let patches: Vec<OutputPatch> = self.patches.lock().clone();

        for patch in &patches {
            if blackout {
                patch.dispatch(&BLACKOUT_FRAME);
                continue;
            }
            let start = patch.universe() * UNIVERSE_SIZE;
            let Some(slice) = frame.get(start..start + UNIVERSE_SIZE) else {
                continue;
            };
            if let Ok(chunk) = <&[u8; UNIVERSE_SIZE]>::try_from(slice) {
                patch.dispatch(chunk);
            }
        }
    }

    /// Patch a universe to an output line of a registered backend.
    ///
    /// The previous binding, if any, is closed first. On failure the
    /// universe is left unpatched.
    pub fn set_patch(&self, universe: usize, backend_name: &str, output: usize) -> Result<()> {
        let backend = self
            .backend(backend_name)
            .ok_or_else(|| EngineError::UnknownBackend(backend_name.to_string()))?;

        let mut patches = self.patches.lock();
        let patch = patches
            .get_mut(universe)
            .ok_or(EngineError::InvalidUniverse(universe))?;
        patch.set(&backend, output)?;
        info!(universe, backend = backend_name, output, "patch updated");
        Ok(())
    }

    /// Unpatch a universe; its dispatch becomes a silent discard.
    pub fn clear_patch(&self, universe: usize) -> Result<()> {
        let mut patches = self.patches.lock();
        let patch = patches
            .get_mut(universe)
            .ok_or(EngineError::InvalidUniverse(universe))?;
        patch.unset();
        info!(universe, "universe unpatched");
        Ok(())
    }

    /// Current (backend name, output line) binding of a universe, if
    /// the universe is valid and patched.
    pub fn patch_info(&self, universe: usize) -> Option<(String, usize)> {
        let patches = self.patches.lock();
        let patch = patches.get(universe)?;
        Some((patch.backend_name()?.to_string(), patch.output()?))
    }

    /// Register a backend. Fails if the name is already taken.
    pub fn register_backend(&self, backend: Arc<dyn OutputBackend>) -> Result<()> {
        let name = backend.name().to_string();
        let mut backends = self.backends.lock();
        if backends.contains_key(&name) {
            return Err(EngineError::DuplicateBackend(name));
        }
        info!(backend = %name, "backend registered");
        backends.insert(name, backend);
        Ok(())
    }

    /// Look up a registered backend by name.
    pub fn backend(&self, name: &str) -> Option<Arc<dyn OutputBackend>> {
        self.backends.lock().get(name).cloned()
    }

    /// Names of all registered backends, sorted.
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Force all dispatched output to zero without touching the stored
    /// buffer.
    pub fn set_blackout(&self, blackout: bool) {
        if self.blackout.swap(blackout, Ordering::SeqCst) != blackout {
            info!(blackout, "blackout changed");
        }
    }

    /// Flip the blackout flag, returning the new state.
    pub fn toggle_blackout(&self) -> bool {
        let new = !self.blackout.fetch_xor(true, Ordering::SeqCst);
        info!(blackout = new, "blackout changed");
        new
    }

    /// Whether blackout is currently active.
    pub fn blackout(&self) -> bool {
        self.blackout.load(Ordering::SeqCst)
    }
}
