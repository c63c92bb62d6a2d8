//! The scheduler thread
//!
//! The [`Ticker`] fires at a fixed period. Each tick claims the router's
//! frame buffer, runs every registered source and animation into it,
//! releases the claim and dumps the composed frame to the backends.
//!
//! Registration lists live behind their own locks, distinct from the
//! buffer lock, so starting or stopping a producer never contends on an
//! in-flight tick's claim. The tick holds each list lock across its
//! producer pass; an unregistration call therefore serializes with that
//! pass, and once it returns the producer is never invoked again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::router::OutputRouter;
use crate::source::{SharedAnimation, SharedSource};

/// Default tick period (50 frames per second).
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(20);

/// Fixed-period scheduler driving the dispatch engine.
///
/// `start` spawns the tick thread, `stop` joins it; both are idempotent
/// and `Drop` stops the thread, so it can never outlive the ticker.
pub struct Ticker {
    router: Arc<OutputRouter>,
    period: Duration,
    shared: Arc<Registrations>,
    handle: Option<JoinHandle<()>>,
    stop_tx: Option<Sender<()>>,
}

struct Registrations {
    running: AtomicBool,
    animations: Mutex<Vec<SharedAnimation>>,
    sources: Mutex<Vec<SharedSource>>,
}

impl Ticker {
    /// Create a stopped ticker with the default period.
    pub fn new(router: Arc<OutputRouter>) -> Self {
        Self::with_period(router, DEFAULT_TICK_PERIOD)
    }

    /// Create a stopped ticker with a custom period.
    pub fn with_period(router: Arc<OutputRouter>, period: Duration) -> Self {
        Self {
            router,
            period,
            shared: Arc::new(Registrations {
                running: AtomicBool::new(false),
                animations: Mutex::new(Vec::new()),
                sources: Mutex::new(Vec::new()),
            }),
            handle: None,
            stop_tx: None,
        }
    }

    /// The configured tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the tick thread is currently running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shared.running.load(Ordering::SeqCst)
    }

    /// Spawn the tick thread. No-op if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        self.shared.running.store(true, Ordering::SeqCst);

        let router = Arc::clone(&self.router);
        let shared = Arc::clone(&self.shared);
        let period = self.period;

        match std::thread::Builder::new()
            .name("luxflow-ticker".to_string())
            .spawn(move || tick_loop(router, shared, stop_rx, period))
        {
            Ok(handle) => {
                info!(period_ms = period.as_millis() as u64, "ticker started");
                self.handle = Some(handle);
                self.stop_tx = Some(stop_tx);
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                error!(error = %e, "failed to spawn tick thread");
            }
        }
    }

    /// Signal the tick thread to exit and join it.
    ///
    /// Safe to call mid-tick; when this returns, no further tick will
    /// run. No-op if already stopped.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("tick thread panicked");
            }
            info!("ticker stopped");
        }
    }

    /// Register an animation. Its `on_start` runs before any tick can
    /// see it. Re-registering a live handle is a no-op.
    pub fn start_animation(&self, animation: SharedAnimation) {
        // One lock acquisition for check and push, or two racing
        // registrations of the same handle could both get past the
        // membership test.
        let mut list = self.shared.animations.lock();
        if list.iter().any(|a| Arc::ptr_eq(a, &animation)) {
            return;
        }
        animation.lock().on_start();
        list.push(animation);
    }

    /// Unregister an animation and run its `on_stop`.
    ///
    /// Synchronizes with the tick thread's animation pass: once this
    /// returns, the animation is never invoked again. Unknown handles
    /// are ignored.
    pub fn stop_animation(&self, animation: &SharedAnimation) {
        let removed = {
            let mut list = self.shared.animations.lock();
            let before = list.len();
            list.retain(|a| !Arc::ptr_eq(a, animation));
            list.len() != before
        };
        if removed {
            animation.lock().on_stop();
        }
    }

    /// Unregister every animation, running each `on_stop`.
    pub fn stop_all_animations(&self) {
        let drained: Vec<SharedAnimation> = std::mem::take(&mut *self.shared.animations.lock());
        for animation in &drained {
            animation.lock().on_stop();
        }
    }

    /// Register a raw channel source. Re-registering is a no-op.
    pub fn register_source(&self, source: SharedSource) {
        let mut list = self.shared.sources.lock();
        if list.iter().any(|s| Arc::ptr_eq(s, &source)) {
            return;
        }
        list.push(source);
    }

    /// Unregister a source. Unknown handles are ignored.
    pub fn unregister_source(&self, source: &SharedSource) {
        self.shared
            .sources
            .lock()
            .retain(|s| !Arc::ptr_eq(s, source));
    }

    /// Number of registered animations.
    pub fn animation_count(&self) -> usize {
        self.shared.animations.lock().len()
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.shared.sources.lock().len()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn tick_loop(
    router: Arc<OutputRouter>,
    shared: Arc<Registrations>,
    stop_rx: Receiver<()>,
    period: Duration,
) {
    let mut last_tick = Instant::now();

    loop {
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }

        let tick_start = Instant::now();
        let elapsed = tick_start.duration_since(last_tick);
        last_tick = tick_start;

        let mut finished: Vec<SharedAnimation> = Vec::new();
        {
            let mut buffer = router.claim();

            {
                // Registration order; on overlap the last-registered
                // source wins.
                let sources = shared.sources.lock();
                for source in sources.iter() {
                    source.lock().contribute(elapsed, &mut buffer);
                }
            }

            {
                // The list lock is held for the whole pass so an
                // unregistration cannot land between invocation and
                // removal: after stop_animation returns, no further
                // contribute can happen.
                let mut animations = shared.animations.lock();
                for animation in animations.iter() {
                    let mut anim = animation.lock();
                    anim.contribute(elapsed, &mut buffer);
                    if anim.is_done() {
                        finished.push(Arc::clone(animation));
                    }
                }
                // Completed animations leave the schedule after the
                // iteration, never mid-iteration.
                if !finished.is_empty() {
                    animations.retain(|a| !finished.iter().any(|f| Arc::ptr_eq(a, f)));
                }
            }
        }
        router.dump();

        // Everything in `finished` was removed under the list lock
        // above, so a racing stop_animation finds those handles already
        // gone and this is their only on_stop.
        if !finished.is_empty() {
            for animation in &finished {
                animation.lock().on_stop();
            }
            debug!(count = finished.len(), "animations completed");
        }

        let deadline = tick_start + period;
        let now = Instant::now();
        if now >= deadline {
            // Overrun: fire the next tick immediately. No catch-up of
            // missed frames; bursty backend writes are worse than a
            // single late one.
            warn!(
                overrun_ms = (now - deadline).as_millis() as u64,
                "tick overran its period"
            );
            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
        } else {
            match stop_rx.recv_timeout(deadline - now) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    debug!("tick thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Animation;
    use luxflow_core::FrameBuffer;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    struct CountingAnimation {
        ticks: Arc<AtomicUsize>,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        done_after: usize,
    }

    impl Animation for CountingAnimation {
        fn on_start(&mut self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn contribute(&mut self, _elapsed: Duration, buffer: &mut FrameBuffer) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            buffer.write(0, 255);
        }

        fn is_done(&self) -> bool {
            self.ticks.load(Ordering::SeqCst) >= self.done_after
        }
    }

    fn counting(done_after: usize) -> (SharedAnimation, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let animation: SharedAnimation = Arc::new(Mutex::new(CountingAnimation {
            ticks: Arc::clone(&ticks),
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            done_after,
        }));
        (animation, ticks, starts, stops)
    }

    #[test]
    fn test_start_is_idempotent() {
        let router = Arc::new(OutputRouter::new(1));
        let mut ticker = Ticker::with_period(Arc::clone(&router), Duration::from_millis(5));
        assert!(!ticker.is_running());

        ticker.start();
        ticker.start();
        assert!(ticker.is_running());

        ticker.stop();
        ticker.stop();
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_no_tick_after_stop() {
        let router = Arc::new(OutputRouter::new(1));
        let mut ticker = Ticker::with_period(Arc::clone(&router), Duration::from_millis(5));
        let (animation, ticks, _, _) = counting(usize::MAX);

        ticker.start_animation(animation);
        ticker.start();
        std::thread::sleep(Duration::from_millis(40));
        ticker.stop();

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_lifecycle_callbacks_fire_once() {
        let router = Arc::new(OutputRouter::new(1));
        let ticker = Ticker::new(router);
        let (animation, _, starts, stops) = counting(usize::MAX);

        ticker.start_animation(Arc::clone(&animation));
        ticker.start_animation(Arc::clone(&animation));
        assert_eq!(ticker.animation_count(), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        ticker.stop_animation(&animation);
        ticker.stop_animation(&animation);
        assert_eq!(ticker.animation_count(), 0);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completed_animation_leaves_schedule() {
        let router = Arc::new(OutputRouter::new(1));
        let mut ticker = Ticker::with_period(Arc::clone(&router), Duration::from_millis(5));
        let (animation, ticks, _, stops) = counting(3);

        ticker.start_animation(animation);
        ticker.start();
        std::thread::sleep(Duration::from_millis(80));
        ticker.stop();

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(ticker.animation_count(), 0);
    }

    #[test]
    fn test_completion_and_stop_race_single_callback() {
        let router = Arc::new(OutputRouter::new(1));
        let mut ticker = Ticker::with_period(Arc::clone(&router), Duration::from_millis(5));
        let (animation, _, _, stops) = counting(1);

        ticker.start_animation(Arc::clone(&animation));
        ticker.start();
        // Hammer the removal path while the tick completes the handle;
        // whichever side removes it owns the single on_stop.
        let deadline = Instant::now() + Duration::from_millis(60);
        while Instant::now() < deadline {
            ticker.stop_animation(&animation);
        }
        ticker.stop();

        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(ticker.animation_count(), 0);
    }

    #[test]
    fn test_concurrent_registration_runs_on_start_once() {
        let router = Arc::new(OutputRouter::new(1));
        let ticker = Arc::new(Ticker::new(router));
        let (animation, _, starts, _) = counting(usize::MAX);

        let barrier = Arc::new(Barrier::new(2));
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let ticker = Arc::clone(&ticker);
                let animation = Arc::clone(&animation);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    ticker.start_animation(animation);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(ticker.animation_count(), 1);
    }

    #[test]
    fn test_stop_all_animations() {
        let router = Arc::new(OutputRouter::new(1));
        let ticker = Ticker::new(router);
        let (a, _, _, a_stops) = counting(usize::MAX);
        let (b, _, _, b_stops) = counting(usize::MAX);

        ticker.start_animation(a);
        ticker.start_animation(b);
        ticker.stop_all_animations();

        assert_eq!(ticker.animation_count(), 0);
        assert_eq!(a_stops.load(Ordering::SeqCst), 1);
        assert_eq!(b_stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_joins_thread() {
        let router = Arc::new(OutputRouter::new(1));
        let mut ticker = Ticker::with_period(router, Duration::from_millis(5));
        ticker.start();
        drop(ticker);
    }
}
