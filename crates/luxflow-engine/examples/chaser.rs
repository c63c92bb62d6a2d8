//! Minimal end-to-end run of the dispatch engine: a moving-dot chase on
//! universe 0, dumped to the built-in dummy backend (or to Art-Net when
//! `CHASER_ARTNET_TARGET` is set, e.g. `255.255.255.255:6454`).
//!
//! Run with: `RUST_LOG=debug cargo run --example chaser`

use std::sync::Arc;
use std::time::Duration;

use luxflow_engine::{ArtNetBackend, DmxSource, FrameBuffer, OutputRouter, Ticker};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

struct Chase {
    position: f64,
    speed: f64,
}

impl DmxSource for Chase {
    fn contribute(&mut self, elapsed: Duration, buffer: &mut FrameBuffer) {
        self.position = (self.position + self.speed * elapsed.as_secs_f64()) % 32.0;
        for channel in 0..32 {
            let value = if channel == self.position as usize { 255 } else { 0 };
            buffer.write(channel, value);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let router = Arc::new(OutputRouter::new(1));

    if let Ok(target) = std::env::var("CHASER_ARTNET_TARGET") {
        match ArtNetBackend::new(&target, 0, 1) {
            Ok(backend) => {
                router
                    .register_backend(Arc::new(backend))
                    .expect("fresh router has no ArtNet backend yet");
                if let Err(e) = router.set_patch(0, "ArtNet", 0) {
                    eprintln!("failed to patch Art-Net: {}", e);
                }
            }
            Err(e) => eprintln!("failed to create Art-Net backend: {}", e),
        }
    }

    let mut ticker = Ticker::new(Arc::clone(&router));
    ticker.register_source(Arc::new(Mutex::new(Chase {
        position: 0.0,
        speed: 8.0,
    })));

    ticker.start();
    std::thread::sleep(Duration::from_secs(10));
    ticker.stop();
}
