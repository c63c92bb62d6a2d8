//! Shared test fixtures

use std::sync::Arc;

use luxflow_engine::{OutputBackend, Result, UNIVERSE_SIZE};
use parking_lot::Mutex;

/// Backend stub recording every open, close and dispatched frame.
pub struct CaptureBackend {
    name: String,
    outputs: usize,
    pub frames: Mutex<Vec<(usize, Vec<u8>)>>,
    pub opens: Mutex<Vec<usize>>,
    pub closes: Mutex<Vec<usize>>,
}

impl CaptureBackend {
    pub fn new(name: &str, outputs: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outputs,
            frames: Mutex::new(Vec::new()),
            opens: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn last_frame_for(&self, output: usize) -> Option<Vec<u8>> {
        self.frames
            .lock()
            .iter()
            .rev()
            .find(|(o, _)| *o == output)
            .map(|(_, frame)| frame.clone())
    }
}

impl OutputBackend for CaptureBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn outputs(&self) -> Vec<String> {
        (0..self.outputs)
            .map(|i| format!("{} output {}", self.name, i + 1))
            .collect()
    }

    fn open_output(&self, output: usize) -> Result<()> {
        self.opens.lock().push(output);
        Ok(())
    }

    fn close_output(&self, output: usize) -> Result<()> {
        self.closes.lock().push(output);
        Ok(())
    }

    fn write_universe(&self, output: usize, data: &[u8; UNIVERSE_SIZE]) -> Result<()> {
        self.frames.lock().push((output, data.to_vec()));
        Ok(())
    }
}
