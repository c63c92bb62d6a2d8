//! Art-Net network backend (Art-Net 4)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over
//! Ethernet, typically broadcast to 255.255.255.255:6454. UDP sends
//! return promptly, so this backend satisfies the non-blocking write
//! contract without internal queues.

use std::net::{SocketAddr, UdpSocket};

use luxflow_core::{EngineError, Result, UNIVERSE_SIZE};
use parking_lot::Mutex;
use tracing::{info, trace};

use crate::backend::OutputBackend;

const ARTNET_HEADER_LEN: usize = 18;

/// Art-Net output backend.
///
/// Each output line maps to one consecutive Art-Net port-address
/// starting at `base_universe`. One UDP socket serves all lines; it is
/// bound when the first line opens and dropped when the open count over
/// all lines returns to zero.
pub struct ArtNetBackend {
    target: SocketAddr,
    base_universe: u16,
    state: Mutex<ArtNetState>,
}

struct ArtNetState {
    socket: Option<UdpSocket>,
    sequence: u8,
    open_counts: Vec<usize>,
}

impl ArtNetBackend {
    /// Create an Art-Net backend with `ports` output lines.
    ///
    /// # Arguments
    /// * `target` - Destination address (typically "255.255.255.255:6454")
    /// * `base_universe` - Art-Net port-address of output line 0
    /// * `ports` - Number of output lines
    pub fn new(target: &str, base_universe: u16, ports: usize) -> Result<Self> {
        let target: SocketAddr = target.parse().map_err(|e| {
            EngineError::BackendIo(format!("invalid Art-Net target address: {}", e))
        })?;

        info!(addr = %target, base_universe, ports, "Art-Net backend created");

        Ok(Self {
            target,
            base_universe,
            state: Mutex::new(ArtNetState {
                socket: None,
                sequence: 0,
                open_counts: vec![0; ports],
            }),
        })
    }

    /// Build an Art-Net DMX packet (OpDmx).
    fn build_packet(sequence: u8, universe: u16, data: &[u8; UNIVERSE_SIZE]) -> Vec<u8> {
        let mut packet = vec![0u8; ARTNET_HEADER_LEN + UNIVERSE_SIZE];

        // Header: "Art-Net\0"
        packet[0..8].copy_from_slice(b"Art-Net\0");

        // OpCode: OpDmx (0x5000), little-endian
        packet[8..10].copy_from_slice(&0x5000u16.to_le_bytes());

        // Protocol version (14), big-endian
        packet[10..12].copy_from_slice(&14u16.to_be_bytes());

        // Sequence
        packet[12] = sequence;

        // Physical (0)
        packet[13] = 0;

        // Universe (Port-Address), little-endian
        packet[14..16].copy_from_slice(&universe.to_le_bytes());

        // Length (512 channels), big-endian
        packet[16..18].copy_from_slice(&(UNIVERSE_SIZE as u16).to_be_bytes());

        // DMX data
        packet[ARTNET_HEADER_LEN..].copy_from_slice(data);

        packet
    }
}

impl OutputBackend for ArtNetBackend {
    fn name(&self) -> &str {
        "ArtNet"
    }

    fn outputs(&self) -> Vec<String> {
        let state = self.state.lock();
        (0..state.open_counts.len())
            .map(|i| format!("Art-Net universe {}", self.base_universe as usize + i))
            .collect()
    }

    fn open_output(&self, output: usize) -> Result<()> {
        let mut state = self.state.lock();
        if output >= state.open_counts.len() {
            return Err(EngineError::InvalidOutput {
                backend: "ArtNet".to_string(),
                output,
            });
        }

        if state.socket.is_none() {
            let socket = UdpSocket::bind("0.0.0.0:0")?;
            socket.set_broadcast(true)?;
            info!(addr = %self.target, "Art-Net socket bound");
            state.socket = Some(socket);
        }
        state.open_counts[output] += 1;
        Ok(())
    }

    fn close_output(&self, output: usize) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(count) = state.open_counts.get_mut(output) {
            *count = count.saturating_sub(1);
        }
        if state.open_counts.iter().all(|&c| c == 0) && state.socket.take().is_some() {
            info!("Art-Net socket released");
        }
        Ok(())
    }

    fn write_universe(&self, output: usize, data: &[u8; UNIVERSE_SIZE]) -> Result<()> {
        let mut state = self.state.lock();
        if state.open_counts.get(output).copied().unwrap_or(0) == 0 {
            return Err(EngineError::BackendIo(format!(
                "Art-Net output {} is not open",
                output
            )));
        }

        let universe = self.base_universe.wrapping_add(output as u16);
        let packet = Self::build_packet(state.sequence, universe, data);
        state.sequence = state.sequence.wrapping_add(1);

        let Some(socket) = state.socket.as_ref() else {
            return Err(EngineError::BackendIo("Art-Net socket not bound".to_string()));
        };
        socket.send_to(&packet, self.target)?;

        trace!(universe, "sent Art-Net DMX packet");
        Ok(())
    }
}
