//! The composed output frame
//!
//! A [`FrameBuffer`] is the concatenation of all addressable universes,
//! 512 channels each. Every producer in a tick writes into the same
//! buffer; the router serializes access around it.
//!
//! All accessors bounds-check and degrade to no-ops (writes) or zero
//! (reads) on out-of-range addresses. A misbehaving producer must never
//! be able to crash the shared scheduler, so malformed addresses are not
//! treated as faults here.

/// Channels per universe, as transmitted by DMX-style protocols.
pub const UNIVERSE_SIZE: usize = 512;

/// Fixed-size channel value store covering all universes.
///
/// No internal locking; the [`OutputRouter`] owning the buffer is
/// responsible for synchronizing concurrent access.
///
/// [`OutputRouter`]: https://docs.rs/luxflow-engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a zeroed buffer spanning `universes` universes.
    pub fn new(universes: usize) -> Self {
        Self {
            data: vec![0u8; universes * UNIVERSE_SIZE],
        }
    }

    /// Total channel count (universes × 512). Fixed at construction.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of universes this buffer spans.
    pub fn universe_count(&self) -> usize {
        self.data.len() / UNIVERSE_SIZE
    }

    /// Read the value at a global channel address; 0 if out of range.
    pub fn read(&self, addr: usize) -> u8 {
        self.data.get(addr).copied().unwrap_or(0)
    }

    /// Write one channel. Out-of-range addresses are ignored.
    pub fn write(&mut self, addr: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(addr) {
            *slot = value;
        }
    }

    /// Write a contiguous run of channels starting at `addr`.
    ///
    /// The whole call is a no-op if any byte would land out of range;
    /// partial writes would be worse than none for fixture data.
    pub fn write_range(&mut self, addr: usize, values: &[u8]) {
        let Some(end) = addr.checked_add(values.len()) else {
            return;
        };
        if end > self.data.len() {
            return;
        }
        self.data[addr..end].copy_from_slice(values);
    }

    /// Borrow one universe's 512-channel slice.
    pub fn universe(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(UNIVERSE_SIZE)?;
        self.data.get(start..start + UNIVERSE_SIZE)
    }

    /// Mutably borrow one universe's 512-channel slice.
    pub fn universe_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let start = index.checked_mul(UNIVERSE_SIZE)?;
        self.data.get_mut(start..start + UNIVERSE_SIZE)
    }

    /// Raw view over all channels, used for dump snapshots.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_size_is_fixed() {
        let buf = FrameBuffer::new(4);
        assert_eq!(buf.size(), 4 * UNIVERSE_SIZE);
        assert_eq!(buf.universe_count(), 4);
    }

    #[test]
    fn test_read_write_roundtrip() {
        let mut buf = FrameBuffer::new(1);
        buf.write(0, 255);
        buf.write(511, 42);
        assert_eq!(buf.read(0), 255);
        assert_eq!(buf.read(511), 42);
        assert_eq!(buf.read(1), 0);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut buf = FrameBuffer::new(1);
        buf.write(512, 99);
        assert_eq!(buf.read(512), 0);
        assert_eq!(buf.read(usize::MAX), 0);
    }

    #[test]
    fn test_write_range() {
        let mut buf = FrameBuffer::new(2);
        buf.write_range(510, &[1, 2, 3, 4]);
        assert_eq!(buf.read(510), 1);
        assert_eq!(buf.read(513), 4);
    }

    #[test]
    fn test_write_range_overflow_discards_whole_write() {
        let mut buf = FrameBuffer::new(1);
        buf.write_range(510, &[1, 2, 3]);
        // Nothing written, not even the in-range prefix.
        assert_eq!(buf.read(510), 0);
        assert_eq!(buf.read(511), 0);
    }

    #[test]
    fn test_universe_slices() {
        let mut buf = FrameBuffer::new(2);
        buf.write(UNIVERSE_SIZE, 7);
        let u1 = buf.universe(1).unwrap();
        assert_eq!(u1.len(), UNIVERSE_SIZE);
        assert_eq!(u1[0], 7);
        assert!(buf.universe(2).is_none());
    }

    proptest! {
        #[test]
        fn prop_no_access_panics(addr in any::<usize>(), value in any::<u8>(), len in 0usize..2048) {
            let mut buf = FrameBuffer::new(2);
            buf.write(addr, value);
            let _ = buf.read(addr);
            buf.write_range(addr, &vec![value; len]);
        }

        #[test]
        fn prop_in_range_write_reads_back(addr in 0usize..1024, value in any::<u8>()) {
            let mut buf = FrameBuffer::new(2);
            buf.write(addr, value);
            prop_assert_eq!(buf.read(addr), value);
        }
    }
}
