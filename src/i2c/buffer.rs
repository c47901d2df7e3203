// Licensed under the Apache-2.0 license

use heapless::Vec;

/// Bytes the reception buffer can hold. Only the first two carry meaning.
pub const RX_CAPACITY: usize = 4;

/// Bytes received since the last address match.
///
/// Pushing past capacity drops the byte; the buffer never overflows.
#[derive(Clone, Debug, Default)]
pub struct ReceptionBuffer {
    bytes: Vec<u8, RX_CAPACITY>,
}

impl ReceptionBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append `byte` if there is room. Returns whether it was kept.
    pub fn push(&mut self, byte: u8) -> bool {
        self.bytes.push(byte).is_ok()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
