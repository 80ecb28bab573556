use crate::Error;

const MAX_SEQUENCE: u64 = (1 << 48) - 1;

/// The running epoch‖sequence counter of one direction.
///
/// On the wire the counter is 8 bytes: a 2 byte epoch followed by a 6 byte
/// sequence number. On the read side it holds the lowest sequence number
/// still acceptable, on the write side the next one to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTracker {
    epoch: u16,
    sequence: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 8 byte epoch‖sequence value.
    pub fn current(&self) -> [u8; 8] {
        (((self.epoch as u64) << 48) | self.sequence).to_be_bytes()
    }

    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    /// The 48 bit sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Overwrite the 48 bit sequence number.
    pub fn advance(&mut self, sequence: u64) {
        self.sequence = sequence & MAX_SEQUENCE;
    }

    /// Enter `epoch` with a fresh sequence number space.
    pub fn set_epoch(&mut self, epoch: u16) {
        self.epoch = epoch;
        self.sequence = 0;
    }

    /// Enter the next epoch with a fresh sequence number space.
    pub fn next_epoch(&mut self) -> Result<(), Error> {
        let epoch = self.epoch.checked_add(1).ok_or(Error::WrappedEpoch)?;
        self.set_epoch(epoch);
        Ok(())
    }

    /// Validate the epoch and sequence of a legacy record header.
    ///
    /// The epoch must match exactly and the sequence must not go backwards.
    /// Gaps are fine since the peer may have failed to send some packets.
    pub fn check_received(&mut self, epoch: u16, sequence: u64) -> Result<(), Error> {
        if epoch != self.epoch {
            return Err(Error::BadEpoch {
                got: epoch,
                expected: self.epoch,
            });
        }
        if sequence < self.sequence {
            return Err(Error::BadSequence {
                got: sequence,
                expected: self.sequence,
            });
        }
        self.advance(sequence);
        Ok(())
    }

    /// Reconstruct a full sequence number from its low 16 bits.
    ///
    /// The result is never less than the current value: if substituting the
    /// low bits would go backwards, one 16 bit wrap is assumed. Returns the
    /// 8 byte value with a zero epoch, which is what record protection uses.
    pub fn reconstruct(&mut self, wire: u16) -> [u8; 8] {
        let current = self.sequence;
        let mut sequence = (current & !0xffff) | wire as u64;
        if sequence < current {
            sequence += 0x10000;
        }
        self.advance(sequence);
        self.sequence.to_be_bytes()
    }

    /// Take the current value for an outgoing record and move past it.
    pub fn next_output_sequence(&mut self) -> Result<[u8; 8], Error> {
        if self.sequence > MAX_SEQUENCE {
            return Err(Error::SequenceOverflow);
        }
        let current = self.current();
        self.sequence += 1;
        Ok(current)
    }
}
