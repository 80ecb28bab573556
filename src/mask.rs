//! Record number masking (RFC 9147 Section 4.2.3).
//!
//! The sequence number bytes of a unified header are XORed with a mask
//! derived from a sample of the record's ciphertext. XOR makes the
//! operation its own inverse, so the same call masks on write and unmasks
//! on read.

use std::fmt;

use tinyvec::ArrayVec;

use crate::util::xor_slice;
use crate::Error;

/// Mask bytes. Only the first one or two are used.
pub type Mask = ArrayVec<[u8; 16]>;

/// Derives record number masks from ciphertext samples.
pub trait RecordNumberEncrypter: fmt::Debug {
    /// Generate the mask for the record whose ciphertext starts with `sample`.
    fn generate_mask(&self, sample: &[u8]) -> Result<Mask, Error>;
}

/// Mask the `seq_len` sequence number bytes that follow the unified header's
/// first byte. `record` is the full record, header included, and `header_len`
/// is where its ciphertext starts.
pub(crate) fn apply_mask(
    encrypter: &dyn RecordNumberEncrypter,
    record: &mut [u8],
    header_len: usize,
    seq_len: usize,
) -> Result<(), Error> {
    let (header, sample) = record.split_at_mut(header_len);
    let mask = encrypter.generate_mask(sample)?;
    trace!("Masking {} sequence number bytes", seq_len);
    xor_slice(&mut header[1..1 + seq_len], &mask);
    Ok(())
}
