//! DTLS 1.3 unified record header (RFC 9147 Section 4).
//!
//! ```text
//!  0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+
//! |0|0|1|C|S|L|E E|  Fixed bits | C=CID | S=SeqNo | L=Length | E=Epoch
//! +-+-+-+-+-+-+-+-+
//! | 8 or 16 bit   |  if S=0: 8-bit seq, S=1: 16-bit seq
//! |Sequence Number|
//! +-+-+-+-+-+-+-+-+
//! | 16 bit Length |  if L=1
//! +-+-+-+-+-+-+-+-+
//! |               |
//! ~ Encrypted     ~
//! | Record        |
//! +-+-+-+-+-+-+-+-+
//! ```
//!
//! The connection ID itself is never written. Setting the C bit is a fault
//! injection, see `Bugs::dtls13_record_header_set_cid_bit`.

use nom::number::complete::{be_u16, be_u8};
use nom::{Err, IResult};

use crate::Buf;

/// DTLS 1.3 unified header flags
pub mod flags {
    /// Fixed header bits (001xxxxx)
    pub const FIXED_BITS: u8 = 0b0010_0000;
    /// Mask for fixed bits
    pub const FIXED_MASK: u8 = 0b1110_0000;
    /// Connection ID present
    pub const CID_BIT: u8 = 0b0001_0000;
    /// Sequence number is 16-bit (vs 8-bit)
    pub const SEQ_16BIT: u8 = 0b0000_1000;
    /// Length field present
    pub const LENGTH_BIT: u8 = 0b0000_0100;
    /// Epoch bits mask (lower 2 bits)
    pub const EPOCH_MASK: u8 = 0b0000_0011;
}

/// A parsed unified header. The sequence bits are still masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifiedHeader {
    pub flags: u8,
    pub sequence_bits: u16,
    pub length: Option<u16>,
}

impl UnifiedHeader {
    pub fn is_unified(first_byte: u8) -> bool {
        first_byte & flags::FIXED_MASK == flags::FIXED_BITS
    }

    pub fn epoch_bits(&self) -> u8 {
        self.flags & flags::EPOCH_MASK
    }

    pub fn seq_16bit(&self) -> bool {
        self.flags & flags::SEQ_16BIT != 0
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header_byte) = be_u8(input)?;

        if !Self::is_unified(header_byte) {
            return Err(Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }

        let (input, sequence_bits) = if header_byte & flags::SEQ_16BIT != 0 {
            be_u16(input)?
        } else {
            let (i, seq) = be_u8(input)?;
            (i, seq as u16)
        };

        let (input, length) = if header_byte & flags::LENGTH_BIT != 0 {
            let (i, len) = be_u16(input)?;
            (i, Some(len))
        } else {
            (input, None)
        };

        Ok((
            input,
            UnifiedHeader {
                flags: header_byte,
                sequence_bits,
                length,
            },
        ))
    }

    /// Compute the header length for this record.
    pub fn header_len(&self) -> usize {
        let mut len = 1; // header byte
        len += if self.seq_16bit() { 2 } else { 1 };
        if self.length.is_some() {
            len += 2;
        }
        len
    }

    /// Append a unified header.
    ///
    /// `sequence` is the 8 byte epoch‖sequence value. Only its low one or
    /// two bytes reach the wire, and only the low two epoch bits.
    pub fn serialize(
        sequence: &[u8; 8],
        set_cid: bool,
        short_seq: bool,
        length: Option<u16>,
        output: &mut Buf,
    ) {
        let mut header = flags::FIXED_BITS;
        if set_cid {
            header |= flags::CID_BIT;
        }
        if !short_seq {
            header |= flags::SEQ_16BIT;
        }
        if length.is_some() {
            header |= flags::LENGTH_BIT;
        }
        header |= sequence[1] & flags::EPOCH_MASK;

        output.push(header);

        if short_seq {
            output.push(sequence[7]);
        } else {
            output.extend_from_slice(&sequence[6..8]);
        }

        if let Some(length) = length {
            output.extend_from_slice(&length.to_be_bytes());
        }
    }
}
