//! Wire formats of the record layer.
//!
//! These types only know how to parse and serialize bytes. Validation
//! against connection state happens in the header codec and reassembler.

mod ack;
mod handshake;
mod record;
pub mod record13;

pub use ack::{AckMessage, RecordNumber};
pub use handshake::{FragmentHeader, MessageType, FRAGMENT_HEADER_LEN, MESSAGE_HEADER_LEN};
pub use record::{ContentType, DTLSRecordHeader};
pub use record13::UnifiedHeader;

use nom::number::complete::be_u16;
use nom::IResult;

use crate::Buf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    DTLS1_0,
    DTLS1_2,
    DTLS1_3,
    Unknown(u16),
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0xFEFF => ProtocolVersion::DTLS1_0,
            0xFEFD => ProtocolVersion::DTLS1_2,
            0xFEFC => ProtocolVersion::DTLS1_3,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::DTLS1_0 => 0xFEFF,
            ProtocolVersion::DTLS1_2 => 0xFEFD,
            ProtocolVersion::DTLS1_3 => 0xFEFC,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    /// DTLS 1.3 or later.
    ///
    /// DTLS versions count downwards on the wire, so anything numerically at
    /// or below 0xFEFC (and still in the DTLS range) is 1.3-class.
    pub fn is_dtls13(&self) -> bool {
        let v = self.as_u16();
        (0xFE00..=0xFEFC).contains(&v)
    }

    /// The version written in legacy record headers.
    ///
    /// DTLS 1.3 freezes the record layer version at DTLS 1.2.
    pub fn record_version(&self) -> ProtocolVersion {
        if self.is_dtls13() {
            ProtocolVersion::DTLS1_2
        } else {
            *self
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, version) = be_u16(input)?;
        Ok((input, Self::from_u16(version)))
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.as_u16().to_be_bytes());
    }
}
