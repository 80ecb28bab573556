use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use super::ProtocolVersion;
use crate::util::be_u48;
use crate::Buf;

/// The legacy 13 byte DTLS record header.
///
/// ```text
///  struct {
///      ContentType type;
///      ProtocolVersion version;
///      uint16 epoch;
///      uint48 sequence_number;
///      uint16 length;
///  } DTLSPlaintext;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DTLSRecordHeader {
    pub content_type: ContentType,
    pub version: u16,
    pub epoch: u16,
    pub sequence_number: u64,
    pub length: u16,
}

impl DTLSRecordHeader {
    pub const LEN: usize = 13;

    pub fn parse(input: &[u8]) -> IResult<&[u8], DTLSRecordHeader> {
        let (input, content_type) = ContentType::parse(input)?;
        let (input, version) = be_u16(input)?;
        let (input, epoch) = be_u16(input)?;
        let (input, sequence_number) = be_u48(input)?;
        let (input, length) = be_u16(input)?;

        Ok((
            input,
            DTLSRecordHeader {
                content_type,
                version,
                epoch,
                sequence_number,
                length,
            },
        ))
    }

    /// Append the header. `sequence` is the 8 byte epoch‖sequence value.
    pub fn serialize_parts(
        content_type: ContentType,
        version: ProtocolVersion,
        sequence: &[u8; 8],
        length: u16,
        output: &mut Buf,
    ) {
        output.push(content_type.as_u8());
        version.serialize(output);
        output.extend_from_slice(sequence);
        output.extend_from_slice(&length.to_be_bytes());
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.content_type.as_u8());
        output.extend_from_slice(&self.version.to_be_bytes());
        output.extend_from_slice(&self.epoch.to_be_bytes());
        output.extend_from_slice(&self.sequence_number.to_be_bytes()[2..]);
        output.extend_from_slice(&self.length.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Ack,
    Unknown(u8),
}

impl ContentType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            26 => ContentType::Ack,
            _ => ContentType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Ack => 26,
            ContentType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ContentType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}
