use nom::number::complete::{be_u16, be_u24, be_u8};
use nom::IResult;

use crate::util::u24_bytes;
use crate::Buf;

/// Length of the TLS handshake header: type + 24 bit length.
pub const MESSAGE_HEADER_LEN: usize = 4;

/// Length of the DTLS handshake fragment header.
pub const FRAGMENT_HEADER_LEN: usize = 12;

/// DTLS handshake fragment header.
///
/// ```text
///  struct {
///      HandshakeType msg_type;
///      uint24 length;
///      uint16 message_seq;
///      uint24 fragment_offset;
///      uint24 fragment_length;
///  } Handshake;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FragmentHeader {
    pub msg_type: MessageType,
    pub length: u32,
    pub message_seq: u16,
    pub fragment_offset: u32,
    pub fragment_length: u32,
}

impl FragmentHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], FragmentHeader> {
        let (input, msg_type) = MessageType::parse(input)?;
        let (input, length) = be_u24(input)?;
        let (input, message_seq) = be_u16(input)?;
        let (input, fragment_offset) = be_u24(input)?;
        let (input, fragment_length) = be_u24(input)?;

        Ok((
            input,
            FragmentHeader {
                msg_type,
                length,
                message_seq,
                fragment_offset,
                fragment_length,
            },
        ))
    }

    /// Append a fragment header built from a TLS handshake header.
    ///
    /// The 4 byte `message_header` is copied verbatim, whatever length it
    /// declares.
    pub fn serialize_parts(
        message_header: &[u8],
        message_seq: u16,
        fragment_offset: u32,
        fragment_length: u32,
        output: &mut Buf,
    ) {
        output.extend_from_slice(&message_header[..MESSAGE_HEADER_LEN]);
        output.extend_from_slice(&message_seq.to_be_bytes());
        output.extend_from_slice(&u24_bytes(fragment_offset));
        output.extend_from_slice(&u24_bytes(fragment_length));
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.push(self.msg_type.as_u8());
        output.extend_from_slice(&u24_bytes(self.length));
        output.extend_from_slice(&self.message_seq.to_be_bytes());
        output.extend_from_slice(&u24_bytes(self.fragment_offset));
        output.extend_from_slice(&u24_bytes(self.fragment_length));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    HelloRequest, // empty
    ClientHello,
    ServerHello,
    HelloVerifyRequest,
    NewSessionTicket,
    EncryptedExtensions,
    Certificate,
    ServerKeyExchange,
    CertificateRequest,
    ServerHelloDone, // empty
    CertificateVerify,
    ClientKeyExchange,
    Finished,
    KeyUpdate,
    Unknown(u8),
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Unknown(0)
    }
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MessageType::HelloRequest,
            1 => MessageType::ClientHello,
            2 => MessageType::ServerHello,
            3 => MessageType::HelloVerifyRequest,
            4 => MessageType::NewSessionTicket,
            8 => MessageType::EncryptedExtensions,
            11 => MessageType::Certificate,
            12 => MessageType::ServerKeyExchange,
            13 => MessageType::CertificateRequest,
            14 => MessageType::ServerHelloDone,
            15 => MessageType::CertificateVerify,
            16 => MessageType::ClientKeyExchange,
            20 => MessageType::Finished,
            24 => MessageType::KeyUpdate,
            _ => MessageType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::HelloRequest => 0,
            MessageType::ClientHello => 1,
            MessageType::ServerHello => 2,
            MessageType::HelloVerifyRequest => 3,
            MessageType::NewSessionTicket => 4,
            MessageType::EncryptedExtensions => 8,
            MessageType::Certificate => 11,
            MessageType::ServerKeyExchange => 12,
            MessageType::CertificateRequest => 13,
            MessageType::ServerHelloDone => 14,
            MessageType::CertificateVerify => 15,
            MessageType::ClientKeyExchange => 16,
            MessageType::Finished => 20,
            MessageType::KeyUpdate => 24,
            MessageType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], MessageType> {
        let (input, byte) = be_u8(input)?;
        Ok((input, Self::from_u8(byte)))
    }
}
