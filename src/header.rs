//! Record header codec.
//!
//! Decoding validates the header against the read direction's state and
//! updates its sequence tracker. Encoding picks the header format from the
//! write direction's state.

use crate::half::HalfConn;
use crate::mask::apply_mask;
use crate::message::record13::flags;
use crate::message::{ContentType, DTLSRecordHeader, ProtocolVersion, UnifiedHeader};
use crate::{Buf, Config, Error};

/// Length of the only unified header shape accepted on read: 16 bit sequence
/// number and a length field.
const UNIFIED_HEADER_LEN: usize = 5;

/// Type byte bits (`001C SLEE` without the epoch) accepted on read.
const UNIFIED_ACCEPTED: u8 = flags::FIXED_BITS | flags::SEQ_16BIT | flags::LENGTH_BIT;

/// A validated record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHeader {
    pub header_len: usize,
    /// Payload length declared by the header.
    pub record_len: usize,
    /// `None` for unified headers, where the type is only known after
    /// decryption.
    pub content_type: Option<ContentType>,
    /// The 8 byte value record protection uses as sequence number.
    pub sequence: [u8; 8],
}

/// Decode the header at the start of `input`, which holds the rest of the
/// datagram. A unified header's sequence number is unmasked in place.
pub(crate) fn decode_header(
    input: &mut [u8],
    half: &mut HalfConn,
    negotiated: Option<ProtocolVersion>,
    config: &Config,
) -> Result<DecodedHeader, Error> {
    if half.uses_unified_header() {
        decode_unified(input, half, config)
    } else {
        decode_legacy(input, half, negotiated, config)
    }
}

fn decode_legacy(
    input: &[u8],
    half: &mut HalfConn,
    negotiated: Option<ProtocolVersion>,
    config: &Config,
) -> Result<DecodedHeader, Error> {
    if input.len() < DTLSRecordHeader::LEN {
        return Err(Error::MalformedHeader("record shorter than header"));
    }
    let (_, header) = DTLSRecordHeader::parse(input)
        .map_err(|_| Error::MalformedHeader("unparseable record header"))?;

    // Alerts may arrive before the peer has settled on a version.
    if header.content_type != ContentType::Alert {
        let expected = match negotiated {
            Some(v) => Some(v.record_version().as_u16()),
            None => config.bugs().expect_initial_record_version,
        };
        if let Some(expected) = expected {
            if header.version != expected {
                return Err(Error::ProtocolVersionMismatch {
                    got: header.version,
                    expected,
                });
            }
        }
    }

    half.sequence_mut()
        .check_received(header.epoch, header.sequence_number)?;

    let mut sequence = [0; 8];
    sequence.copy_from_slice(&input[3..11]);

    trace!(
        "Record {:?} epoch {} seq {} len {}",
        header.content_type,
        header.epoch,
        header.sequence_number,
        header.length
    );

    Ok(DecodedHeader {
        header_len: DTLSRecordHeader::LEN,
        record_len: header.length as usize,
        content_type: Some(header.content_type),
        sequence,
    })
}

fn decode_unified(
    input: &mut [u8],
    half: &mut HalfConn,
    config: &Config,
) -> Result<DecodedHeader, Error> {
    if input.len() < UNIFIED_HEADER_LEN {
        return Err(Error::MalformedHeader("record shorter than header"));
    }
    if input[0] & !flags::EPOCH_MASK != UNIFIED_ACCEPTED {
        return Err(Error::MalformedHeader("unsupported unified header"));
    }

    let epoch = half.sequence().epoch();
    let epoch_bits = input[0] & flags::EPOCH_MASK;
    if epoch_bits != (epoch as u8) & flags::EPOCH_MASK {
        return Err(Error::BadEpoch {
            got: epoch_bits as u16,
            expected: epoch,
        });
    }

    if !config.bugs().null_all_ciphers {
        apply_mask(half.mask()?, input, UNIFIED_HEADER_LEN, 2)?;
    }

    let (_, header) = UnifiedHeader::parse(input)
        .map_err(|_| Error::MalformedHeader("unparseable unified header"))?;
    let sequence = half.sequence_mut().reconstruct(header.sequence_bits);
    let record_len = header.length.unwrap_or_default() as usize;

    trace!(
        "Unified record epoch {} seq {} len {}",
        epoch,
        u64::from_be_bytes(sequence),
        record_len
    );

    Ok(DecodedHeader {
        header_len: UNIFIED_HEADER_LEN,
        record_len,
        content_type: None,
        sequence,
    })
}

/// Version written in legacy headers of outgoing records.
pub(crate) fn record_version(
    negotiated: Option<ProtocolVersion>,
    write_version: Option<ProtocolVersion>,
) -> ProtocolVersion {
    let dtls13 = |v: Option<ProtocolVersion>| v.map(|v| v.is_dtls13()).unwrap_or(false);
    if dtls13(negotiated) || dtls13(write_version) {
        return ProtocolVersion::DTLS1_2;
    }
    negotiated.unwrap_or(ProtocolVersion::DTLS1_0)
}

/// Shape of an outgoing record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderFormat {
    Legacy(ProtocolVersion),
    Unified { set_cid: bool },
}

/// What [`append_header`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EncodedHeader {
    pub header_len: usize,
    pub has_length: bool,
}

/// Append a header for a record carrying `payload_len` bytes.
///
/// The length field, if any, holds the plaintext length. Ciphers that expand
/// the payload rewrite it.
pub(crate) fn append_header(
    format: HeaderFormat,
    content_type: ContentType,
    sequence: &[u8; 8],
    payload_len: usize,
    config: &Config,
    output: &mut Buf,
) -> EncodedHeader {
    let start = output.len();
    let length = payload_len as u16;

    let has_length = match format {
        HeaderFormat::Legacy(version) => {
            DTLSRecordHeader::serialize_parts(content_type, version, sequence, length, output);
            true
        }
        HeaderFormat::Unified { set_cid } => {
            let omit = config.omit_record_length();
            let length = if omit { None } else { Some(length) };
            UnifiedHeader::serialize(
                sequence,
                set_cid,
                config.short_sequence_numbers(),
                length,
                output,
            );
            !omit
        }
    };

    EncodedHeader {
        header_len: output.len() - start,
        has_length,
    }
}
