//! Record protection.
//!
//! The record layer frames records but leaves protecting them to a
//! [`RecordCipher`]. [`NullCipher`] passes payloads through unchanged, and
//! [`aead13`] implements the DTLS 1.3 AES-GCM construction.

use std::fmt;

use crate::message::ContentType;
use crate::{Alert, Buf, Error};

pub mod aead13;
pub use aead13::{AesRecordNumberEncrypter, Dtls13Aead};

/// A decrypted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// The inner content type, for ciphers that protect it (DTLS 1.3).
    /// `None` means the header's content type applies.
    pub content_type: Option<ContentType>,
    pub plaintext: Buf,
}

/// Protection of one direction's records.
pub trait RecordCipher: fmt::Debug {
    /// Append the protected `payload` to `record`, which already holds the
    /// `header_len` byte header.
    ///
    /// When `header_has_length` is set, the last two header bytes are the
    /// record length and must be updated to the protected length.
    fn encrypt(
        &mut self,
        record: &mut Buf,
        payload: &[u8],
        content_type: ContentType,
        header_len: usize,
        header_has_length: bool,
        sequence: &[u8; 8],
    ) -> Result<(), Error>;

    /// Remove protection from `record` (header included). On failure, the
    /// alert to send the peer.
    fn decrypt(
        &mut self,
        sequence: &[u8; 8],
        header_len: usize,
        record: &[u8],
    ) -> Result<Decrypted, Alert>;

    /// Upper bound of bytes `encrypt` adds to a `len` byte payload.
    fn max_encrypt_overhead(&self, len: usize) -> usize;
}

/// Pass-through protection.
///
/// With `inner_content_type` set, records carry a DTLS 1.3 style inner
/// plaintext (content ‖ type), as a null cipher does once 1.3 keys are
/// installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCipher {
    inner_content_type: bool,
}

impl NullCipher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Null cipher for DTLS 1.3 epochs.
    pub fn dtls13() -> Self {
        NullCipher {
            inner_content_type: true,
        }
    }
}

impl RecordCipher for NullCipher {
    fn encrypt(
        &mut self,
        record: &mut Buf,
        payload: &[u8],
        content_type: ContentType,
        header_len: usize,
        header_has_length: bool,
        _sequence: &[u8; 8],
    ) -> Result<(), Error> {
        if !self.inner_content_type {
            record.extend_from_slice(payload);
            return Ok(());
        }
        if header_has_length {
            patch_length(record, header_len, payload.len() + 1)?;
        }
        inner_plaintext::encode(payload, content_type, record);
        Ok(())
    }

    fn decrypt(
        &mut self,
        _sequence: &[u8; 8],
        header_len: usize,
        record: &[u8],
    ) -> Result<Decrypted, Alert> {
        let body = &record[header_len..];
        if !self.inner_content_type {
            return Ok(Decrypted {
                content_type: None,
                plaintext: Buf::from_slice(body),
            });
        }
        let (content_type, content) =
            inner_plaintext::decode(body).ok_or(Alert::UNEXPECTED_MESSAGE)?;
        Ok(Decrypted {
            content_type: Some(content_type),
            plaintext: Buf::from_slice(content),
        })
    }

    fn max_encrypt_overhead(&self, _len: usize) -> usize {
        if self.inner_content_type {
            1
        } else {
            0
        }
    }
}

/// Rewrite the length field at the end of a record header.
pub(crate) fn patch_length(record: &mut Buf, header_len: usize, len: usize) -> Result<(), Error> {
    let len: u16 = len
        .try_into()
        .map_err(|_| Error::CryptoError(format!("protected record too long: {}", len)))?;
    record[header_len - 2..header_len].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// DTLS 1.3 inner plaintext structure.
///
/// The actual content type is encrypted as the last byte of the plaintext.
/// ```text
/// struct {
///     opaque content[length];
///     ContentType type;
///     uint8 zeros[padding_length];
/// } DTLSInnerPlaintext;
/// ```
pub(crate) mod inner_plaintext {
    use crate::message::ContentType;
    use crate::Buf;

    /// Add inner content type to plaintext (before encryption).
    pub fn encode(plaintext: &[u8], content_type: ContentType, output: &mut Buf) {
        output.extend_from_slice(plaintext);
        output.push(content_type.as_u8());
    }

    /// Decode inner plaintext (after decryption).
    /// Removes trailing zeros and extracts the content type.
    pub fn decode(inner: &[u8]) -> Option<(ContentType, &[u8])> {
        // Find the content type (last non-zero byte)
        let idx = inner.iter().rposition(|b| *b != 0)?;
        Some((ContentType::from_u8(inner[idx]), &inner[..idx]))
    }
}
