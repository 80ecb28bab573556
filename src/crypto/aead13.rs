//! DTLS 1.3 record protection with AES-GCM (RFC 9147 Section 4.2.3).
use std::fmt;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::cipher::{BlockEncrypt, KeyInit as BlockKeyInit};
use aes_gcm::aes::{Aes128, Aes256, Block};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Key, Nonce};

use super::{inner_plaintext, patch_length, Decrypted, RecordCipher};
use crate::mask::{Mask, RecordNumberEncrypter};
use crate::message::ContentType;
use crate::{Alert, Buf, Error};

const TAG_LEN: usize = 16;
const SAMPLE_LEN: usize = 16;

enum AesGcm {
    Aes128(Box<Aes128Gcm>),
    Aes256(Box<Aes256Gcm>),
}

impl AesGcm {
    fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => {
                let key = Key::<Aes128Gcm>::from_slice(key);
                Ok(AesGcm::Aes128(Box::new(Aes128Gcm::new(key))))
            }
            32 => {
                let key = Key::<Aes256Gcm>::from_slice(key);
                Ok(AesGcm::Aes256(Box::new(Aes256Gcm::new(key))))
            }
            _ => Err(Error::CryptoError(format!(
                "Invalid key size for AES-GCM: {}",
                key.len()
            ))),
        }
    }

    fn seal(&self, nonce: &[u8; 12], aad: &[u8], data: &mut Buf) -> Result<(), Error> {
        let nonce = Nonce::from_slice(nonce);
        let res = match self {
            AesGcm::Aes128(cipher) => cipher.encrypt_in_place(nonce, aad, data),
            AesGcm::Aes256(cipher) => cipher.encrypt_in_place(nonce, aad, data),
        };
        res.map_err(|_| Error::CryptoError("AES-GCM encryption failed".to_string()))
    }

    fn open(&self, nonce: &[u8; 12], aad: &[u8], data: &mut Buf) -> Result<(), Alert> {
        let nonce = Nonce::from_slice(nonce);
        let res = match self {
            AesGcm::Aes128(cipher) => cipher.decrypt_in_place(nonce, aad, data),
            AesGcm::Aes256(cipher) => cipher.decrypt_in_place(nonce, aad, data),
        };
        res.map_err(|_| Alert::BAD_RECORD_MAC)
    }
}

impl fmt::Debug for AesGcm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AesGcm::Aes128(_) => f.debug_tuple("AesGcm::Aes128").finish(),
            AesGcm::Aes256(_) => f.debug_tuple("AesGcm::Aes256").finish(),
        }
    }
}

/// AES-GCM protection of DTLS 1.3 records.
///
/// The nonce is the static IV XORed with the 64 bit record sequence number,
/// and the content type travels encrypted at the end of the plaintext.
#[derive(Debug)]
pub struct Dtls13Aead {
    cipher: AesGcm,
    iv: [u8; 12],
}

impl Dtls13Aead {
    /// `key` must be 16 or 32 bytes.
    pub fn new(key: &[u8], iv: [u8; 12]) -> Result<Self, Error> {
        Ok(Dtls13Aead {
            cipher: AesGcm::new(key)?,
            iv,
        })
    }

    fn nonce(&self, sequence: &[u8; 8]) -> [u8; 12] {
        let mut nonce = self.iv;
        for (n, s) in nonce[4..].iter_mut().zip(sequence) {
            *n ^= s;
        }
        nonce
    }
}

impl RecordCipher for Dtls13Aead {
    fn encrypt(
        &mut self,
        record: &mut Buf,
        payload: &[u8],
        content_type: ContentType,
        header_len: usize,
        header_has_length: bool,
        sequence: &[u8; 8],
    ) -> Result<(), Error> {
        let mut inner = Buf::with_capacity(payload.len() + 1 + TAG_LEN);
        inner_plaintext::encode(payload, content_type, &mut inner);

        // The header is the AAD, so its length must be final first.
        if header_has_length {
            patch_length(record, header_len, inner.len() + TAG_LEN)?;
        }

        let nonce = self.nonce(sequence);
        self.cipher.seal(&nonce, &record[..header_len], &mut inner)?;
        record.extend_from_slice(&inner);
        Ok(())
    }

    fn decrypt(
        &mut self,
        sequence: &[u8; 8],
        header_len: usize,
        record: &[u8],
    ) -> Result<Decrypted, Alert> {
        if record.len() < header_len + TAG_LEN {
            return Err(Alert::BAD_RECORD_MAC);
        }
        let (aad, ciphertext) = record.split_at(header_len);
        let mut data = Buf::from_slice(ciphertext);

        let nonce = self.nonce(sequence);
        self.cipher.open(&nonce, aad, &mut data)?;

        let (content_type, content) =
            inner_plaintext::decode(&data).ok_or(Alert::UNEXPECTED_MESSAGE)?;
        Ok(Decrypted {
            content_type: Some(content_type),
            plaintext: Buf::from_slice(content),
        })
    }

    fn max_encrypt_overhead(&self, _len: usize) -> usize {
        1 + TAG_LEN
    }
}

enum SnCipher {
    Aes128(Box<Aes128>),
    Aes256(Box<Aes256>),
}

/// Record number masks from AES-ECB over the first 16 ciphertext bytes.
pub struct AesRecordNumberEncrypter {
    cipher: SnCipher,
}

impl AesRecordNumberEncrypter {
    /// `sn_key` must be 16 or 32 bytes.
    pub fn new(sn_key: &[u8]) -> Result<Self, Error> {
        let cipher = match sn_key.len() {
            16 => Aes128::new_from_slice(sn_key).map(|c| SnCipher::Aes128(Box::new(c))),
            32 => Aes256::new_from_slice(sn_key).map(|c| SnCipher::Aes256(Box::new(c))),
            _ => {
                return Err(Error::CryptoError(format!(
                    "Invalid sn_key size: {}",
                    sn_key.len()
                )))
            }
        }
        .map_err(|_| Error::CryptoError("Invalid sn_key".to_string()))?;

        Ok(AesRecordNumberEncrypter { cipher })
    }
}

impl RecordNumberEncrypter for AesRecordNumberEncrypter {
    fn generate_mask(&self, sample: &[u8]) -> Result<Mask, Error> {
        if sample.len() < SAMPLE_LEN {
            return Err(Error::MalformedHeader("record too short to sample"));
        }
        let mut block = Block::clone_from_slice(&sample[..SAMPLE_LEN]);
        match &self.cipher {
            SnCipher::Aes128(c) => c.encrypt_block(&mut block),
            SnCipher::Aes256(c) => c.encrypt_block(&mut block),
        }

        let mut mask = Mask::new();
        mask.extend_from_slice(&block);
        Ok(mask)
    }
}

impl fmt::Debug for AesRecordNumberEncrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = match self.cipher {
            SnCipher::Aes128(_) => 128,
            SnCipher::Aes256(_) => 256,
        };
        f.debug_struct("AesRecordNumberEncrypter")
            .field("bits", &bits)
            .finish()
    }
}
