use std::io;

use thiserror::Error;

use crate::message::ContentType;
use crate::Alert;

/// Errors raised by the record layer.
///
/// Apart from [`Error::Transport`], every error is fatal for the direction it
/// was raised on and is latched: later calls on that direction return the
/// same error without touching the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed record header: {0}")]
    MalformedHeader(&'static str),

    #[error("received record with version {got:04x} when expecting version {expected:04x}")]
    ProtocolVersionMismatch { got: u16, expected: u16 },

    #[error("bad epoch {got}, expected {expected}")]
    BadEpoch { got: u16, expected: u16 },

    #[error("bad sequence number {got}, expected at least {expected}")]
    BadSequence { got: u64, expected: u64 },

    #[error("oversized record received with length {0}")]
    RecordOverflow(usize),

    #[error("record failed to decrypt ({0})")]
    DecryptFailure(Alert),

    #[error("malformed handshake fragment")]
    MalformedFragment,

    #[error("bad handshake sequence number {got}, expected {expected}")]
    OutOfOrderFragment { expected: u16, got: u16 },

    #[error("bad handshake fragment length")]
    BadFragmentLength,

    #[error("bad fragment offset {got}, expected {expected}")]
    BadFragmentOffset { expected: u32, got: u32 },

    #[error("handshake message of {0} bytes exceeds the maximum")]
    HandshakeMessageTooLarge(usize),

    #[error("ChangeCipherSpec not packed together with a handshake message")]
    UnpackedChangeCipherSpec,

    #[error("exceeded maximum packet length ({0} bytes)")]
    PacketTooLong(usize),

    #[error("unexpected record of type {0:?}")]
    UnexpectedRecord(ContentType),

    #[error("peer sent alert {description} (level {level})")]
    PeerAlert { level: u8, description: Alert },

    #[error("sequence number exhausted")]
    SequenceOverflow,

    #[error("Epoch is not allowed to wrap")]
    WrappedEpoch,

    #[error("ChangeCipherSpec without a pending cipher")]
    NoPendingCipher,

    #[error("DTLS 1.3 record header requires a record number encrypter")]
    MissingRecordNumberEncrypter,

    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("incompatible config: {0}")]
    IncompatibleConfig(&'static str),

    #[error("transport error: {0}")]
    Transport(io::ErrorKind),
}

impl Error {
    /// The alert to send the peer before surfacing this error, if any.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            Error::ProtocolVersionMismatch { .. } => Some(Alert::PROTOCOL_VERSION),
            Error::BadEpoch { .. } | Error::BadSequence { .. } => Some(Alert::ILLEGAL_PARAMETER),
            Error::RecordOverflow(_) => Some(Alert::RECORD_OVERFLOW),
            Error::DecryptFailure(alert) => Some(*alert),
            Error::HandshakeMessageTooLarge(_)
            | Error::NoPendingCipher
            | Error::MissingRecordNumberEncrypter
            | Error::CryptoError(_) => Some(Alert::INTERNAL_ERROR),
            _ => None,
        }
    }

    /// Whether this error latches the direction it was raised on.
    pub fn is_latching(&self) -> bool {
        !matches!(self, Error::Transport(_))
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Transport(value.kind())
    }
}
