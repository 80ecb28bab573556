use crate::crypto::RecordCipher;
use crate::mask::RecordNumberEncrypter;
use crate::message::ProtocolVersion;
use crate::seq::SequenceTracker;
use crate::Error;

/// Keys of one epoch, staged until ChangeCipherSpec activates them.
#[derive(Debug)]
struct PendingCipher {
    version: ProtocolVersion,
    cipher: Box<dyn RecordCipher>,
    mask: Option<Box<dyn RecordNumberEncrypter>>,
}

/// State of one direction (read or write) of a connection.
#[derive(Debug, Default)]
pub struct HalfConn {
    sequence: SequenceTracker,
    version: Option<ProtocolVersion>,
    cipher: Option<Box<dyn RecordCipher>>,
    mask: Option<Box<dyn RecordNumberEncrypter>>,
    pending: Option<PendingCipher>,
    error: Option<Error>,
}

impl HalfConn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(&self) -> &SequenceTracker {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut SequenceTracker {
        &mut self.sequence
    }

    /// Version of the active keys, if any were installed.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    pub fn has_cipher(&self) -> bool {
        self.cipher.is_some()
    }

    /// The active keys are DTLS 1.3 keys.
    pub fn is_dtls13(&self) -> bool {
        self.version.map(|v| v.is_dtls13()).unwrap_or(false)
    }

    /// Records use the unified header: DTLS 1.3 keys are active.
    pub fn uses_unified_header(&self) -> bool {
        self.has_cipher() && self.is_dtls13()
    }

    pub(crate) fn cipher_mut(&mut self) -> Option<&mut (dyn RecordCipher + 'static)> {
        self.cipher.as_deref_mut()
    }

    pub(crate) fn mask(&self) -> Result<&dyn RecordNumberEncrypter, Error> {
        self.mask.as_deref().ok_or(Error::MissingRecordNumberEncrypter)
    }

    /// Stage keys for the next ChangeCipherSpec.
    pub fn prepare_cipher(&mut self, version: ProtocolVersion, cipher: Box<dyn RecordCipher>) {
        self.pending = Some(PendingCipher {
            version,
            cipher,
            mask: None,
        });
    }

    /// Activate the staged keys and enter the next epoch.
    pub fn change_cipher_spec(&mut self) -> Result<(), Error> {
        let pending = self.pending.take().ok_or(Error::NoPendingCipher)?;
        self.sequence.next_epoch()?;
        debug!(
            "ChangeCipherSpec: {:?} keys active in epoch {}",
            pending.version,
            self.sequence.epoch()
        );
        self.version = Some(pending.version);
        self.cipher = Some(pending.cipher);
        self.mask = pending.mask;
        Ok(())
    }

    /// Install DTLS 1.3 style keys for `epoch` right away.
    ///
    /// DTLS 1.3 has no ChangeCipherSpec, the key schedule dictates the epoch.
    pub fn install_cipher(
        &mut self,
        epoch: u16,
        version: ProtocolVersion,
        cipher: Box<dyn RecordCipher>,
        mask: Option<Box<dyn RecordNumberEncrypter>>,
    ) {
        debug!("Installing {:?} keys for epoch {}", version, epoch);
        self.sequence.set_epoch(epoch);
        self.version = Some(version);
        self.cipher = Some(cipher);
        self.mask = mask;
    }

    /// The latched error, if this direction failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn check_error(&self) -> Result<(), Error> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Latch `error` (unless transient) and hand it back.
    pub(crate) fn set_error(&mut self, error: Error) -> Error {
        if error.is_latching() && self.error.is_none() {
            warn!("Latching error: {}", error);
            self.error = Some(error.clone());
        }
        error
    }
}
