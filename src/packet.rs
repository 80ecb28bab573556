//! Outgoing records and packets.
//!
//! Records are framed and protected one at a time by [`seal_record`], then
//! batched by [`PacketBuffer`] into datagrams that reach the transport in a
//! single write.

use crate::half::HalfConn;
use crate::header::{append_header, record_version, HeaderFormat};
use crate::mask::apply_mask;
use crate::message::{ContentType, ProtocolVersion};
use crate::transport::Transport;
use crate::{Buf, Config, Error, MAX_RECORD_HEADER_LEN};

/// Connection level inputs to record framing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Framing<'a> {
    pub config: &'a Config,
    pub negotiated: Option<ProtocolVersion>,
    pub handshake_complete: bool,
}

/// Frame, protect and (for unified headers) mask one record.
pub(crate) fn seal_record(
    half: &mut HalfConn,
    framing: Framing<'_>,
    content_type: ContentType,
    data: &[u8],
) -> Result<Buf, Error> {
    let config = framing.config;
    let bugs = config.bugs();

    let unified = half.uses_unified_header() && !bugs.dtls_use_plaintext_record_header;
    let format = if unified {
        HeaderFormat::Unified {
            set_cid: bugs.dtls13_record_header_set_cid_bit && framing.handshake_complete,
        }
    } else {
        HeaderFormat::Legacy(record_version(framing.negotiated, half.version()))
    };

    let overhead = half
        .cipher_mut()
        .map(|c| c.max_encrypt_overhead(data.len()))
        .unwrap_or_default();
    let sequence = half.sequence_mut().next_output_sequence()?;

    // DTLS 1.3 record protection uses the sequence number without the epoch.
    let mut protect_sequence = sequence;
    if half.is_dtls13() {
        protect_sequence[..2].fill(0);
    }

    let mut record = Buf::with_capacity(MAX_RECORD_HEADER_LEN + data.len() + overhead);
    let header = append_header(format, content_type, &sequence, data.len(), config, &mut record);

    match half.cipher_mut() {
        Some(cipher) => cipher.encrypt(
            &mut record,
            data,
            content_type,
            header.header_len,
            header.has_length,
            &protect_sequence,
        )?,
        None => record.extend_from_slice(data),
    }

    if unified && !bugs.null_all_ciphers {
        apply_mask(
            half.mask()?,
            &mut record,
            header.header_len,
            config.sequence_number_len(),
        )?;
    }

    trace!(
        "Sealed {:?} record seq {:02x?} ({} bytes)",
        content_type,
        sequence,
        record.len()
    );
    Ok(record)
}

/// Turn a flight of fragments into handshake record payloads.
pub(crate) fn pack_fragments(fragments: Vec<Buf>, config: &Config) -> Vec<Buf> {
    let bugs = config.bugs();
    let max_record = bugs.pack_handshake_fragments;
    let split = bugs.split_fragments;

    let mut records: Vec<Buf> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if split > 0 {
            if fragment.len() > split {
                records.push(Buf::from_slice(&fragment[..split]));
                records.push(Buf::from_slice(&fragment[split..]));
            } else {
                records.push(fragment);
            }
            continue;
        }

        match records.last_mut() {
            Some(last) if last.len() + fragment.len() <= max_record => {
                last.extend_from_slice(&fragment);
            }
            _ => records.push(fragment),
        }
    }
    records
}

/// Records waiting for the next transport write.
#[derive(Debug, Default)]
pub(crate) struct PacketBuffer {
    pending: Buf,
}

impl PacketBuffer {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Add a record to the pending packet.
    ///
    /// The packet is flushed first if the record would take it past
    /// `Bugs::pack_handshake_records`, unless `must_pack` is set.
    pub fn append(
        &mut self,
        record: &[u8],
        must_pack: bool,
        config: &Config,
        transport: &mut dyn Transport,
    ) -> Result<(), Error> {
        if !must_pack && record.len() + self.pending.len() > config.bugs().pack_handshake_records {
            self.flush(transport)?;
        }

        self.pending.extend_from_slice(record);

        // Records without a length run to the end of the datagram.
        if config.omit_record_length() {
            self.flush(transport)?;
        }
        Ok(())
    }

    /// Write the pending packet as one datagram.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Ok(());
        }
        trace!("Flushing packet of {} bytes", self.pending.len());
        // The packet is gone even if the write fails.
        let packet = std::mem::take(&mut self.pending);
        transport.write(&packet)?;
        Ok(())
    }
}
