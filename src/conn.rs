//! A record layer connection.
//!
//! [`Conn`] drives both directions of one DTLS association over a
//! [`Transport`]. Handshake messages written are fragmented and held until
//! the flight is flushed, and records read are validated strictly: any
//! framing violation is fatal and latches on its direction.

use std::sync::Arc;

use crate::crypto::Decrypted;
use crate::fragment::{FragmentPacker, Reassembler};
use crate::half::HalfConn;
use crate::header::decode_header;
use crate::message::{AckMessage, ContentType, ProtocolVersion};
use crate::packet::{pack_fragments, seal_record, Framing, PacketBuffer};
use crate::transport::Transport;
use crate::{Alert, Buf, Config, Error, MAX_CIPHERTEXT, MAX_RECORD_HEADER_LEN};

/// Read direction.
#[derive(Debug, Default)]
struct ReadSide {
    half: HalfConn,
    /// Unconsumed bytes of the last datagram read.
    input: Buf,
    reassembler: Reassembler,
}

/// Write direction.
#[derive(Debug, Default)]
struct WriteSide {
    half: HalfConn,
    packer: FragmentPacker,
    packet: PacketBuffer,
}

/// A DTLS record layer over a datagram transport.
#[derive(Debug)]
pub struct Conn<T: Transport> {
    config: Arc<Config>,
    transport: T,
    negotiated: Option<ProtocolVersion>,
    handshake_complete: bool,
    read: ReadSide,
    write: WriteSide,
    last_alert: Option<Alert>,
}

impl<T: Transport> Conn<T> {
    pub fn new(config: Arc<Config>, transport: T) -> Self {
        Conn {
            config,
            transport,
            negotiated: None,
            handshake_complete: false,
            read: ReadSide::default(),
            write: WriteSide::default(),
            last_alert: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The negotiated protocol version, if any.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.negotiated
    }

    /// Record the negotiated protocol version.
    ///
    /// From here on legacy headers received must carry its record version.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        debug!("Negotiated version {:?}", version);
        self.negotiated = Some(version);
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    pub fn set_handshake_complete(&mut self, complete: bool) {
        self.handshake_complete = complete;
    }

    pub fn read_half(&self) -> &HalfConn {
        &self.read.half
    }

    /// Read direction state, to install or stage keys.
    pub fn read_half_mut(&mut self) -> &mut HalfConn {
        &mut self.read.half
    }

    pub fn write_half(&self) -> &HalfConn {
        &self.write.half
    }

    /// Write direction state, to install or stage keys.
    pub fn write_half_mut(&mut self) -> &mut HalfConn {
        &mut self.write.half
    }

    /// The last alert sent to the peer.
    pub fn last_alert_sent(&self) -> Option<Alert> {
        self.last_alert
    }

    /// Bytes of the current datagram not yet consumed.
    pub fn buffered_input(&self) -> usize {
        self.read.input.len()
    }

    /// Bytes of sealed records not yet written to the transport.
    pub fn pending_packet_len(&self) -> usize {
        self.write.packet.len()
    }

    /// Read the next record, returning its content type and plaintext.
    ///
    /// Reads a datagram from the transport only when no input is buffered.
    pub fn read_record(&mut self) -> Result<(ContentType, Buf), Error> {
        self.read.half.check_error()?;
        match self.do_read_record() {
            Ok(record) => Ok(record),
            Err(e) => Err(self.fail_read(e)),
        }
    }

    fn do_read_record(&mut self) -> Result<(ContentType, Buf), Error> {
        let config = Arc::clone(&self.config);

        let mut new_packet = false;
        if self.read.input.is_empty() {
            let mut buf = vec![0; MAX_CIPHERTEXT + MAX_RECORD_HEADER_LEN];
            let n = self.transport.read(&mut buf)?;
            let max = config.bugs().max_packet_length;
            if max != 0 && n > max {
                return Err(Error::PacketTooLong(n));
            }
            trace!("Read datagram of {} bytes", n);
            self.read.input.extend_from_slice(&buf[..n]);
            new_packet = true;
        }

        let header = decode_header(
            &mut self.read.input[..],
            &mut self.read.half,
            self.negotiated,
            &config,
        )?;

        let n = header.record_len;
        let end = header.header_len + n;
        if n > MAX_CIPHERTEXT || self.read.input.len() < end {
            return Err(Error::RecordOverflow(n));
        }

        let record = &self.read.input[..end];
        let decrypted = match self.read.half.cipher_mut() {
            Some(cipher) => cipher
                .decrypt(&header.sequence, header.header_len, record)
                .map_err(Error::DecryptFailure)?,
            None => Decrypted {
                content_type: None,
                plaintext: Buf::from_slice(&record[header.header_len..]),
            },
        };
        self.read.input.consume(end);

        if config.bugs().ack_every_record {
            let sequence = u64::from_be_bytes(header.sequence);
            if let Err(e) = self.write_acks(&[sequence]) {
                warn!("Failed to acknowledge record {}: {}", sequence, e);
            }
        }

        let content_type = header
            .content_type
            .or(decrypted.content_type)
            .ok_or(Error::MalformedHeader("record without content type"))?;

        // ChangeCipherSpec must share a packet with handshake data.
        if new_packet
            && content_type == ContentType::ChangeCipherSpec
            && self.read.input.is_empty()
        {
            return Err(Error::UnpackedChangeCipherSpec);
        }

        Ok((content_type, decrypted.plaintext))
    }

    /// Read one complete handshake message (4 byte header and body).
    ///
    /// ChangeCipherSpec records met on the way activate the staged read
    /// keys, ACK records are skipped.
    pub fn read_handshake(&mut self) -> Result<Buf, Error> {
        loop {
            self.read.half.check_error()?;

            match self.read.reassembler.next_message(&self.config) {
                Ok(Some(message)) => return Ok(message),
                Ok(None) => {}
                Err(e) => return Err(self.fail_read(e)),
            }

            let (content_type, data) = self.read_record()?;
            if let Err(e) = self.handle_record(content_type, &data) {
                return Err(self.fail_read(e));
            }
        }
    }

    fn handle_record(&mut self, content_type: ContentType, data: &[u8]) -> Result<(), Error> {
        let dtls13 = self.negotiated.map(|v| v.is_dtls13()).unwrap_or(false);

        match content_type {
            ContentType::Handshake => {
                self.read.reassembler.push_record(data);
                Ok(())
            }
            ContentType::ChangeCipherSpec if !dtls13 && data == [1] => {
                self.read.half.change_cipher_spec()
            }
            ContentType::Ack => {
                debug!("Ignoring ACK of {} bytes", data.len());
                Ok(())
            }
            ContentType::Alert if data.len() >= 2 => Err(Error::PeerAlert {
                level: data[0],
                description: Alert::from_u8(data[1]),
            }),
            _ => Err(Error::UnexpectedRecord(content_type)),
        }
    }

    /// Latch a read error, alerting the peer first when the error calls
    /// for it.
    fn fail_read(&mut self, error: Error) -> Error {
        if error.is_latching() {
            if let Some(alert) = error.alert() {
                self.alert_peer(alert);
            }
        }
        self.read.half.set_error(error)
    }

    /// Write a record of any type.
    ///
    /// Handshake messages are queued as fragments until the flight is
    /// flushed. A non-handshake record packs any pending flight first and,
    /// apart from ChangeCipherSpec, flushes the packet.
    pub fn write_record(&mut self, content_type: ContentType, data: &[u8]) -> Result<usize, Error> {
        self.write.half.check_error()?;
        match self.do_write_record(content_type, data) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail_write(e)),
        }
    }

    fn do_write_record(&mut self, content_type: ContentType, data: &[u8]) -> Result<usize, Error> {
        let config = Arc::clone(&self.config);
        let bugs = config.bugs();
        let dtls13 = self.negotiated.map(|v| v.is_dtls13()).unwrap_or(false);

        if content_type == ContentType::ChangeCipherSpec && dtls13 {
            trace!("Dropping ChangeCipherSpec under DTLS 1.3");
            return Ok(0);
        }

        if content_type != ContentType::Handshake {
            let reorder =
                content_type == ContentType::ChangeCipherSpec && bugs.reorder_change_cipher_spec;

            if !reorder {
                self.pack_handshake()?;
            }

            if content_type == ContentType::ApplicationData
                && data.len() > 1
                && bugs.split_and_pack_app_data
            {
                let (first, second) = data.split_at(data.len() / 2);
                self.pack_record(content_type, first, false)?;
                self.pack_record(content_type, second, true)?;
            } else {
                self.pack_record(content_type, data, false)?;
            }

            if reorder {
                self.pack_handshake()?;
            }

            if content_type == ContentType::ChangeCipherSpec {
                // Flushed along with the rest of the flight.
                self.write.half.change_cipher_spec()?;
            } else {
                self.flush_packet()?;
            }
            return Ok(data.len());
        }

        if !self.write.half.has_cipher() && bugs.stray_change_cipher_spec {
            self.pack_record(ContentType::ChangeCipherSpec, &[1], false)?;
        }

        self.write.packer.queue_message(&config, data)
    }

    /// Queue a handshake message (4 byte header and body).
    pub fn write_handshake(&mut self, message: &[u8]) -> Result<usize, Error> {
        self.write_record(ContentType::Handshake, message)
    }

    /// Send ChangeCipherSpec and activate the staged write keys.
    pub fn write_change_cipher_spec(&mut self) -> Result<(), Error> {
        self.write_record(ContentType::ChangeCipherSpec, &[1])?;
        Ok(())
    }

    /// Acknowledge records of the current read epoch.
    pub fn write_acks(&mut self, sequences: &[u64]) -> Result<(), Error> {
        let ack = AckMessage::for_epoch(self.read.half.sequence().epoch(), sequences);
        let mut body = Buf::new();
        ack.serialize(&mut body);
        self.write_record(ContentType::Ack, &body)?;
        Ok(())
    }

    /// Pack the pending flight and write it out.
    pub fn flush_handshake(&mut self) -> Result<(), Error> {
        self.write.half.check_error()?;
        let res = self.pack_handshake().and_then(|_| self.flush_packet());
        match res {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_write(e)),
        }
    }

    /// Write out the pending packet, if any.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.write.half.check_error()?;
        match self.flush_packet() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail_write(e)),
        }
    }

    /// Send a fatal alert.
    pub fn send_alert(&mut self, alert: Alert) -> Result<(), Error> {
        self.write.half.check_error()?;
        self.write_alert(alert)
            .map_err(|e| self.write.half.set_error(e))
    }

    fn write_alert(&mut self, alert: Alert) -> Result<(), Error> {
        warn!("Sending alert {}", alert);
        self.do_write_record(ContentType::Alert, &alert.to_record_body())?;
        self.last_alert = Some(alert);
        Ok(())
    }

    /// Best effort alert while failing.
    fn alert_peer(&mut self, alert: Alert) {
        if let Some(e) = self.write.half.error() {
            warn!("Not sending alert {}, write side failed: {}", alert, e);
            return;
        }
        if let Err(e) = self.write_alert(alert) {
            warn!("Failed to send alert {}: {}", alert, e);
        }
    }

    fn fail_write(&mut self, error: Error) -> Error {
        if error.is_latching() {
            if let Some(alert) = error.alert() {
                self.alert_peer(alert);
            }
        }
        self.write.half.set_error(error)
    }

    fn pack_handshake(&mut self) -> Result<(), Error> {
        let flight = self.write.packer.take_flight(&self.config);
        if flight.is_empty() {
            return Ok(());
        }
        debug!("Packing flight of {} fragments", flight.len());

        for record in pack_fragments(flight, &self.config) {
            self.pack_record(ContentType::Handshake, &record, false)?;
        }
        Ok(())
    }

    fn pack_record(
        &mut self,
        content_type: ContentType,
        data: &[u8],
        must_pack: bool,
    ) -> Result<(), Error> {
        let framing = Framing {
            config: &self.config,
            negotiated: self.negotiated,
            handshake_complete: self.handshake_complete,
        };
        let record = seal_record(&mut self.write.half, framing, content_type, data)?;
        self.write
            .packet
            .append(&record, must_pack, &self.config, &mut self.transport)
    }

    fn flush_packet(&mut self) -> Result<(), Error> {
        self.write.packet.flush(&mut self.transport)
    }
}
