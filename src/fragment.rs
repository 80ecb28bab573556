//! Handshake message fragmentation.
//!
//! [`FragmentPacker`] turns outgoing handshake messages into DTLS fragments,
//! queued until the flight is packed into records. [`Reassembler`] does the
//! reverse for incoming handshake records. It insists on fragments arriving
//! in order and without overlap.

use std::mem;

use crate::message::{FragmentHeader, MessageType, FRAGMENT_HEADER_LEN, MESSAGE_HEADER_LEN};
use crate::rng::SeededRng;
use crate::{Buf, Config, Error};

/// Write side fragment queue.
#[derive(Debug, Default)]
pub struct FragmentPacker {
    pending: Vec<Buf>,
    send_seq: u16,
}

impl FragmentPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message sequence number of the next queued message.
    pub fn send_seq(&self) -> u16 {
        self.send_seq
    }

    /// Number of fragments waiting to be packed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue the fragments of one handshake message.
    ///
    /// `message` is the 4 byte handshake header followed by the body.
    /// Returns the number of body bytes the fragments cover.
    pub fn queue_message(&mut self, config: &Config, message: &[u8]) -> Result<usize, Error> {
        if message.len() < MESSAGE_HEADER_LEN {
            return Err(Error::MalformedFragment);
        }
        let (header, body) = message.split_at(MESSAGE_HEADER_LEN);
        let bugs = config.bugs();
        let max = bugs.max_fragment_len();
        let is_finished = MessageType::from_u8(header[0]) == MessageType::Finished;

        if bugs.send_empty_fragments {
            let empty = self.fragment(header, body, 0, 0);
            self.pending.push(empty);
        }

        let mut offset = 0;
        let mut covered = 0;
        let mut first = true;
        while first || offset < body.len() {
            first = false;
            let mut len = (body.len() - offset).min(max);

            let mut fragment = self.fragment(header, body, offset, len);
            if bugs.fragment_message_type_mismatch && offset > 0 {
                fragment[0] = fragment[0].wrapping_add(1);
            }
            if bugs.fragment_message_length_mismatch && offset > 0 {
                fragment[3] = fragment[3].wrapping_add(1);
            }

            if bugs.reorder_handshake_fragments {
                // Finished is never duplicated, a copy reads as a retransmit.
                if !is_finished {
                    self.pending.push(fragment.clone());
                }
                // Overlap each fragment by half.
                len = len.min((max + 1) / 2);
            }
            self.pending.push(fragment);

            offset += len;
            covered += len;
        }

        if bugs.send_empty_fragments {
            let empty = self.fragment(header, body, body.len(), 0);
            self.pending.push(empty);
        }

        let send_twice = if is_finished {
            bugs.retransmit_finished
        } else {
            bugs.mix_complete_message_with_fragments
        };
        if send_twice {
            let whole = self.fragment(header, body, 0, body.len());
            self.pending.push(whole);
        }

        debug!(
            "Queued handshake message seq {} ({} bytes), {} fragments pending",
            self.send_seq,
            body.len(),
            self.pending.len()
        );
        self.send_seq = self.send_seq.wrapping_add(1);
        Ok(covered)
    }

    fn fragment(&self, header: &[u8], body: &[u8], offset: usize, len: usize) -> Buf {
        let mut out = Buf::with_capacity(FRAGMENT_HEADER_LEN + len);
        FragmentHeader::serialize_parts(
            header,
            self.send_seq,
            offset as u32,
            len as u32,
            &mut out,
        );
        out.extend_from_slice(&body[offset..offset + len]);
        out
    }

    /// Drain the queued fragments in send order.
    pub fn take_flight(&mut self, config: &Config) -> Vec<Buf> {
        let mut flight = mem::take(&mut self.pending);
        let bugs = config.bugs();

        if bugs.reorder_handshake_fragments {
            SeededRng::new(bugs.reorder_seed).shuffle(&mut flight);
        } else if bugs.reverse_handshake_fragments {
            flight.reverse();
        }
        flight
    }
}

/// Read side handshake reassembly.
#[derive(Debug, Default)]
pub struct Reassembler {
    /// Unread bytes of the current handshake record.
    record: Buf,
    /// 4 byte header plus the body assembled so far.
    message: Option<Buf>,
    total: usize,
    recv_seq: u16,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message sequence number of the next expected message.
    pub fn recv_seq(&self) -> u16 {
        self.recv_seq
    }

    /// The current handshake record is exhausted.
    pub fn needs_data(&self) -> bool {
        self.record.is_empty()
    }

    /// Feed the plaintext of a handshake record.
    pub fn push_record(&mut self, data: &[u8]) {
        self.record.extend_from_slice(data);
    }

    /// Consume fragments until a message is complete.
    ///
    /// Returns `Ok(None)` when the buffered records run out first.
    pub fn next_message(&mut self, config: &Config) -> Result<Option<Buf>, Error> {
        loop {
            if let Some(message) = &self.message {
                if message.len() >= MESSAGE_HEADER_LEN + self.total {
                    return Ok(self.complete());
                }
            }
            if self.record.is_empty() {
                return Ok(None);
            }
            self.read_fragment(config)?;
        }
    }

    fn complete(&mut self) -> Option<Buf> {
        let message = self.message.take();
        debug!(
            "Reassembled handshake message seq {} ({} bytes)",
            self.recv_seq, self.total
        );
        self.total = 0;
        self.recv_seq = self.recv_seq.wrapping_add(1);
        message
    }

    fn read_fragment(&mut self, config: &Config) -> Result<(), Error> {
        if self.record.len() < FRAGMENT_HEADER_LEN {
            return Err(Error::MalformedFragment);
        }
        let (rest, header) =
            FragmentHeader::parse(&self.record).map_err(|_| Error::MalformedFragment)?;
        let fragment_len = header.fragment_length as usize;
        if rest.len() < fragment_len {
            return Err(Error::MalformedFragment);
        }

        if header.message_seq != self.recv_seq {
            return Err(Error::OutOfOrderFragment {
                expected: self.recv_seq,
                got: header.message_seq,
            });
        }

        let total = header.length as usize;
        if self.message.is_none() {
            if total > config.max_handshake_message_size() {
                return Err(Error::HandshakeMessageTooLarge(total));
            }
            self.total = total;
            self.message = Some(Buf::from_slice(&self.record[..MESSAGE_HEADER_LEN]));
        } else if total != self.total {
            return Err(Error::BadFragmentLength);
        }

        let offset = header.fragment_offset as usize;
        let assembled = self
            .message
            .as_ref()
            .map(|m| m.len() - MESSAGE_HEADER_LEN)
            .unwrap_or_default();
        if offset != assembled {
            return Err(Error::BadFragmentOffset {
                expected: assembled as u32,
                got: header.fragment_offset,
            });
        }
        if offset + fragment_len > self.total {
            return Err(Error::BadFragmentLength);
        }

        trace!(
            "Fragment seq {} offset {} len {} of {}",
            header.message_seq,
            offset,
            fragment_len,
            self.total
        );
        let start = FRAGMENT_HEADER_LEN;
        if let Some(message) = self.message.as_mut() {
            message.extend_from_slice(&self.record[start..start + fragment_len]);
        }
        self.record.consume(start + fragment_len);
        Ok(())
    }
}
