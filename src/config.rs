use crate::{Error, DEFAULT_MAX_FRAGMENT_LEN, DEFAULT_MAX_HANDSHAKE_LEN};

/// Record layer configuration.
///
/// Shared between the read and write halves of a connection as an
/// `Arc<Config>` and never mutated after [`ConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct Config {
    short_sequence_numbers: bool,
    omit_record_length: bool,
    max_handshake_message_size: usize,
    bugs: Bugs,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            short_sequence_numbers: false,
            omit_record_length: false,
            max_handshake_message_size: DEFAULT_MAX_HANDSHAKE_LEN,
            bugs: Bugs::default(),
        }
    }

    /// Use 8 bit sequence numbers in DTLS 1.3 unified headers.
    #[inline(always)]
    pub fn short_sequence_numbers(&self) -> bool {
        self.short_sequence_numbers
    }

    /// Omit the length field from DTLS 1.3 unified headers.
    ///
    /// The record then extends to the end of the datagram, so every record
    /// is flushed as its own packet.
    #[inline(always)]
    pub fn omit_record_length(&self) -> bool {
        self.omit_record_length
    }

    /// Largest handshake message the reassembler accepts.
    #[inline(always)]
    pub fn max_handshake_message_size(&self) -> usize {
        self.max_handshake_message_size
    }

    /// Fault injection toggles.
    #[inline(always)]
    pub fn bugs(&self) -> &Bugs {
        &self.bugs
    }

    /// Width in bytes of the sequence number in a unified header.
    pub(crate) fn sequence_number_len(&self) -> usize {
        if self.short_sequence_numbers {
            1
        } else {
            2
        }
    }
}

/// Builder for record layer configuration.
pub struct ConfigBuilder {
    short_sequence_numbers: bool,
    omit_record_length: bool,
    max_handshake_message_size: usize,
    bugs: Bugs,
}

impl ConfigBuilder {
    /// Set whether to use 8 bit sequence numbers in unified headers.
    ///
    /// Defaults to false (16 bit).
    pub fn short_sequence_numbers(mut self, short: bool) -> Self {
        self.short_sequence_numbers = short;
        self
    }

    /// Set whether to omit the length field in unified headers.
    ///
    /// Defaults to false.
    pub fn omit_record_length(mut self, omit: bool) -> Self {
        self.omit_record_length = omit;
        self
    }

    /// Set the largest reassembled handshake message.
    ///
    /// Defaults to 65536.
    pub fn max_handshake_message_size(mut self, max: usize) -> Self {
        self.max_handshake_message_size = max;
        self
    }

    /// Set the fault injection toggles.
    ///
    /// Defaults to [`Bugs::default()`], which injects no faults.
    pub fn bugs(mut self, bugs: Bugs) -> Self {
        self.bugs = bugs;
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::IncompatibleConfig` for option combinations that
    /// cannot produce a well-formed datagram.
    pub fn build(self) -> Result<Config, Error> {
        if self.omit_record_length && self.bugs.split_and_pack_app_data {
            return Err(Error::IncompatibleConfig(
                "split_and_pack_app_data requires record length fields",
            ));
        }

        Ok(Config {
            short_sequence_numbers: self.short_sequence_numbers,
            omit_record_length: self.omit_record_length,
            max_handshake_message_size: self.max_handshake_message_size,
            bugs: self.bugs,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}

/// Fault injection toggles.
///
/// Each toggle is independent of the others and consulted at exactly one
/// point of the record layer. The defaults produce well-formed traffic.
#[derive(Debug, Clone)]
pub struct Bugs {
    /// Before a version is negotiated, require this version on every
    /// non-alert record received.
    pub expect_initial_record_version: Option<u16>,

    /// Ciphers are null, so record numbers are never masked.
    pub null_all_ciphers: bool,

    /// Fail reads of datagrams longer than this. 0 disables the check.
    pub max_packet_length: usize,

    /// Acknowledge every successfully decrypted record with an ACK record.
    pub ack_every_record: bool,

    /// Largest handshake fragment body. 0 means 1024.
    pub max_handshake_record_length: usize,

    /// Surround every handshake message with empty fragments.
    pub send_empty_fragments: bool,

    /// Duplicate and overlap fragments, then shuffle each flight.
    pub reorder_handshake_fragments: bool,

    /// Seed of the flight shuffle.
    pub reorder_seed: u64,

    /// Send each flight's fragments in reverse order.
    pub reverse_handshake_fragments: bool,

    /// Bump the message type of every non-initial fragment.
    pub fragment_message_type_mismatch: bool,

    /// Bump the total length of every non-initial fragment.
    pub fragment_message_length_mismatch: bool,

    /// Also send every non-Finished message unfragmented.
    pub mix_complete_message_with_fragments: bool,

    /// Also send Finished unfragmented.
    pub retransmit_finished: bool,

    /// Concatenate fragments into records of up to this many bytes.
    /// 0 gives every fragment its own record.
    pub pack_handshake_fragments: usize,

    /// Concatenate records into packets of up to this many bytes.
    /// 0 gives every record its own packet.
    pub pack_handshake_records: usize,

    /// Split every fragment longer than this across two records.
    /// 0 disables splitting.
    pub split_fragments: usize,

    /// Split application data across two records of one packet.
    pub split_and_pack_app_data: bool,

    /// Pack ChangeCipherSpec ahead of the pending handshake flight.
    pub reorder_change_cipher_spec: bool,

    /// Send a ChangeCipherSpec before every unencrypted handshake message.
    pub stray_change_cipher_spec: bool,

    /// Set the connection ID bit of unified headers once the handshake has
    /// completed.
    pub dtls13_record_header_set_cid_bit: bool,

    /// Keep using the legacy header after DTLS 1.3 keys are installed.
    pub dtls_use_plaintext_record_header: bool,
}

impl Bugs {
    pub(crate) fn max_fragment_len(&self) -> usize {
        if self.max_handshake_record_length == 0 {
            DEFAULT_MAX_FRAGMENT_LEN
        } else {
            self.max_handshake_record_length
        }
    }
}

impl Default for Bugs {
    fn default() -> Self {
        Bugs {
            expect_initial_record_version: None,
            null_all_ciphers: false,
            max_packet_length: 0,
            ack_every_record: false,
            max_handshake_record_length: 0,
            send_empty_fragments: false,
            reorder_handshake_fragments: false,
            reorder_seed: 0,
            reverse_handshake_fragments: false,
            fragment_message_type_mismatch: false,
            fragment_message_length_mismatch: false,
            mix_complete_message_with_fragments: false,
            retransmit_finished: false,
            pack_handshake_fragments: 0,
            pack_handshake_records: 1500,
            split_fragments: 0,
            split_and_pack_app_data: false,
            reorder_change_cipher_spec: false,
            stray_change_cipher_spec: false,
            dtls13_record_header_set_cid_bit: false,
            dtls_use_plaintext_record_header: false,
        }
    }
}
