//! Shared helpers for record layer integration tests.

#![allow(unused)]

use std::sync::Arc;

use dtls_record::crypto::{AesRecordNumberEncrypter, Dtls13Aead};
use dtls_record::message::ProtocolVersion;
use dtls_record::{Bugs, Config, Conn, MemoryTransport, RecordCipher, RecordNumberEncrypter};

pub type Peer = Conn<MemoryTransport>;

/// Handshake message types used in the tests.
pub const CLIENT_HELLO: u8 = 1;
pub const ENCRYPTED_EXTENSIONS: u8 = 8;
pub const CERTIFICATE: u8 = 11;
pub const FINISHED: u8 = 20;

pub fn config(bugs: Bugs) -> Config {
    Config::builder().bugs(bugs).build().expect("valid config")
}

/// Two connected peers sharing one config.
pub fn pair(config: Config) -> (Peer, Peer) {
    pair_with(config.clone(), config)
}

pub fn pair_with(client: Config, server: Config) -> (Peer, Peer) {
    let (a, b) = MemoryTransport::pair();
    (
        Conn::new(Arc::new(client), a),
        Conn::new(Arc::new(server), b),
    )
}

/// A handshake message with a 4 byte header and a counting body.
pub fn handshake_message(msg_type: u8, body_len: usize) -> Vec<u8> {
    let len = (body_len as u32).to_be_bytes();
    let mut m = vec![msg_type, len[1], len[2], len[3]];
    m.extend((0..body_len).map(|i| (i % 251) as u8));
    m
}

/// Take every datagram waiting at `peer`'s end.
pub fn take_datagrams(peer: &Peer) -> Vec<Vec<u8>> {
    std::iter::from_fn(|| peer.transport().pop_datagram()).collect()
}

/// Put datagrams back for `peer` to read.
pub fn deliver(datagrams: &[Vec<u8>], peer: &Peer) {
    for d in datagrams {
        peer.transport().inject(d);
    }
}

/// Parsed legacy record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecHdr {
    pub ctype: u8,
    pub epoch: u16,
    pub seq: u64,
    pub len: usize,
}

/// Parse the legacy record headers of a datagram.
pub fn parse_records(datagram: &[u8]) -> Vec<RecHdr> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 13 <= datagram.len() {
        let ctype = datagram[i];
        let epoch = u16::from_be_bytes([datagram[i + 3], datagram[i + 4]]);
        let mut seq_bytes = [0u8; 8];
        seq_bytes[2..].copy_from_slice(&datagram[i + 5..i + 11]);
        let seq = u64::from_be_bytes(seq_bytes);
        let len = u16::from_be_bytes([datagram[i + 11], datagram[i + 12]]) as usize;
        out.push(RecHdr {
            ctype,
            epoch,
            seq,
            len,
        });
        i += 13 + len;
    }
    out
}

/// (offset, length) of the handshake fragments in a datagram of plaintext
/// legacy records.
pub fn fragment_spans(datagram: &[u8]) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let mut i = 0usize;
    for rec in parse_records(datagram) {
        let body = &datagram[i + 13..i + 13 + rec.len];
        if rec.ctype == 22 {
            let mut j = 0;
            while j + 12 <= body.len() {
                let u24 = |b: &[u8]| u32::from_be_bytes([0, b[0], b[1], b[2]]);
                let offset = u24(&body[j + 6..]);
                let len = u24(&body[j + 9..]);
                out.push((offset, len));
                j += 12 + len as usize;
            }
        }
        i += 13 + rec.len;
    }
    out
}

/// Install matching DTLS 1.3 keys for `epoch` in both directions.
pub fn install_dtls13(client: &mut Peer, server: &mut Peer, epoch: u16) {
    for peer in [&mut *client, &mut *server] {
        peer.set_version(ProtocolVersion::DTLS1_3);
    }

    let keys = |seed: u8| -> (Box<dyn RecordCipher>, Box<dyn RecordNumberEncrypter>) {
        let cipher = Dtls13Aead::new(&[seed; 16], [seed; 12]).expect("aead key");
        let mask = AesRecordNumberEncrypter::new(&[seed ^ 0x5a; 16]).expect("sn key");
        (Box::new(cipher), Box::new(mask))
    };

    let (c, m) = keys(1);
    client
        .write_half_mut()
        .install_cipher(epoch, ProtocolVersion::DTLS1_3, c, Some(m));
    let (c, m) = keys(1);
    server
        .read_half_mut()
        .install_cipher(epoch, ProtocolVersion::DTLS1_3, c, Some(m));

    let (c, m) = keys(2);
    server
        .write_half_mut()
        .install_cipher(epoch, ProtocolVersion::DTLS1_3, c, Some(m));
    let (c, m) = keys(2);
    client
        .read_half_mut()
        .install_cipher(epoch, ProtocolVersion::DTLS1_3, c, Some(m));
}
