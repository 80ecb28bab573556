//! DTLS 1.3 unified headers, record number masking and AEAD protection.

use dtls_record::crypto::Dtls13Aead;
use dtls_record::message::{AckMessage, ContentType, ProtocolVersion};
use dtls_record::{Alert, Bugs, Config, Error};

use crate::common::*;

fn dtls13_pair(client: Config, server: Config, epoch: u16) -> (Peer, Peer) {
    let (mut client, mut server) = pair_with(client, server);
    install_dtls13(&mut client, &mut server, epoch);
    (client, server)
}

#[test]
fn plaintext_records_carry_dtls12_version() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client.set_version(ProtocolVersion::DTLS1_3);
    server.set_version(ProtocolVersion::DTLS1_3);

    let hello = handshake_message(CLIENT_HELLO, 20);
    client.write_handshake(&hello).unwrap();
    client.flush_handshake().unwrap();

    let d = server.transport().pop_datagram().unwrap();
    assert_eq!(&d[..3], &[22, 0xfe, 0xfd]);

    deliver(&[d], &server);
    assert_eq!(&server.read_handshake().unwrap()[..], &hello[..]);
}

#[test]
fn encrypted_handshake_message() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = dtls13_pair(Config::default(), Config::default(), 2);
    let ee = handshake_message(ENCRYPTED_EXTENSIONS, 2);
    client.write_handshake(&ee).unwrap();
    client.flush_handshake().unwrap();

    let d = server.transport().pop_datagram().unwrap();
    // fixed bits, 16 bit sequence, length, epoch 2
    assert_eq!(d[0], 0x2e);
    // fragment + inner type + tag
    let body = 12 + 2 + 1 + 16;
    assert_eq!(&d[3..5], &(body as u16).to_be_bytes());
    assert_eq!(d.len(), 5 + body);

    deliver(&[d], &server);
    assert_eq!(&server.read_handshake().unwrap()[..], &ee[..]);
}

#[test]
fn application_data_both_ways() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = dtls13_pair(Config::default(), Config::default(), 3);

    for i in 0..3u8 {
        client
            .write_record(ContentType::ApplicationData, &[i; 20])
            .unwrap();
    }
    for i in 0..3u8 {
        let (ct, data) = server.read_record().unwrap();
        assert_eq!(ct, ContentType::ApplicationData);
        assert_eq!(&data[..], &[i; 20]);
    }
    assert_eq!(server.read_half().sequence().current(), [0, 3, 0, 0, 0, 0, 0, 2]);

    server
        .write_record(ContentType::ApplicationData, b"pong")
        .unwrap();
    let (_, data) = client.read_record().unwrap();
    assert_eq!(&data[..], b"pong");
}

#[test]
fn sequence_numbers_are_masked() {
    let _ = env_logger::try_init();

    let (mut client, server) = dtls13_pair(Config::default(), Config::default(), 3);
    for _ in 0..4 {
        client
            .write_record(ContentType::ApplicationData, b"data")
            .unwrap();
    }

    let wire: Vec<_> = take_datagrams(&server)
        .iter()
        .map(|d| [d[1], d[2]])
        .collect();
    let plain: Vec<_> = (0u16..4).map(|s| s.to_be_bytes()).collect();
    assert_ne!(wire, plain);
}

#[test]
fn null_ciphers_leave_sequence_unmasked() {
    let _ = env_logger::try_init();

    let config = config(Bugs {
        null_all_ciphers: true,
        ..Default::default()
    });
    let (mut client, mut server) = dtls13_pair(config.clone(), config, 3);
    for _ in 0..2 {
        client
            .write_record(ContentType::ApplicationData, b"data")
            .unwrap();
    }

    let datagrams = take_datagrams(&server);
    assert_eq!(&datagrams[0][..3], &[0x2f, 0x00, 0x00]);
    assert_eq!(&datagrams[1][..3], &[0x2f, 0x00, 0x01]);

    deliver(&datagrams, &server);
    assert_eq!(&server.read_record().unwrap().1[..], b"data");
    assert_eq!(&server.read_record().unwrap().1[..], b"data");
}

#[test]
fn sequence_reconstructed_across_wrap() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = dtls13_pair(Config::default(), Config::default(), 3);
    client.write_half_mut().sequence_mut().advance(0xffff);
    server.read_half_mut().sequence_mut().advance(0xfff0);

    for data in [&b"before"[..], b"after"] {
        client
            .write_record(ContentType::ApplicationData, data)
            .unwrap();
    }

    assert_eq!(&server.read_record().unwrap().1[..], b"before");
    assert_eq!(server.read_half().sequence().sequence(), 0xffff);
    assert_eq!(&server.read_record().unwrap().1[..], b"after");
    assert_eq!(server.read_half().sequence().sequence(), 0x1_0000);
}

#[test]
fn epoch_bits_must_match() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = dtls13_pair(Config::default(), Config::default(), 3);
    server.read_half_mut().sequence_mut().set_epoch(2);

    client
        .write_record(ContentType::ApplicationData, b"data")
        .unwrap();
    assert_eq!(
        server.read_record(),
        Err(Error::BadEpoch {
            got: 3,
            expected: 2
        })
    );
    assert_eq!(server.last_alert_sent(), Some(Alert::ILLEGAL_PARAMETER));
}

#[test]
fn tampered_record_fails_decryption() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = dtls13_pair(Config::default(), Config::default(), 3);
    client
        .write_record(ContentType::ApplicationData, b"secret")
        .unwrap();

    let mut d = server.transport().pop_datagram().unwrap();
    let last = d.len() - 1;
    d[last] ^= 0x01;
    server.transport().inject(&d);

    assert_eq!(
        server.read_record(),
        Err(Error::DecryptFailure(Alert::BAD_RECORD_MAC))
    );
    assert_eq!(server.last_alert_sent(), Some(Alert::BAD_RECORD_MAC));

    // The alert is protected with the server's write keys.
    let (ct, body) = client.read_record().unwrap();
    assert_eq!(ct, ContentType::Alert);
    assert_eq!(&body[..], &[2, 20]);
}

#[test]
fn acks_use_read_epoch() {
    let _ = env_logger::try_init();

    let server_config = config(Bugs {
        ack_every_record: true,
        ..Default::default()
    });
    let (mut client, mut server) = dtls13_pair(Config::default(), server_config, 3);

    client
        .write_record(ContentType::ApplicationData, b"data")
        .unwrap();
    server.read_record().unwrap();

    let (ct, body) = client.read_record().unwrap();
    assert_eq!(ct, ContentType::Ack);
    let (_, ack) = AckMessage::parse(&body).unwrap();
    assert!(ack.acknowledges(3, 0));
}

#[test]
fn change_cipher_spec_is_not_sent() {
    let _ = env_logger::try_init();

    let (mut client, server) = dtls13_pair(Config::default(), Config::default(), 2);
    client.write_change_cipher_spec().unwrap();
    client.flush().unwrap();
    assert_eq!(server.transport().queued(), 0);
}

#[test]
fn short_headers_without_length() {
    let _ = env_logger::try_init();

    let client_config = Config::builder()
        .short_sequence_numbers(true)
        .omit_record_length(true)
        .build()
        .unwrap();
    let (mut client, mut server) = dtls13_pair(client_config, Config::default(), 3);

    client
        .write_handshake(&handshake_message(ENCRYPTED_EXTENSIONS, 4))
        .unwrap();
    client
        .write_handshake(&handshake_message(CERTIFICATE, 4))
        .unwrap();
    client.flush_handshake().unwrap();

    // One record per datagram, as the length is implied.
    let datagrams = take_datagrams(&server);
    assert_eq!(datagrams.len(), 2);
    for d in &datagrams {
        assert_eq!(d[0], 0x23);
        assert_eq!(d.len(), 2 + 12 + 4 + 1 + 16);
    }

    // The reader only accepts the full header form.
    deliver(&datagrams, &server);
    assert!(matches!(
        server.read_handshake(),
        Err(Error::MalformedHeader(_))
    ));
}

#[test]
fn cid_bit_after_handshake_complete() {
    let _ = env_logger::try_init();

    let client_config = config(Bugs {
        dtls13_record_header_set_cid_bit: true,
        ..Default::default()
    });
    let (mut client, mut server) = dtls13_pair(client_config, Config::default(), 3);

    client
        .write_record(ContentType::ApplicationData, b"before")
        .unwrap();
    client.set_handshake_complete(true);
    client
        .write_record(ContentType::ApplicationData, b"after")
        .unwrap();

    let datagrams = take_datagrams(&server);
    assert_eq!(datagrams[0][0], 0x2f);
    assert_eq!(datagrams[1][0], 0x3f);

    deliver(&datagrams, &server);
    assert_eq!(&server.read_record().unwrap().1[..], b"before");
    assert!(matches!(
        server.read_record(),
        Err(Error::MalformedHeader(_))
    ));
}

#[test]
fn plaintext_header_with_dtls13_keys() {
    let _ = env_logger::try_init();

    let client_config = config(Bugs {
        dtls_use_plaintext_record_header: true,
        ..Default::default()
    });
    let (mut client, mut server) = dtls13_pair(client_config, Config::default(), 3);
    client
        .write_record(ContentType::ApplicationData, b"data")
        .unwrap();

    let d = server.transport().pop_datagram().unwrap();
    assert_eq!(&d[..5], &[23, 0xfe, 0xfd, 0x00, 0x03]);
    let len = u16::from_be_bytes([d[11], d[12]]) as usize;
    assert_eq!(len, 4 + 1 + 16);

    deliver(&[d], &server);
    assert!(matches!(
        server.read_record(),
        Err(Error::MalformedHeader(_))
    ));
}

#[test]
fn unified_header_needs_record_number_encrypter() {
    let _ = env_logger::try_init();

    let (mut client, server) = pair(Config::default());
    client.set_version(ProtocolVersion::DTLS1_3);
    let cipher = Dtls13Aead::new(&[1; 16], [1; 12]).unwrap();
    client
        .write_half_mut()
        .install_cipher(2, ProtocolVersion::DTLS1_3, Box::new(cipher), None);

    assert_eq!(
        client.write_record(ContentType::ApplicationData, b"data"),
        Err(Error::MissingRecordNumberEncrypter)
    );
    // The alert cannot be framed either.
    assert_eq!(client.last_alert_sent(), None);
    assert_eq!(server.transport().queued(), 0);
    assert_eq!(client.flush(), Err(Error::MissingRecordNumberEncrypter));
}
