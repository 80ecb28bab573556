//! Well-formed traffic and strict validation on the read side.

use dtls_record::message::{AckMessage, ContentType, ProtocolVersion};
use dtls_record::{Alert, Bugs, Config, Error, NullCipher};

use crate::common::*;

#[test]
fn flight_packs_into_datagrams() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    let hello = handshake_message(CLIENT_HELLO, 10);
    let cert = handshake_message(CERTIFICATE, 3000);

    client.write_handshake(&hello).unwrap();
    client.write_handshake(&cert).unwrap();
    assert_eq!(server.transport().queued(), 0);
    client.flush_handshake().unwrap();

    let datagrams = take_datagrams(&server);
    let sizes: Vec<_> = datagrams.iter().map(|d| d.len()).collect();
    // 35 + 1049 | 1049 | 977
    assert_eq!(sizes, [1084, 1049, 977]);

    let headers: Vec<_> = datagrams.iter().flat_map(|d| parse_records(d)).collect();
    let seqs: Vec<_> = headers.iter().map(|h| h.seq).collect();
    assert_eq!(seqs, [0, 1, 2, 3]);
    assert!(headers.iter().all(|h| h.ctype == 22 && h.epoch == 0));

    deliver(&datagrams, &server);
    assert_eq!(&server.read_handshake().unwrap()[..], &hello[..]);
    assert_eq!(&server.read_handshake().unwrap()[..], &cert[..]);
}

#[test]
fn initial_records_use_dtls10_version() {
    let _ = env_logger::try_init();

    let (mut client, server) = pair(Config::default());
    client
        .write_handshake(&handshake_message(CLIENT_HELLO, 2))
        .unwrap();
    client.flush_handshake().unwrap();

    let d = server.transport().pop_datagram().unwrap();
    assert_eq!(&d[1..3], &[0xfe, 0xff]);
}

#[test]
fn change_cipher_spec_shares_datagram_with_finished() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    for peer in [&mut client, &mut server] {
        peer.set_version(ProtocolVersion::DTLS1_2);
    }
    client
        .write_half_mut()
        .prepare_cipher(ProtocolVersion::DTLS1_2, Box::new(NullCipher::new()));
    server
        .read_half_mut()
        .prepare_cipher(ProtocolVersion::DTLS1_2, Box::new(NullCipher::new()));

    client.write_change_cipher_spec().unwrap();
    client
        .write_handshake(&handshake_message(FINISHED, 12))
        .unwrap();
    client.flush_handshake().unwrap();

    let datagrams = take_datagrams(&server);
    assert_eq!(datagrams.len(), 1);
    let headers = parse_records(&datagrams[0]);
    assert_eq!(headers.len(), 2);
    assert_eq!((headers[0].ctype, headers[0].epoch), (20, 0));
    assert_eq!((headers[1].ctype, headers[1].epoch, headers[1].seq), (22, 1, 0));

    deliver(&datagrams, &server);
    let finished = server.read_handshake().unwrap();
    assert_eq!(finished[0], FINISHED);
    assert_eq!(server.read_half().sequence().epoch(), 1);
}

#[test]
fn sequence_numbers_must_not_regress() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client
        .write_record(ContentType::ApplicationData, b"one")
        .unwrap();
    client
        .write_record(ContentType::ApplicationData, b"two")
        .unwrap();

    let mut datagrams = take_datagrams(&server);
    assert_eq!(datagrams.len(), 2);
    datagrams.swap(0, 1);
    deliver(&datagrams, &server);

    let (_, data) = server.read_record().unwrap();
    assert_eq!(&data[..], b"two");
    assert_eq!(
        server.read_record(),
        Err(Error::BadSequence {
            got: 0,
            expected: 1
        })
    );
    assert_eq!(server.last_alert_sent(), Some(Alert::ILLEGAL_PARAMETER));

    // The alert reaches the client.
    let (ct, body) = client.read_record().unwrap();
    assert_eq!(ct, ContentType::Alert);
    assert_eq!(&body[..], &[2, 47]);
}

#[test]
fn duplicate_sequence_is_accepted() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client
        .write_record(ContentType::ApplicationData, b"again")
        .unwrap();
    let d = server.transport().pop_datagram().unwrap();
    deliver(&[d.clone(), d], &server);

    for _ in 0..2 {
        let (_, data) = server.read_record().unwrap();
        assert_eq!(&data[..], b"again");
    }
}

#[test]
fn wrong_epoch_is_fatal() {
    let _ = env_logger::try_init();

    let (client, mut server) = pair(Config::default());
    // epoch 1 while the server reads epoch 0
    server
        .transport()
        .inject(&[22, 0xfe, 0xfd, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]);

    let err = server.read_handshake().unwrap_err();
    assert_eq!(err, Error::BadEpoch { got: 1, expected: 0 });
    assert_eq!(err.alert(), Some(Alert::ILLEGAL_PARAMETER));
    assert_eq!(server.last_alert_sent(), Some(Alert::ILLEGAL_PARAMETER));
    assert_eq!(client.transport().queued(), 1);
}

#[test]
fn errors_latch_without_reading() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    server.transport().inject(&[22, 0xfe]);
    assert!(matches!(
        server.read_record(),
        Err(Error::MalformedHeader(_))
    ));

    client
        .write_record(ContentType::ApplicationData, b"late")
        .unwrap();
    assert!(matches!(
        server.read_handshake(),
        Err(Error::MalformedHeader(_))
    ));
    assert_eq!(server.transport().queued(), 1);
    assert!(server.read_half().error().is_some());
    assert!(server.write_half().error().is_none());
}

#[test]
fn negotiated_version_is_enforced() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    server.set_version(ProtocolVersion::DTLS1_2);

    client
        .write_handshake(&handshake_message(CLIENT_HELLO, 4))
        .unwrap();
    client.flush_handshake().unwrap();

    assert_eq!(
        server.read_handshake(),
        Err(Error::ProtocolVersionMismatch {
            got: 0xfeff,
            expected: 0xfefd
        })
    );
    assert_eq!(server.last_alert_sent(), Some(Alert::PROTOCOL_VERSION));
}

#[test]
fn initial_record_version_expectation() {
    let _ = env_logger::try_init();

    let server_config = config(Bugs {
        expect_initial_record_version: Some(0xfefd),
        ..Default::default()
    });
    let (mut client, mut server) = pair_with(Config::default(), server_config);

    client
        .write_handshake(&handshake_message(CLIENT_HELLO, 4))
        .unwrap();
    client.flush_handshake().unwrap();

    assert!(matches!(
        server.read_handshake(),
        Err(Error::ProtocolVersionMismatch { got: 0xfeff, .. })
    ));
}

#[test]
fn peer_alert_surfaces() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    server.send_alert(Alert::INTERNAL_ERROR).unwrap();

    assert_eq!(
        client.read_handshake(),
        Err(Error::PeerAlert {
            level: 2,
            description: Alert::INTERNAL_ERROR
        })
    );
    // Receiving an alert is not answered with one.
    assert_eq!(client.last_alert_sent(), None);
}

#[test]
fn application_data_during_handshake_is_unexpected() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client
        .write_record(ContentType::ApplicationData, b"early")
        .unwrap();

    assert_eq!(
        server.read_handshake(),
        Err(Error::UnexpectedRecord(ContentType::ApplicationData))
    );
}

#[test]
fn every_record_is_acknowledged() {
    let _ = env_logger::try_init();

    let server_config = config(Bugs {
        ack_every_record: true,
        ..Default::default()
    });
    let (mut client, mut server) = pair_with(Config::default(), server_config);

    for data in [&b"a"[..], b"b"] {
        client
            .write_record(ContentType::ApplicationData, data)
            .unwrap();
    }
    server.read_record().unwrap();
    server.read_record().unwrap();

    for seq in 0..2 {
        let (ct, body) = client.read_record().unwrap();
        assert_eq!(ct, ContentType::Ack);
        let (rest, ack) = AckMessage::parse(&body).unwrap();
        assert!(rest.is_empty());
        assert_eq!(ack.record_numbers.len(), 1);
        assert!(ack.acknowledges(0, seq));
    }
}

#[test]
fn acks_are_skipped_while_reading_handshake() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client.write_acks(&[7]).unwrap();
    client
        .write_handshake(&handshake_message(CLIENT_HELLO, 3))
        .unwrap();
    client.flush_handshake().unwrap();

    let msg = server.read_handshake().unwrap();
    assert_eq!(msg[0], CLIENT_HELLO);
}

#[test]
fn oversized_handshake_message() {
    let _ = env_logger::try_init();

    let server_config = Config::builder()
        .max_handshake_message_size(100)
        .build()
        .unwrap();
    let (mut client, mut server) = pair_with(Config::default(), server_config);

    client
        .write_handshake(&handshake_message(CERTIFICATE, 101))
        .unwrap();
    client.flush_handshake().unwrap();

    assert_eq!(
        server.read_handshake(),
        Err(Error::HandshakeMessageTooLarge(101))
    );
    assert_eq!(server.last_alert_sent(), Some(Alert::INTERNAL_ERROR));
}

#[test]
fn truncated_record_overflows() {
    let _ = env_logger::try_init();

    let (mut client, mut server) = pair(Config::default());
    client
        .write_record(ContentType::ApplicationData, &[0; 40])
        .unwrap();
    let mut d = server.transport().pop_datagram().unwrap();
    d.truncate(30);
    server.transport().inject(&d);

    assert_eq!(server.read_record(), Err(Error::RecordOverflow(40)));
    assert_eq!(server.last_alert_sent(), Some(Alert::RECORD_OVERFLOW));
}
