//! DTLS record layer for test peers.
//!
//! This crate frames, protects and fragments DTLS traffic the way a real
//! record layer does, with one important difference: it is meant to sit
//! opposite an implementation under test. Every framing violation it sees is
//! fatal, and a set of fault-injection toggles ([`Bugs`]) lets a test driver
//! produce adversarial framing on demand.
//!
//! Both record header formats are supported:
//!
//! * the legacy 13 byte header used by DTLS 1.0/1.2 and by DTLS 1.3
//!   plaintext records,
//! * the compact DTLS 1.3 unified header, including record number masking.
//!
//! The handshake state machine, key schedule and transport live outside this
//! crate and plug in through the [`Transport`], [`RecordCipher`] and
//! [`RecordNumberEncrypter`] traits.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dtls_record::{Config, Conn, MemoryTransport};
//!
//! let config = Arc::new(Config::default());
//! let (a, b) = MemoryTransport::pair();
//!
//! let mut client = Conn::new(Arc::clone(&config), a);
//! let mut server = Conn::new(config, b);
//!
//! // ClientHello with an empty body
//! client.write_handshake(&[1, 0, 0, 0]).unwrap();
//! client.flush_handshake().unwrap();
//!
//! let msg = server.read_handshake().unwrap();
//! assert_eq!(&msg[..], &[1, 0, 0, 0]);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

#[macro_use]
extern crate log;

mod alert;
pub use alert::Alert;

mod buffer;
pub use buffer::Buf;

mod config;
pub use config::{Bugs, Config, ConfigBuilder};

mod conn;
pub use conn::Conn;

pub mod crypto;
pub use crypto::{NullCipher, RecordCipher};

mod error;
pub use error::Error;

mod fragment;
pub use fragment::{FragmentPacker, Reassembler};

mod half;
pub use half::HalfConn;

mod header;
pub use header::DecodedHeader;

mod mask;
pub use mask::RecordNumberEncrypter;

pub mod message;

mod packet;

mod rng;

mod seq;
pub use seq::SequenceTracker;

mod transport;
pub use transport::{MemoryTransport, Transport};

mod util;

/// Largest record payload accepted off the wire (2^14 plus expansion).
pub const MAX_CIPHERTEXT: usize = 16384 + 2048;

/// Longest record header we can produce or parse.
pub const MAX_RECORD_HEADER_LEN: usize = 13;

/// Default limit on the body size of a single handshake fragment.
pub const DEFAULT_MAX_FRAGMENT_LEN: usize = 1024;

/// Default limit on a reassembled handshake message.
pub const DEFAULT_MAX_HANDSHAKE_LEN: usize = 65536;
