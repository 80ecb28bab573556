mod common;
mod dtls13;
mod handshake;
