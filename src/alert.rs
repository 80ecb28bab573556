use std::fmt;

/// An alert description sent to the peer before a fatal error surfaces.
///
/// Only the descriptions the record layer itself triggers are named here.
/// Ciphers may hand back any other value through [`Alert::from_u8`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alert(u8);

impl Alert {
    pub const UNEXPECTED_MESSAGE: Alert = Alert(10);
    pub const BAD_RECORD_MAC: Alert = Alert(20);
    pub const RECORD_OVERFLOW: Alert = Alert(22);
    pub const ILLEGAL_PARAMETER: Alert = Alert(47);
    pub const PROTOCOL_VERSION: Alert = Alert(70);
    pub const INTERNAL_ERROR: Alert = Alert(80);

    /// Alert level for fatal alerts.
    pub const LEVEL_FATAL: u8 = 2;

    pub const fn from_u8(value: u8) -> Self {
        Alert(value)
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// The two byte body of a fatal alert record.
    pub fn to_record_body(self) -> [u8; 2] {
        [Self::LEVEL_FATAL, self.0]
    }
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Alert::UNEXPECTED_MESSAGE => "unexpected_message",
            Alert::BAD_RECORD_MAC => "bad_record_mac",
            Alert::RECORD_OVERFLOW => "record_overflow",
            Alert::ILLEGAL_PARAMETER => "illegal_parameter",
            Alert::PROTOCOL_VERSION => "protocol_version",
            Alert::INTERNAL_ERROR => "internal_error",
            _ => return write!(f, "Alert({})", self.0),
        };
        f.write_str(name)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
