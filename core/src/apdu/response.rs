use std::fmt::{Display, Formatter};

use crate::apdu::Error;

/// SW1-SW2 trailer of a response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusWord(pub u8, pub u8);

impl StatusWord {
    /// Normal processing.
    pub const SUCCESS: Self = Self(0x90, 0x00);

    /// File or application not found.
    /// Every rejection of the tag is reported with this status.
    pub const FILE_NOT_FOUND: Self = Self(0x6A, 0x82);

    pub fn is_ok(&self) -> bool {
        *self == Self::SUCCESS
    }
}

impl Display for StatusWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}{:02X}", self.0, self.1)
    }
}

impl From<StatusWord> for Error {
    fn from(StatusWord(sw1, sw2): StatusWord) -> Self {
        Error::Status(sw1, sw2)
    }
}

/// A response to be sent back to the reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    trailer: StatusWord,
}

impl Response {
    /// Creates a response with the payload, completed successfully.
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            payload,
            trailer: StatusWord::SUCCESS,
        }
    }

    /// Creates a response carrying only the status.
    pub fn status(trailer: StatusWord) -> Self {
        Self {
            payload: Vec::new(),
            trailer,
        }
    }

    /// Parses a response from the octets.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Self {
        let sw2 = bytes.pop();
        let sw1 = bytes.pop();

        Self {
            payload: bytes,
            trailer: match (sw1, sw2) {
                (Some(a), Some(b)) => StatusWord(a, b),
                _ => StatusWord(0x00, 0x00),
            },
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn trailer(&self) -> StatusWord {
        self.trailer
    }

    /// Determines whether the response indicates success or not.
    pub fn is_ok(&self) -> bool {
        self.trailer.is_ok()
    }

    /// Converts the response to a result of octets.
    pub fn into_result(self) -> Result<Vec<u8>, Error> {
        let Self { payload, trailer } = self;

        match trailer.is_ok() {
            true => Ok(payload),
            _ => Err(trailer.into()),
        }
    }

    /// Converts the response into octets, the status word last.
    pub fn into_bytes(self) -> Vec<u8> {
        let Self {
            mut payload,
            trailer: StatusWord(sw1, sw2),
        } = self;

        payload.extend_from_slice(&[sw1, sw2]);
        payload
    }
}

impl From<Vec<u8>> for Response {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Response> for Vec<u8> {
    fn from(response: Response) -> Self {
        response.into_bytes()
    }
}
