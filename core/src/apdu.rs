//! ISO/IEC 7816-4 short APDUs, as seen from the card side.

mod command;
mod response;

pub mod ins;

pub use command::Command;
pub use response::{Response, StatusWord};

pub const CLA_DEFAULT: u8 = 0x00;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("The frame is too short or its length does not match Lc ({0} octets)")]
    MalformedFrame(usize),

    #[error("Extended length APDUs are not supported")]
    UnsupportedExtendedLength,

    #[error("Le of a short APDU is 1 to 256, got {0}")]
    InvalidLe(u16),

    #[error("The card returned an error ({0:#04X}, {1:#04X})")]
    Status(u8, u8),
}

pub type Result<T> = std::result::Result<T, Error>;
