//! A crate to emulate an NFC Forum Type 4 Tag by answering APDU commands from a reader.
//!
//! The emulated [`Card`] holds the file selection of one session. A transport feeds it raw
//! command frames through [`nfc::ApduService`] and sends back whatever bytes it answers.
//!
//! ```rust
//! use ndef_hce::nfc::ApduService;
//! use ndef_hce::Card;
//!
//! let mut card = Card::default();
//!
//! assert_eq!(vec![0x90, 0x00], card.process((), &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x04]));
//! assert_eq!(vec![0x00, 0x12, 0x90, 0x00], card.process((), &[0x00, 0xB0, 0x00, 0x00, 0x02]));
//! ```

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($t: tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($t: tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($t: tt)*) => {};
}

pub mod apdu;
pub mod card;
pub mod cc;
pub mod ndef;
pub mod nfc;
pub mod profile;
pub mod reader;

pub use card::{Card, Selection};
pub use profile::Profile;
