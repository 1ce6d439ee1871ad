//! A reader performing the NDEF detection procedure of a Type 4 Tag.
//! Used to exercise any [`ApduService`] the way a phone would, without a radio link.

use std::marker::PhantomData;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::apdu::{self, Command, Response, CLA_DEFAULT};
use crate::cc::{self, CapabilityContainer, CC_LEN};
use crate::ndef;
use crate::nfc::ApduService;

const SELECT_P1_DF_NAME: u8 = 0x04;
const SELECT_P1_EF: u8 = 0x00;
const SELECT_P2_FIRST: u8 = 0x00;
const SELECT_P2_NO_FCI: u8 = 0x0C;

const NLEN_LEN: u16 = 2;

/// Largest Le of a short APDU.
const SHORT_LE_MAX: u16 = 0x100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The card returned an error: {0}")]
    Apdu(#[from] apdu::Error),

    #[error("Invalid Capability Container: {0}")]
    CapabilityContainer(#[from] cc::Error),

    #[error("Invalid NDEF message: {0}")]
    Ndef(#[from] ndef::Error),

    #[error("The NDEF file is not readable (access condition {0:#04X})")]
    ReadAccessDenied(u8),

    #[error("Expected {expected} octets from the card, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A command and the response to it, as exchanged on the link.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Exchange {
    pub command: Vec<u8>,
    pub response: Vec<u8>,
}

/// An adapter to read the tag served by the service
pub struct Reader<'a, S, Ctx>
where
    S: ApduService<Ctx>,
    Ctx: Copy,
{
    service: &'a mut S,
    transcript: Vec<Exchange>,
    _ctx: PhantomData<Ctx>,
}

impl<'a, S, Ctx> Reader<'a, S, Ctx>
where
    S: ApduService<Ctx>,
    Ctx: Copy,
{
    /// Initiates a reader talking to the service.
    pub fn new(service: &'a mut S) -> Self {
        Self {
            service,
            transcript: Vec::new(),
            _ctx: PhantomData,
        }
    }

    /// Everything exchanged so far.
    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Exchange> {
        self.transcript
    }

    /// Selects the NDEF Tag Application by its name.
    pub fn select_application(&mut self, ctx: Ctx) -> Result<()> {
        let command = Command {
            le: Some(0x100),
            ..Command::select_file(SELECT_P1_DF_NAME, SELECT_P2_FIRST, ndef::AID.into())
        };

        self.transmit(ctx, command).map(|_| ())
    }

    /// Selects an EF with their identifier.
    pub fn select_file(&mut self, ctx: Ctx, id: [u8; 2]) -> Result<()> {
        self.transmit(
            ctx,
            Command::select_file(SELECT_P1_EF, SELECT_P2_NO_FCI, id.into()),
        )
        .map(|_| ())
    }

    /// Reads binary from the selected file.
    pub fn read_binary(&mut self, ctx: Ctx, offset: u16, le: u16) -> Result<Vec<u8>> {
        self.transmit(ctx, Command::read_binary(offset, le))
    }

    /// Selects then reads the CC file.
    pub fn read_capability_container(&mut self, ctx: Ctx) -> Result<CapabilityContainer> {
        self.select_file(ctx, cc::FILE_ID)?;

        let bytes = self.read_binary(ctx, 0, CC_LEN as u16)?;

        Ok(CapabilityContainer::try_from(bytes.as_slice())?)
    }

    /// Runs the NDEF detection procedure, then reads the message out of the NDEF file.
    pub fn read_ndef(&mut self, ctx: Ctx) -> Result<Vec<u8>> {
        self.select_application(ctx)?;

        let cc = self.read_capability_container(ctx)?;
        if cc.ndef_file.read_access != cc::ACCESS_GRANTED {
            return Err(Error::ReadAccessDenied(cc.ndef_file.read_access));
        }

        self.select_file(ctx, cc.ndef_file.file_id)?;

        let nlen = self.read_binary(ctx, 0, NLEN_LEN)?;
        let length = match nlen.as_slice() {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            _ => {
                return Err(Error::LengthMismatch {
                    expected: NLEN_LEN as usize,
                    actual: nlen.len(),
                })
            }
        };

        debug!("NDEF message is {} octets", length);

        if length == 0 {
            return Ok(Vec::new());
        }

        // The card answers the whole message to a single read, even beyond Le.
        let message = self.read_binary(ctx, NLEN_LEN, length.min(SHORT_LE_MAX))?;
        if message.len() != length as usize {
            return Err(Error::LengthMismatch {
                expected: length as usize,
                actual: message.len(),
            });
        }

        Ok(message)
    }

    /// Reads and parses the NDEF message.
    pub fn read_message(&mut self, ctx: Ctx) -> Result<ndef::Message> {
        let message = self.read_ndef(ctx)?;

        Ok(ndef::Message::parse(&message)?)
    }

    fn transmit(&mut self, ctx: Ctx, command: Command) -> Result<Vec<u8>> {
        let command = command.into_bytes()?;
        let response = self.service.process(ctx, &command);

        self.transcript.push(Exchange {
            command,
            response: response.clone(),
        });

        Ok(Response::from_bytes(response).into_result()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfc::DeactivationReason;
    use crate::Card;

    /// A card refusing to let anything be read.
    struct Locked;

    impl ApduService<()> for Locked {
        fn process(&mut self, _: (), _: &[u8]) -> Vec<u8> {
            vec![0x69, 0x82]
        }

        fn deactivate(&mut self, _: (), _: DeactivationReason) {}
    }

    #[test]
    fn test_read_capability_container() {
        let mut card = Card::default();
        let mut reader = Reader::new(&mut card);

        assert_eq!(
            CapabilityContainer::DEFAULT,
            reader.read_capability_container(()).unwrap()
        );
        assert_eq!(2, reader.transcript().len());
    }

    #[test]
    fn test_read_ndef() {
        let mut card = Card::default();
        let mut reader = Reader::new(&mut card);

        assert_eq!(ndef::DEFAULT_MESSAGE.to_vec(), reader.read_ndef(()).unwrap());

        let transcript = reader.into_transcript();
        assert_eq!(6, transcript.len());
        assert_eq!(
            vec![0x00, 0xA4, 0x04, 0x00, 0x07, 0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01, 0x00],
            transcript[0].command
        );
        assert_eq!(vec![0x00, 0x12, 0x90, 0x00], transcript[4].response);
        assert_eq!(vec![0x00, 0xB0, 0x00, 0x02, 0x12], transcript[5].command);
    }

    #[test]
    fn test_read_long_ndef() {
        let uri = format!("https://example.com/{}", "a".repeat(300));
        let mut card = Card::new(crate::Profile::default().with_uri(uri.as_str()).unwrap());
        let mut reader = Reader::new(&mut card);

        let message = reader.read_message(()).unwrap();
        assert_eq!(uri, message.records[0].to_uri().unwrap());

        // Le of 256 asks for as much as a short APDU can
        let transcript = reader.into_transcript();
        assert_eq!(vec![0x00, 0xB0, 0x00, 0x02, 0x00], transcript[5].command);
        assert_eq!(vec![0x01, 0x40, 0x90, 0x00], transcript[4].response);
    }

    #[test]
    fn test_unencodable_command() {
        let mut card = Card::default();
        let mut reader = Reader::new(&mut card);

        assert!(matches!(
            reader.read_binary((), 0, 0x1000),
            Err(Error::Apdu(apdu::Error::UnsupportedExtendedLength))
        ));
        assert!(reader.transcript().is_empty());
    }

    #[test]
    fn test_error_status() {
        let mut locked = Locked;
        let mut reader = Reader::new(&mut locked);

        assert!(matches!(
            reader.read_ndef(()),
            Err(Error::Apdu(apdu::Error::Status(0x69, 0x82)))
        ));
    }

    #[test]
    fn test_cc_without_selection_is_empty() {
        let mut card = Card::default();
        let mut reader = Reader::new(&mut card);

        assert_eq!(Vec::<u8>::new(), reader.read_binary((), 0, 15).unwrap());
    }
}
