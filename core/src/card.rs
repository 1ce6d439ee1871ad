//! The emulated Type 4 Tag: file selection and the commands reading those files.

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::apdu::ins::Instruction;
use crate::apdu::{Command, Response, StatusWord};
use crate::cc::{self, CC_LEN};
use crate::ndef;
use crate::nfc::{ApduService, DeactivationReason};
use crate::Profile;

/// The file the reader has selected in the current session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Selection {
    #[default]
    None,

    /// The NDEF Tag Application itself.
    /// Reads in this state are answered the same way as with nothing selected.
    ApplicationSelected,

    CapabilityContainerSelected,

    /// The NDEF file was selected; the next read is answered with the length of the message.
    NdefLengthPending,

    /// The length was read; following reads are answered with the message itself.
    NdefFileSelected,
}

/// A card answering the commands of a Type 4 Tag reader for one session
pub struct Card {
    profile: Profile,
    selection: Selection,
}

impl Card {
    /// Initiates a card serving the profile, nothing selected.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            selection: Selection::None,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Answers the decoded command, updating the selection.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub fn handle(&mut self, command: &Command) -> Response {
        match Instruction::from(command.ins) {
            Instruction::SelectFile => self.select_file(command),
            Instruction::ReadBinary => self.read_binary(command),
            Instruction::Unknown(ins) => {
                debug!("Unsupported instruction: {:#04X}", ins);

                Response::status(StatusWord::FILE_NOT_FOUND)
            }
        }
    }

    /// Forgets the selection, as at the beginning of a session.
    pub fn reset(&mut self) {
        self.select(Selection::None);
    }

    fn select(&mut self, selection: Selection) {
        if self.selection != selection {
            debug!("Selection: {:?} -> {:?}", self.selection, selection);
        }

        self.selection = selection;
    }

    fn select_file(&mut self, command: &Command) -> Response {
        match command.payload.get(..2) {
            Some(id) if id == cc::FILE_ID => self.select(Selection::CapabilityContainerSelected),
            Some(id) if id == ndef::FILE_ID => self.select(Selection::NdefLengthPending),
            // Any other target, the application included, leaves the selection as it is.
            _ => {
                debug!("SELECT without effect: {}", hex::encode(&command.payload));
            }
        }

        Response::ok(Vec::new())
    }

    fn read_binary(&mut self, command: &Command) -> Response {
        match self.selection {
            Selection::CapabilityContainerSelected => {
                if command.offset() == 0 && command.le == Some(CC_LEN as u16) {
                    Response::ok(self.profile.cc_file().to_vec())
                } else {
                    debug!(
                        "CC file must be read at once (offset: {}, le: {:?})",
                        command.offset(),
                        command.le,
                    );

                    Response::status(StatusWord::FILE_NOT_FOUND)
                }
            }
            Selection::NdefLengthPending => {
                // A profile never holds a message NLEN cannot describe.
                let length = self.profile.ndef_message().len() as u16;
                self.select(Selection::NdefFileSelected);

                Response::ok(length.to_be_bytes().to_vec())
            }
            Selection::NdefFileSelected => Response::ok(self.profile.ndef_message().to_vec()),
            Selection::None | Selection::ApplicationSelected => Response::ok(Vec::new()),
        }
    }
}

impl Default for Card {
    fn default() -> Self {
        Self::new(Profile::default())
    }
}

impl<Ctx> ApduService<Ctx> for Card {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn process(&mut self, _: Ctx, command: &[u8]) -> Vec<u8> {
        debug!("C-APDU: {}", hex::encode(command));

        let response = match Command::from_bytes(command) {
            Ok(command) => self.handle(&command),
            Err(e) => {
                warn!("Rejecting the frame: {}", e);

                Response::status(StatusWord::FILE_NOT_FOUND)
            }
        };
        let response = response.into_bytes();

        debug!("R-APDU: {}", hex::encode(&response));

        response
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn deactivate(&mut self, _: Ctx, reason: DeactivationReason) {
        info!("Deactivated: {:?}", reason);

        self.reset();
    }
}
