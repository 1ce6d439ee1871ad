//! What the emulated tag serves.

use crate::cc::{CapabilityContainer, CC_LEN};
use crate::ndef;

/// NLEN field preceding the message in the NDEF file.
const NLEN_LEN: usize = 2;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("The NDEF message is {0} octets, NLEN cannot describe more than 65533")]
    MessageTooLong(usize),

    #[error("The NDEF file must be E104, got {:02X}{:02X}", .0[0], .0[1])]
    UnsupportedFileId([u8; 2]),

    #[error(transparent)]
    Ndef(#[from] ndef::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Contents of the emulated tag: the URI it carries and its Capability Container.
///
/// A profile always describes itself consistently: the NDEF file fits in its NLEN field and the
/// CC announces at least its size.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "ProfileConfig", into = "ProfileConfig")
)]
pub struct Profile {
    uri: String,
    capability_container: CapabilityContainer,
    message: Vec<u8>,
}

/// A profile as written in a configuration file, before it is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProfileConfig {
    pub uri: String,
    pub capability_container: CapabilityContainer,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            uri: ndef::DEFAULT_URI.to_owned(),
            capability_container: CapabilityContainer::DEFAULT,
        }
    }
}

impl TryFrom<ProfileConfig> for Profile {
    type Error = Error;

    fn try_from(config: ProfileConfig) -> Result<Self> {
        let file_id = config.capability_container.ndef_file.file_id;
        if file_id != ndef::FILE_ID {
            return Err(Error::UnsupportedFileId(file_id));
        }

        Self {
            capability_container: config.capability_container,
            ..Default::default()
        }
        .with_uri(config.uri)
    }
}

impl From<Profile> for ProfileConfig {
    fn from(profile: Profile) -> Self {
        Self {
            uri: profile.uri,
            capability_container: profile.capability_container,
        }
    }
}

impl Profile {
    /// Serves another URI.
    /// The maximum NDEF size in the CC grows when the message would not fit otherwise.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let message = ndef::uri_message(&uri)?;
        let required = u16::try_from(message.len() + NLEN_LEN)
            .map_err(|_| Error::MessageTooLong(message.len()))?;

        let max_size = &mut self.capability_container.ndef_file.max_size;
        if *max_size < required {
            *max_size = required;
        }

        self.uri = uri;
        self.message = message;
        Ok(self)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn capability_container(&self) -> &CapabilityContainer {
        &self.capability_container
    }

    /// Contents of the CC file.
    pub fn cc_file(&self) -> [u8; CC_LEN] {
        self.capability_container.to_bytes()
    }

    /// The NDEF message, at most 65533 octets so that NLEN can describe it.
    pub fn ndef_message(&self) -> &[u8] {
        &self.message
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            uri: ndef::DEFAULT_URI.to_owned(),
            capability_container: CapabilityContainer::DEFAULT,
            message: ndef::DEFAULT_MESSAGE.to_vec(),
        }
    }
}
