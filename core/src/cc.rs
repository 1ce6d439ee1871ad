//! Capability Container (CC) file of the NDEF Tag Application.
//!
//! The CC file describes the size limits of the tag and where the NDEF file lives.
//! Mapping version 2.0 layout, 15 octets in total:
//!
//! | Offset | Size | Field                              |
//! |--------|------|------------------------------------|
//! | 0      | 2    | CCLEN                              |
//! | 2      | 1    | Mapping version                    |
//! | 3      | 2    | MLe (max R-APDU data size)         |
//! | 5      | 2    | MLc (max C-APDU data size)         |
//! | 7      | 8    | NDEF File Control TLV (T=04, L=06) |

/// File identifier of the CC file.
pub const FILE_ID: [u8; 2] = [0xE1, 0x03];

pub const CC_LEN: usize = 15;

const MAPPING_VERSION_2_0: u8 = 0x20;
const NDEF_FILE_CONTROL_TAG: u8 = 0x04;
const NDEF_FILE_CONTROL_LEN: u8 = 0x06;

/// Read or write access without any security.
pub const ACCESS_GRANTED: u8 = 0x00;

/// No access granted at all.
pub const ACCESS_DENIED: u8 = 0xFF;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("CC file must be 15 octets at least, got {0}")]
    TooShort(usize),

    #[error("Unsupported mapping version: {0:#04X}")]
    UnsupportedVersion(u8),

    #[error("NDEF File Control TLV not found")]
    MissingNdefFileControl,
}

/// NDEF File Control TLV: where the NDEF file is and how it can be accessed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NdefFileControl {
    pub file_id: [u8; 2],
    pub max_size: u16,
    pub read_access: u8,
    pub write_access: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CapabilityContainer {
    pub mapping_version: u8,
    pub max_r_apdu: u16,
    pub max_c_apdu: u16,
    pub ndef_file: NdefFileControl,
}

impl CapabilityContainer {
    /// The read-only tag served by default.
    pub const DEFAULT: Self = Self {
        mapping_version: MAPPING_VERSION_2_0,
        max_r_apdu: 0x003B,
        max_c_apdu: 0x0034,
        ndef_file: NdefFileControl {
            file_id: crate::ndef::FILE_ID,
            max_size: 0x0032,
            read_access: ACCESS_GRANTED,
            write_access: ACCESS_DENIED,
        },
    };

    /// Serialises the CC file. CCLEN counts the whole structure including itself.
    pub fn to_bytes(&self) -> [u8; CC_LEN] {
        let [cclen_hi, cclen_lo] = (CC_LEN as u16).to_be_bytes();
        let [mle_hi, mle_lo] = self.max_r_apdu.to_be_bytes();
        let [mlc_hi, mlc_lo] = self.max_c_apdu.to_be_bytes();
        let [id_hi, id_lo] = self.ndef_file.file_id;
        let [size_hi, size_lo] = self.ndef_file.max_size.to_be_bytes();

        [
            cclen_hi,
            cclen_lo,
            self.mapping_version,
            mle_hi,
            mle_lo,
            mlc_hi,
            mlc_lo,
            NDEF_FILE_CONTROL_TAG,
            NDEF_FILE_CONTROL_LEN,
            id_hi,
            id_lo,
            size_hi,
            size_lo,
            self.ndef_file.read_access,
            self.ndef_file.write_access,
        ]
    }
}

impl Default for CapabilityContainer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<&[u8]> for CapabilityContainer {
    type Error = Error;

    fn try_from(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < CC_LEN {
            return Err(Error::TooShort(buf.len()));
        }

        // Only the major version is significant for compatibility.
        let mapping_version = buf[2];
        if mapping_version >> 4 != MAPPING_VERSION_2_0 >> 4 {
            return Err(Error::UnsupportedVersion(mapping_version));
        }

        if buf[7] != NDEF_FILE_CONTROL_TAG || buf[8] != NDEF_FILE_CONTROL_LEN {
            return Err(Error::MissingNdefFileControl);
        }

        Ok(Self {
            mapping_version,
            max_r_apdu: u16::from_be_bytes([buf[3], buf[4]]),
            max_c_apdu: u16::from_be_bytes([buf[5], buf[6]]),
            ndef_file: NdefFileControl {
                file_id: [buf[9], buf[10]],
                max_size: u16::from_be_bytes([buf[11], buf[12]]),
                read_access: buf[13],
                write_access: buf[14],
            },
        })
    }
}
