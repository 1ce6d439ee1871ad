//! NDEF (NFC Data Exchange Format) messages and the NDEF file of the tag.
//!
//! Only what the tag needs is built here: a message of well-known records, most notably URI
//! records (NFC Forum URI Record Type Definition). The [`Reader`] parses any standard message,
//! so a served message can be checked the way a phone would decode it.

/// Application identifier of the NDEF Tag Application (mapping version 2.0).
pub const AID: [u8; 7] = [0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];

/// File identifier of the NDEF file.
pub const FILE_ID: [u8; 2] = [0xE1, 0x04];

/// URI served when nothing else is configured.
pub const DEFAULT_URI: &str = "https://www.google.co.jp/";

/// Message carrying [`DEFAULT_URI`].
pub const DEFAULT_MESSAGE: [u8; 18] = [
    0xD1, 0x01, 0x0E, 0x55, 0x02, b'g', b'o', b'o', b'g', b'l', b'e', b'.', b'c', b'o', b'.', b'j',
    b'p', b'/',
];

/// Record type of well-known URI records.
pub const RTD_URI: &[u8] = b"U";

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

/// Abbreviations of the URI Record Type Definition, indexed by their identifier code.
const URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unexpected end of the message at offset {0}")]
    UnexpectedEnd(usize),

    #[error("The first record does not have the MB flag")]
    MissingMessageBegin,

    #[error("Chunked records are not supported")]
    ChunkedRecord,

    #[error("The record is not a well-known URI record")]
    NotUri,

    #[error("Unknown URI identifier code: {0:#04X}")]
    UnknownUriPrefix(u8),

    #[error("The {0} of the record is {1} octets, more than its length field holds")]
    FieldTooLong(&'static str, usize),

    #[error("The URI is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Type Name Format of a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Tnf {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl From<u8> for Tnf {
    fn from(value: u8) -> Self {
        use Tnf::*;

        match value & TNF_MASK {
            0x00 => Empty,
            0x01 => WellKnown,
            0x02 => Media,
            0x03 => AbsoluteUri,
            0x04 => External,
            0x05 => Unknown,
            0x06 => Unchanged,
            _ => Reserved,
        }
    }
}

impl From<Tnf> for u8 {
    fn from(tnf: Tnf) -> Self {
        tnf as u8
    }
}

/// A record whose type, ID and payload fit in their length fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    tnf: Tnf,
    record_type: Vec<u8>,
    id: Vec<u8>,
    payload: Vec<u8>,
}

impl Record {
    pub fn new(tnf: Tnf, record_type: Vec<u8>, id: Vec<u8>, payload: Vec<u8>) -> Result<Self> {
        if record_type.len() > u8::MAX as usize {
            return Err(Error::FieldTooLong("type", record_type.len()));
        }
        if id.len() > u8::MAX as usize {
            return Err(Error::FieldTooLong("ID", id.len()));
        }
        if u32::try_from(payload.len()).is_err() {
            return Err(Error::FieldTooLong("payload", payload.len()));
        }

        Ok(Self {
            tnf,
            record_type,
            id,
            payload,
        })
    }

    /// Creates a well-known record without ID.
    pub fn well_known(record_type: &[u8], payload: Vec<u8>) -> Result<Self> {
        Self::new(Tnf::WellKnown, record_type.to_vec(), Vec::new(), payload)
    }

    /// Creates a URI record, abbreviating the longest known prefix of the URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let (code, prefix) = URI_PREFIXES
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, prefix)| uri.starts_with(*prefix))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(code, prefix)| (code as u8, prefix.len()))
            .unwrap_or((0x00, 0));

        let mut payload = Vec::with_capacity(1 + uri.len() - prefix);
        payload.push(code);
        payload.extend_from_slice(&uri.as_bytes()[prefix..]);

        Self::well_known(RTD_URI, payload)
    }

    /// Gives the record an ID.
    pub fn with_id(self, id: Vec<u8>) -> Result<Self> {
        Self::new(self.tnf, self.record_type, id, self.payload)
    }

    pub fn tnf(&self) -> Tnf {
        self.tnf
    }

    pub fn record_type(&self) -> &[u8] {
        &self.record_type
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Resolves the URI of a URI record, expanding its abbreviation.
    pub fn to_uri(&self) -> Result<String> {
        if self.tnf != Tnf::WellKnown || self.record_type != RTD_URI {
            return Err(Error::NotUri);
        }

        let (&code, suffix) = self.payload.split_first().ok_or(Error::UnexpectedEnd(0))?;
        let prefix = URI_PREFIXES
            .get(code as usize)
            .ok_or(Error::UnknownUriPrefix(code))?;

        Ok(format!("{}{}", prefix, String::from_utf8(suffix.to_vec())?))
    }

    /// Serialises the record. The position in the message decides MB and ME.
    fn write(&self, buf: &mut Vec<u8>, begin: bool, end: bool) {
        let short = self.payload.len() <= u8::MAX as usize;
        let mut header = u8::from(self.tnf);
        if begin {
            header |= FLAG_MB;
        }
        if end {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if !self.id.is_empty() {
            header |= FLAG_IL;
        }

        buf.push(header);
        // Lengths were checked against their fields when the record was built.
        buf.push(self.record_type.len() as u8);
        match short {
            true => buf.push(self.payload.len() as u8),
            _ => buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes()),
        }
        if !self.id.is_empty() {
            buf.push(self.id.len() as u8);
        }

        buf.extend_from_slice(&self.record_type);
        buf.extend_from_slice(&self.id);
        buf.extend_from_slice(&self.payload);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub records: Vec<Record>,
}

impl Message {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parses a message from the buffer, up to the record with the ME flag.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(buf);
        let mut records = Vec::new();

        loop {
            let (record, begin, end) = reader.read_record()?;
            if records.is_empty() && !begin {
                return Err(Error::MissingMessageBegin);
            }

            records.push(record);
            if end {
                break;
            }
        }

        Ok(Self { records })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let last = self.records.len().saturating_sub(1);

        for (i, record) in self.records.iter().enumerate() {
            record.write(&mut buf, i == 0, i == last);
        }

        buf
    }
}

impl From<Record> for Message {
    fn from(record: Record) -> Self {
        Self::new(vec![record])
    }
}

/// Builds the NDEF message holding a single URI record.
pub fn uri_message(uri: &str) -> Result<Vec<u8>> {
    Ok(Message::from(Record::from_uri(uri)?).to_bytes())
}

/// Stateful, simple NDEF record reader.
pub struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from the buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Reads data of specified size and seeks the cursor.
    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        let bytes = self
            .buffer
            .get(self.cursor..self.cursor + length)
            .ok_or(Error::UnexpectedEnd(self.cursor))?;

        self.cursor += length;
        Ok(bytes)
    }

    /// Reads a next octet and seeks the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<u8> {
        self.read(1).map(|bytes| bytes[0])
    }

    /// Reads a whole record, returning it with its MB and ME flags.
    pub fn read_record(&mut self) -> Result<(Record, bool, bool)> {
        let header = self.next()?;
        if header & FLAG_CF != 0 {
            return Err(Error::ChunkedRecord);
        }

        let type_length = self.next()? as usize;
        let payload_length = match header & FLAG_SR {
            0 => {
                let bytes = self.read(4)?;
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            _ => self.next()? as usize,
        };
        let id_length = match header & FLAG_IL {
            0 => 0,
            _ => self.next()? as usize,
        };

        let record = Record {
            tnf: Tnf::from(header),
            record_type: self.read(type_length)?.to_vec(),
            id: self.read(id_length)?.to_vec(),
            payload: self.read(payload_length)?.to_vec(),
        };

        Ok((record, header & FLAG_MB != 0, header & FLAG_ME != 0))
    }
}
