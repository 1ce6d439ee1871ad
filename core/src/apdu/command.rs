use crate::apdu::{ins, Error, Result, CLA_DEFAULT};

const HEADER_LEN: usize = 4;

/// Ne is 256 when Le is encoded as `0x00` in the short form.
const SHORT_LE_MAX: u16 = 0x100;

/// An APDU command received from the reader
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub payload: Vec<u8>,
    pub le: Option<u16>,
}

impl Command {
    /// Constructs an command with CLA, INS, P1, and P2.
    /// No payloads will be transmitted or received.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            ..Default::default()
        }
    }

    /// Constructs an command with CLA, INS, P1, P2, and Le.
    pub fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u16) -> Self {
        Self {
            le: Some(le),
            ..Self::new(cla, ins, p1, p2)
        }
    }

    /// Constructs an command with CLA, INS, P1, P2, and a payload.
    pub fn new_with_payload(cla: u8, ins: u8, p1: u8, p2: u8, payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::new(cla, ins, p1, p2)
        }
    }

    /// Constructs a `SELECT FILE` command.
    pub fn select_file(p1: u8, p2: u8, payload: Vec<u8>) -> Self {
        Self::new_with_payload(CLA_DEFAULT, ins::SELECT_FILE, p1, p2, payload)
    }

    /// Constructs a `READ BINARY` command reading `le` octets from `offset`.
    pub fn read_binary(offset: u16, le: u16) -> Self {
        let [p1, p2] = offset.to_be_bytes();

        Self::new_with_le(CLA_DEFAULT, ins::READ_BINARY, p1, p2, le)
    }

    /// The offset of `READ BINARY`, carried by P1 and P2.
    pub fn offset(&self) -> u16 {
        u16::from_be_bytes([self.p1, self.p2])
    }

    /// Decodes a short APDU from the octets.
    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        if frame.len() < HEADER_LEN {
            return Err(Error::MalformedFrame(frame.len()));
        }

        let (header, body) = frame.split_at(HEADER_LEN);
        let mut command = Self::new(header[0], header[1], header[2], header[3]);

        match body {
            // Case 1: header only
            [] => {}

            // Case 2: Le only
            [le] => command.le = Some(decode_le(*le)),

            // Lc of zero introduces the three-octet form
            [0x00, ..] => return Err(Error::UnsupportedExtendedLength),

            // Case 3: Lc and data
            [lc, data @ ..] if data.len() == *lc as usize => {
                command.payload = data.to_vec();
            }

            // Case 4: Lc, data and Le
            [lc, data @ .., le] if data.len() == *lc as usize => {
                command.payload = data.to_vec();
                command.le = Some(decode_le(*le));
            }

            _ => return Err(Error::MalformedFrame(frame.len())),
        }

        Ok(command)
    }

    /// Converts the command into octets of a short APDU.
    /// Payloads longer than 255 octets and Le above 256 would need the extended form.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let Self {
            cla,
            ins,
            p1,
            p2,
            mut payload,
            le,
        } = self;

        let mut buffer: Vec<u8> = vec![cla, ins, p1, p2];
        if !payload.is_empty() {
            let lc = u8::try_from(payload.len()).map_err(|_| Error::UnsupportedExtendedLength)?;
            buffer.push(lc);
            buffer.append(&mut payload);
        }

        if let Some(l) = le {
            buffer.push(match l {
                0 => return Err(Error::InvalidLe(l)),
                SHORT_LE_MAX => 0x00,
                _ => u8::try_from(l).map_err(|_| Error::UnsupportedExtendedLength)?,
            });
        }

        Ok(buffer)
    }
}

impl TryFrom<&[u8]> for Command {
    type Error = Error;

    fn try_from(frame: &[u8]) -> Result<Self> {
        Self::from_bytes(frame)
    }
}

impl TryFrom<Command> for Vec<u8> {
    type Error = Error;

    fn try_from(command: Command) -> Result<Self> {
        command.into_bytes()
    }
}

fn decode_le(le: u8) -> u16 {
    match le {
        0x00 => SHORT_LE_MAX,
        _ => le as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only() {
        let command = Command::from_bytes(&[0x00, 0x12, 0x00, 0x80]).unwrap();

        assert_eq!(Command::new(0x00, 0x12, 0x00, 0x80), command);
        assert!(command.payload.is_empty());
        assert_eq!(None, command.le);
    }

    #[test]
    fn test_le_only() {
        let command = Command::from_bytes(&[0x00, 0xB0, 0x00, 0x00, 0x0F]).unwrap();

        assert_eq!(0xB0, command.ins);
        assert_eq!(0, command.offset());
        assert!(command.payload.is_empty());
        assert_eq!(Some(15), command.le);
    }

    #[test]
    fn test_le_zero_means_256() {
        let command = Command::from_bytes(&[0x00, 0xB0, 0x00, 0x00, 0x00]).unwrap();

        assert_eq!(Some(256), command.le);
    }

    #[test]
    fn test_data_only() {
        let command = Command::from_bytes(&[0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x04]).unwrap();

        assert_eq!(0xA4, command.ins);
        assert_eq!(0x0C, command.p2);
        assert_eq!(vec![0xE1, 0x04], command.payload);
        assert_eq!(None, command.le);
    }

    #[test]
    fn test_data_and_le() {
        let frame = [
            0x00, 0xA4, 0x04, 0x00, 0x07, 0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01, 0x00,
        ];
        let command = Command::from_bytes(&frame).unwrap();

        assert_eq!(0x04, command.p1);
        assert_eq!(
            vec![0xD2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01],
            command.payload
        );
        assert_eq!(Some(256), command.le);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            Err(Error::MalformedFrame(3)),
            Command::from_bytes(&[0x00, 0xA4, 0x00])
        );
        assert_eq!(Err(Error::MalformedFrame(0)), Command::from_bytes(&[]));
    }

    #[test]
    fn test_lc_mismatch() {
        assert_eq!(
            Err(Error::MalformedFrame(7)),
            Command::from_bytes(&[0x00, 0xA4, 0x00, 0x0C, 0x05, 0xE1, 0x04])
        );
        assert_eq!(
            Err(Error::MalformedFrame(9)),
            Command::from_bytes(&[0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x04, 0x00, 0x00])
        );
    }

    #[test]
    fn test_extended_length() {
        assert_eq!(
            Err(Error::UnsupportedExtendedLength),
            Command::from_bytes(&[0x00, 0xB0, 0x00, 0x00, 0x00, 0x01, 0x00])
        );
        assert_eq!(
            Err(Error::UnsupportedExtendedLength),
            Command::from_bytes(&[0x00, 0xA4, 0x00, 0x0C, 0x00, 0x00, 0x02, 0xE1, 0x04])
        );
    }

    #[test]
    fn test_into_bytes() {
        assert_eq!(
            vec![0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x03],
            Command::select_file(0x00, 0x0C, vec![0xE1, 0x03])
                .into_bytes()
                .unwrap()
        );
        assert_eq!(
            vec![0x00, 0xB0, 0x01, 0x02, 0x00],
            Vec::try_from(Command::read_binary(0x0102, 256)).unwrap()
        );
        assert_eq!(
            vec![0x00, 0xB0, 0x00, 0x00, 0xFF],
            Command::read_binary(0, 255).into_bytes().unwrap()
        );
    }

    #[test]
    fn test_into_bytes_beyond_short_form() {
        let payload = vec![0xAB; 255];
        let frame = Command::select_file(0x04, 0x00, payload.clone())
            .into_bytes()
            .unwrap();
        assert_eq!(0xFF, frame[4]);
        assert_eq!(payload, Command::from_bytes(&frame).unwrap().payload);

        assert_eq!(
            Err(Error::UnsupportedExtendedLength),
            Command::select_file(0x04, 0x00, vec![0xAB; 256]).into_bytes()
        );
        assert_eq!(
            Err(Error::UnsupportedExtendedLength),
            Command::read_binary(0, 257).into_bytes()
        );
        assert_eq!(
            Err(Error::InvalidLe(0)),
            Command::read_binary(0, 0).into_bytes()
        );
    }
}
