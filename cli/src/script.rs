//! APDU scripts: one hex-encoded command per line.
//!
//! ```text
//! # select the CC file, then read it
//! 00 A4 00 0C 02 E1 03
//! 00:B0:00:00:0F
//! deactivate 0
//! ```

use ndef_hce::nfc::DeactivationReason;

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Frame(Vec<u8>),
    Deactivate(DeactivationReason),
    Empty,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid hex on line {0}: {1}")]
    Hex(usize, hex::FromHexError),

    #[error("Invalid deactivation reason on line {0}: {1}")]
    Reason(usize, String),
}

const DEACTIVATE: &str = "deactivate";

/// Parses a line of the script. `number` is only used to report errors.
pub fn parse_line(number: usize, line: &str) -> Result<Line, Error> {
    let line = match line.split_once('#') {
        Some((content, _)) => content,
        None => line,
    }
    .trim();

    if line.is_empty() {
        return Ok(Line::Empty);
    }

    if let Some(reason) = line.strip_prefix(DEACTIVATE) {
        let reason = reason.trim();

        return match reason {
            "" => Ok(Line::Deactivate(DeactivationReason::LinkLoss)),
            _ => reason
                .parse::<i32>()
                .map(|code| Line::Deactivate(code.into()))
                .map_err(|_| Error::Reason(number, reason.to_owned())),
        };
    }

    let digits: String = line
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    hex::decode(digits)
        .map(Line::Frame)
        .map_err(|e| Error::Hex(number, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame() {
        assert_eq!(
            Ok(Line::Frame(vec![0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x03])),
            parse_line(1, "00 A4 00 0C 02 E1 03")
        );
        assert_eq!(
            Ok(Line::Frame(vec![0x00, 0xB0, 0x00, 0x00, 0x0F])),
            parse_line(1, "00:B0:00:00:0F  # read CC")
        );
        assert_eq!(
            Ok(Line::Frame(vec![0x00, 0xB0, 0x00, 0x00, 0x0F])),
            parse_line(1, "00b000000f")
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(Ok(Line::Empty), parse_line(1, ""));
        assert_eq!(Ok(Line::Empty), parse_line(1, "   # just a comment"));
    }

    #[test]
    fn test_deactivate() {
        assert_eq!(
            Ok(Line::Deactivate(DeactivationReason::LinkLoss)),
            parse_line(1, "deactivate")
        );
        assert_eq!(
            Ok(Line::Deactivate(DeactivationReason::Deselected)),
            parse_line(1, "deactivate 1")
        );
        assert_eq!(
            Err(Error::Reason(3, "soon".to_owned())),
            parse_line(3, "deactivate soon")
        );
    }

    #[test]
    fn test_invalid_hex() {
        assert_eq!(
            Err(Error::Hex(2, hex::FromHexError::OddLength)),
            parse_line(2, "00 A4 0")
        );
    }
}
