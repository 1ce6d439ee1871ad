//! Instruction codes understood by the emulated tag.

pub const SELECT_FILE: u8 = 0xA4;
pub const READ_BINARY: u8 = 0xB0;

/// The closed set of instructions the tag answers.
/// Anything else is rejected uniformly by the card.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    SelectFile,
    ReadBinary,
    Unknown(u8),
}

impl From<u8> for Instruction {
    fn from(ins: u8) -> Self {
        match ins {
            SELECT_FILE => Instruction::SelectFile,
            READ_BINARY => Instruction::ReadBinary,
            _ => Instruction::Unknown(ins),
        }
    }
}
