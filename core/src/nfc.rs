//! Communicating with the reader using NFC technology.
//!
//! The transport owns the radio link. It hands every command frame to an [`ApduService`] and
//! sends back the returned octets, then tells the service when the link is gone.

/// A service answering APDU commands on behalf of an emulated card.
///
/// `Ctx` is whatever the transport wants to pass along with each frame; implementations are
/// free to ignore it.
pub trait ApduService<Ctx> {
    /// Handles the raw APDU command.
    /// Implementations must always return a response ending with a status word.
    fn process(&mut self, ctx: Ctx, command: &[u8]) -> Vec<u8>;

    /// Called when the reader went away or selected another application.
    fn deactivate(&mut self, ctx: Ctx, reason: DeactivationReason);
}

/// Why the transport deactivated the service.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DeactivationReason {
    /// The NFC link was lost.
    LinkLoss,

    /// The reader selected another application.
    Deselected,

    Other(i32),
}

impl From<i32> for DeactivationReason {
    fn from(code: i32) -> Self {
        match code {
            0 => DeactivationReason::LinkLoss,
            1 => DeactivationReason::Deselected,
            _ => DeactivationReason::Other(code),
        }
    }
}

impl From<DeactivationReason> for i32 {
    fn from(reason: DeactivationReason) -> Self {
        match reason {
            DeactivationReason::LinkLoss => 0,
            DeactivationReason::Deselected => 1,
            DeactivationReason::Other(code) => code,
        }
    }
}
