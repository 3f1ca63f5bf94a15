//! Board identification.

use std::fmt;

/// USB board identifier reported during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardId {
    /// Jawbreaker prototype.
    Jawbreaker,
    /// HackRF One.
    HackRfOne,
    /// rad1o badge.
    Rad1o,
    /// Board reported an invalid identifier.
    Invalid,
    /// Identifier not known to this crate.
    Unknown(u16),
}

impl BoardId {
    /// Decode a USB product identifier.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x604B => BoardId::Jawbreaker,
            0x6089 => BoardId::HackRfOne,
            0xCC15 => BoardId::Rad1o,
            0xFFFF => BoardId::Invalid,
            other => BoardId::Unknown(other),
        }
    }

    /// Raw USB product identifier.
    pub fn raw(self) -> u16 {
        match self {
            BoardId::Jawbreaker => 0x604B,
            BoardId::HackRfOne => 0x6089,
            BoardId::Rad1o => 0xCC15,
            BoardId::Invalid => 0xFFFF,
            BoardId::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardId::Jawbreaker => write!(f, "Jawbreaker"),
            BoardId::HackRfOne => write!(f, "HackRF One"),
            BoardId::Rad1o => write!(f, "rad1o"),
            BoardId::Invalid => write!(f, "Invalid Board ID"),
            BoardId::Unknown(raw) => write!(f, "Unknown Board ID (0x{:04X})", raw),
        }
    }
}

/// Device information returned by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Serial number string (32 hex digits on HackRF One)
    pub serial: String,
    /// Board identifier
    pub board_id: BoardId,
    /// Position in the enumeration list, as accepted by `open_by_index`
    pub index: usize,
}
