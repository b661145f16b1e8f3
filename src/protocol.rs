//! Command opcodes, status checks and response types.

use std::convert::TryFrom;

/// Largest status value the memory/control commands treat as success
pub const STATUS_TOLERANCE: u16 = 0xFF;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Command {
    /// Vendor subcommand family, see [`Subcommand`]
    C8 = 0xC8,

    /// Reads 32-bit words starting from an address specified by the host.
    Read32 = 0xD1,

    /// Writes 32-bit words starting from an address specified by the host.
    Write32 = 0xD4,

    /// Jumps to a download agent previously placed in memory.
    JumpDa = 0xD5,

    /// Fetches the security configuration word of the target.
    GetTargetConfig = 0xD8,

    /// Enables boot ROM logging on UART1.
    Uart1LogEn = 0xDB,

    /// Fetches hardware subcode, hardware version and software version.
    GetHwSwVer = 0xFC,

    /// Fetches the hardware code identifying the chip.
    GetHwCode = 0xFD,
}

impl Command {
    /// Opcode byte sent on the wire
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Check a status word returned by this command.
    ///
    /// Queries and reads only accept exactly zero, writes and jumps accept
    /// anything up to [`STATUS_TOLERANCE`]. The boot ROM is observed to
    /// behave this way and the two must not be unified.
    pub fn status_ok(self, status: u16) -> bool {
        match self {
            Command::C8
            | Command::Read32
            | Command::GetTargetConfig
            | Command::Uart1LogEn
            | Command::GetHwSwVer
            | Command::GetHwCode => status == 0,
            Command::Write32 | Command::JumpDa => status <= STATUS_TOLERANCE,
        }
    }
}

/// Subcommands of [`Command::C8`].
///
/// Most of these are undocumented, they are named by their byte value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Subcommand {
    B0 = 0xB0,
    /// Disables the boot ROM caches
    B1 = 0xB1,
    B2 = 0xB2,
    B3 = 0xB3,
    B4 = 0xB4,
    B5 = 0xB5,
    B6 = 0xB6,
    B7 = 0xB7,
    B8 = 0xB8,
    B9 = 0xB9,
    Ba = 0xBA,
    C0 = 0xC0,
    C1 = 0xC1,
    C2 = 0xC2,
    C3 = 0xC3,
    C4 = 0xC4,
    C5 = 0xC5,
    C6 = 0xC6,
    C7 = 0xC7,
    C8 = 0xC8,
    C9 = 0xC9,
    Ca = 0xCA,
    Cb = 0xCB,
    Cc = 0xCC,
}

impl Subcommand {
    pub const ALL: [Subcommand; 24] = [
        Subcommand::B0,
        Subcommand::B1,
        Subcommand::B2,
        Subcommand::B3,
        Subcommand::B4,
        Subcommand::B5,
        Subcommand::B6,
        Subcommand::B7,
        Subcommand::B8,
        Subcommand::B9,
        Subcommand::Ba,
        Subcommand::C0,
        Subcommand::C1,
        Subcommand::C2,
        Subcommand::C3,
        Subcommand::C4,
        Subcommand::C5,
        Subcommand::C6,
        Subcommand::C7,
        Subcommand::C8,
        Subcommand::C9,
        Subcommand::Ca,
        Subcommand::Cb,
        Subcommand::Cc,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Subcommand {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Subcommand::ALL
            .iter()
            .copied()
            .find(|s| s.code() == v)
            .ok_or(v)
    }
}

/// Security configuration reported by [`Command::GetTargetConfig`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TargetConfig(pub u32);

impl TargetConfig {
    /// Secure boot check
    pub fn sbc_enabled(&self) -> bool {
        self.0 & 0x1 != 0
    }

    /// Serial link authentication
    pub fn sla_enabled(&self) -> bool {
        self.0 & 0x2 != 0
    }

    /// Download agent authentication
    pub fn daa_enabled(&self) -> bool {
        self.0 & 0x4 != 0
    }
}

/// Response to [`Command::GetHwSwVer`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct HwSwVersion {
    pub hw_subcode: u16,
    pub hw_ver: u16,
    pub sw_ver: u16,
}
