//! MediaTek boot ROM download protocol client.
//!
//! Identifies the connected chip by its hardware code, then reads and writes
//! target memory. Regions the boot ROM refuses to expose can be reached
//! through the CQDMA peripheral, which is also used to patch out the bounds
//! check so later transfers may use the faster direct commands.

#[macro_use]
extern crate log;

extern crate nb;

extern crate embedded_hal;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::{Read, Write};

#[cfg(feature = "structopt")]
extern crate structopt;

#[cfg(feature = "linux")]
extern crate linux_embedded_hal;

#[cfg(feature = "linux")]
pub mod linux;

pub mod chip;
mod commands;
pub mod link;
pub mod memory;
pub mod protocol;

#[cfg(test)]
mod mock;

pub use chip::{Chip, ChipProfile, Region};
pub use link::Link;
pub use memory::Access;
pub use protocol::{Command, HwSwVersion, Subcommand, TargetConfig};

/// Byte transport to the boot ROM
pub trait SerialPort<E>: Write<u8, Error = E> + Read<u8, Error = E> {}

impl<T, E> SerialPort<E> for T where T: Write<u8, Error = E> + Read<u8, Error = E> {}

#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error<SerialError> {
    #[error("serial error: {0:?}")]
    Serial(SerialError),

    #[error("short read ({received} of {expected} bytes)")]
    ShortRead { expected: usize, received: usize },

    #[error("write timeout")]
    WriteTimeout,

    #[error("echo mismatch (sent {sent:02x?}, received {echoed:02x?})")]
    EchoMismatch { sent: Vec<u8>, echoed: Vec<u8> },

    #[error("command {command:?} failed with status 0x{status:04x}")]
    Status { command: Command, status: u16 },

    #[error("unknown hardware code 0x{0:04x}")]
    UnknownChip(u16),

    #[error("transfer of {0} words exceeds the protocol limit")]
    TransferTooLarge(usize),
}

impl<SerialError> Error<SerialError> {
    /// Faults of the underlying link, after which the session is out of sync
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            Error::Serial(_)
                | Error::ShortRead { .. }
                | Error::WriteTimeout
                | Error::EchoMismatch { .. }
        )
    }
}

impl<SerialError> From<chip::UnknownChip> for Error<SerialError> {
    fn from(e: chip::UnknownChip) -> Self {
        Self::UnknownChip(e.0)
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "structopt", derive(structopt::StructOpt))]
pub struct Options {
    /// Timeout to wait for boot ROM responses
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "1000"))]
    pub response_timeout_ms: u32,

    /// Timeout to wait for each byte to be accepted by the port
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "1000"))]
    pub write_timeout_ms: u32,

    /// Period to poll the port while waiting
    #[cfg_attr(feature = "structopt", structopt(long, default_value = "1"))]
    pub poll_delay_ms: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            response_timeout_ms: 1000,
            write_timeout_ms: 1000,
            poll_delay_ms: 1,
        }
    }
}

/// A connection to an identified chip
pub struct Session<P, D, E> {
    link: Link<P, D, E>,
    chip: &'static ChipProfile,
    indirect_required: bool,
}

impl<P, D, E> Session<P, D, E>
where
    P: SerialPort<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    /// Identify the chip on an open port and start a session
    pub fn connect(port: P, delay: D, options: Options) -> Result<Self, Error<E>> {
        let mut link = Link::new(port, delay, options);

        debug!("Reading hardware code");
        let hw_code = link.get_hw_code()?;

        let chip = chip::resolve(hw_code)?;
        info!("{} detected (hardware code 0x{:04x})", chip.name, hw_code);

        Ok(Self {
            link,
            chip,
            indirect_required: true,
        })
    }

    /// Profile of the connected chip
    pub fn chip(&self) -> &'static ChipProfile {
        self.chip
    }

    /// Whether protected memory is only reachable via the CQDMA
    pub fn indirect_required(&self) -> bool {
        self.indirect_required
    }

    /// Link for issuing raw commands
    pub fn link(&mut self) -> &mut Link<P, D, E> {
        &mut self.link
    }

    /// End the session, returning the transport
    pub fn free(self) -> (P, D) {
        self.link.free()
    }

    fn access(&self) -> Access {
        if self.indirect_required {
            Access::Indirect
        } else {
            Access::Direct
        }
    }

    /// Disable the boot ROM bounds check so direct commands reach all memory.
    ///
    /// Returns whether the bypass is active. This happens once per session,
    /// there is no way back to indirect mode.
    pub fn apply_bypass(&mut self) -> Result<bool, Error<E>> {
        if !self.indirect_required {
            return Ok(true);
        }

        let patches = self.chip.bounds_check;
        if patches.is_empty() {
            warn!("No bounds check patch known for {}", self.chip.name);
            return Ok(false);
        }

        for (addr, value) in patches {
            debug!("Patching bounds check at 0x{:08x}", addr);
            self.cqdma_write32(*addr, &[*value])?;
        }

        info!("Bounds check disabled");
        self.indirect_required = false;

        Ok(true)
    }
}
