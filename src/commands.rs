//! Boot ROM download commands.
//!
//! Every command starts with its opcode byte, followed by command specific
//! big-endian fields, and is terminated by one or two status words.

use std::convert::TryFrom;

use embedded_hal::blocking::delay::DelayMs;

use crate::link::Link;
use crate::protocol::{Command, HwSwVersion, Subcommand, TargetConfig};
use crate::{Error, SerialPort};

/// Upper bound on words reserved before a read's data arrives
pub(crate) const MAX_PREALLOC_WORDS: u32 = 0x1000;

impl<P, D, E> Link<P, D, E>
where
    P: SerialPort<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    fn command(&mut self, command: Command) -> Result<(), Error<E>> {
        debug!("Sending command {:?}", command);
        self.put_byte(command.opcode())
    }

    fn status(&mut self, command: Command) -> Result<u16, Error<E>> {
        let status = self.get_word()?;

        if !command.status_ok(status) {
            error!("Command {:?} failed with status 0x{:04x}", command, status);
            return Err(Error::Status { command, status });
        }

        Ok(status)
    }

    /// Fetch the hardware code identifying the connected chip
    pub fn get_hw_code(&mut self) -> Result<u16, Error<E>> {
        self.command(Command::GetHwCode)?;
        let hw_code = self.get_word()?;
        self.status(Command::GetHwCode)?;

        Ok(hw_code)
    }

    pub fn get_hw_sw_ver(&mut self) -> Result<HwSwVersion, Error<E>> {
        self.command(Command::GetHwSwVer)?;
        let hw_subcode = self.get_word()?;
        let hw_ver = self.get_word()?;
        let sw_ver = self.get_word()?;
        self.status(Command::GetHwSwVer)?;

        Ok(HwSwVersion {
            hw_subcode,
            hw_ver,
            sw_ver,
        })
    }

    /// Fetch the security configuration of the target
    pub fn get_target_config(&mut self) -> Result<TargetConfig, Error<E>> {
        self.command(Command::GetTargetConfig)?;
        let config = self.get_dword()?;
        self.status(Command::GetTargetConfig)?;

        Ok(TargetConfig(config))
    }

    /// Issue a 0xC8 family subcommand, returning its data byte
    pub fn c8(&mut self, subcommand: Subcommand) -> Result<u8, Error<E>> {
        self.command(Command::C8)?;
        self.put_byte(subcommand.code())?;
        let data = self.get_byte()?;
        self.status(Command::C8)?;

        Ok(data)
    }

    pub fn uart1_log_enable(&mut self) -> Result<(), Error<E>> {
        self.command(Command::Uart1LogEn)?;
        self.status(Command::Uart1LogEn)?;

        Ok(())
    }

    /// Read `count` 32-bit words starting at `addr` with a single command
    pub fn read32(&mut self, addr: u32, count: u32) -> Result<Vec<u32>, Error<E>> {
        self.command(Command::Read32)?;
        self.put_dword(addr)?;
        self.put_dword(count)?;
        self.status(Command::Read32)?;

        // Grow as words arrive, the count comes from the caller
        let mut words = Vec::with_capacity(count.min(MAX_PREALLOC_WORDS) as usize);
        for _ in 0..count {
            words.push(self.get_dword()?);
        }

        self.status(Command::Read32)?;

        Ok(words)
    }

    /// Write 32-bit words starting at `addr` with a single command
    pub fn write32(&mut self, addr: u32, words: &[u32]) -> Result<(), Error<E>> {
        let count =
            u32::try_from(words.len()).map_err(|_| Error::TransferTooLarge(words.len()))?;

        self.command(Command::Write32)?;
        self.put_dword(addr)?;
        self.put_dword(count)?;
        self.status(Command::Write32)?;

        for w in words {
            self.put_dword(*w)?;
        }

        self.status(Command::Write32)?;

        Ok(())
    }

    /// Jump to a download agent at `addr`
    pub fn jump_da(&mut self, addr: u32) -> Result<(), Error<E>> {
        self.command(Command::JumpDa)?;
        self.put_dword(addr)?;
        self.status(Command::JumpDa)?;

        Ok(())
    }
}
