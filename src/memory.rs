//! Byte-range memory access.
//!
//! Memory is transferred as whole 32-bit words, either directly with
//! `read32`/`write32` or indirectly by having the CQDMA peripheral copy each
//! word through the profile's scratch address. The indirect path reaches
//! memory the boot ROM bounds check refuses to touch.

use embedded_hal::blocking::delay::DelayMs;

use crate::commands::MAX_PREALLOC_WORDS;
use crate::{Error, SerialPort, Session};

/// CQDMA register offsets
pub mod cqdma {
    /// Start transfer
    pub const EN: u32 = 0x08;
    /// Stop and reset transfer
    pub const STOP: u32 = 0x0C;
    pub const SRC: u32 = 0x1C;
    pub const DST: u32 = 0x20;
    /// Transfer length in bytes
    pub const LEN: u32 = 0x24;
}

/// Written to the scratch address after each indirect write so an incomplete
/// transfer can be spotted
pub const SCRATCH_SENTINEL: u32 = 0xC0FF_EEEE;

/// Path used to reach target memory
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Access {
    /// `read32` / `write32` commands
    Direct,
    /// Word by word through the CQDMA peripheral
    Indirect,
}

/// Serialise memory words in target (little-endian) byte order
pub fn words_to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes().to_vec()).collect()
}

/// Split bytes into little-endian memory words, zero padding the last word
pub fn le_bytes_to_words(data: &[u8]) -> Vec<u32> {
    data.chunks(4)
        .map(|c| {
            let mut b = [0u8; 4];
            b[..c.len()].copy_from_slice(c);
            u32::from_le_bytes(b)
        })
        .collect()
}

/// Address of the `index`th word from `base`, wrapping at the top of memory
fn word_addr(base: u32, index: u32) -> u32 {
    base.wrapping_add(index.wrapping_mul(4))
}

impl<P, D, E> Session<P, D, E>
where
    P: SerialPort<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    fn cqdma_copy(&mut self, src: u32, dst: u32) -> Result<(), Error<E>> {
        let base = self.chip.cqdma_base;

        self.link.write32(base + cqdma::SRC, &[src])?;
        self.link.write32(base + cqdma::DST, &[dst])?;
        self.link.write32(base + cqdma::LEN, &[4])?;
        self.link.write32(base + cqdma::EN, &[0x0000_0001])?;
        self.link.write32(base + cqdma::STOP, &[0x0000_0001])?;

        Ok(())
    }

    /// Read words via the CQDMA, one transfer per word
    pub fn cqdma_read32(&mut self, addr: u32, count: u32) -> Result<Vec<u32>, Error<E>> {
        let tmp_addr = self.chip.tmp_addr;
        let mut words = Vec::with_capacity(count.min(MAX_PREALLOC_WORDS) as usize);

        for i in 0..count {
            self.cqdma_copy(word_addr(addr, i), tmp_addr)?;
            words.extend(self.link.read32(tmp_addr, 1)?);
        }

        Ok(words)
    }

    /// Write words via the CQDMA, one transfer per word
    pub fn cqdma_write32(&mut self, addr: u32, words: &[u32]) -> Result<(), Error<E>> {
        let tmp_addr = self.chip.tmp_addr;

        for (i, w) in words.iter().enumerate() {
            self.link.write32(tmp_addr, &[*w])?;
            self.cqdma_copy(tmp_addr, word_addr(addr, i as u32))?;
            self.link.write32(tmp_addr, &[SCRATCH_SENTINEL])?;
        }

        Ok(())
    }

    /// Read `count` bytes of memory starting at `addr`
    pub fn memory_read(
        &mut self,
        addr: u32,
        count: u32,
        access: Access,
    ) -> Result<Vec<u8>, Error<E>> {
        let word_count = count / 4 + u32::from(count % 4 != 0);

        debug!("Reading {} bytes at 0x{:08x} ({:?})", count, addr, access);

        let words = match access {
            Access::Direct => self.link.read32(addr, word_count)?,
            Access::Indirect => self.cqdma_read32(addr, word_count)?,
        };

        let mut data = words_to_le_bytes(&words);
        data.truncate(count as usize);

        Ok(data)
    }

    /// Write bytes to memory starting at `addr`.
    ///
    /// The final word is zero padded, so up to three bytes past the end of
    /// `data` are overwritten.
    pub fn memory_write(
        &mut self,
        addr: u32,
        data: &[u8],
        access: Access,
    ) -> Result<(), Error<E>> {
        let len = data.len();
        debug!("Writing {} bytes at 0x{:08x} ({:?})", len, addr, access);

        let words = le_bytes_to_words(data);

        match access {
            Access::Direct => self.link.write32(addr, &words),
            Access::Indirect => self.cqdma_write32(addr, &words),
        }
    }

    /// Read memory using the indirect path until the bypass is applied
    pub fn read(&mut self, addr: u32, count: u32) -> Result<Vec<u8>, Error<E>> {
        let access = self.access();
        self.memory_read(addr, count, access)
    }

    /// Write memory using the indirect path until the bypass is applied
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<E>> {
        let access = self.access();
        self.memory_write(addr, data, access)
    }
}
