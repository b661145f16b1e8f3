//! Simulated boot ROM for tests.

use std::cell::{Cell, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::{Read, Write};

use crate::chip::{Chip, Region};
use crate::memory::cqdma;

/// Status the boot ROM returns for addresses outside the bounds check
pub const STATUS_BLOCKED: u16 = 0x1D0C;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MockError;

pub struct NoDelay;

impl DelayMs<u32> for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

/// Delay that only adds up the time asked for
#[derive(Clone, Default)]
pub struct CountingDelay(Rc<Cell<u32>>);

impl CountingDelay {
    pub fn elapsed_ms(&self) -> u32 {
        self.0.get()
    }
}

impl DelayMs<u32> for CountingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.set(self.0.get() + ms);
    }
}

#[derive(Default)]
pub struct Target {
    pub hw_code: u16,
    /// Status sent before the data phase of read32 / write32
    pub initial_status: u16,
    /// Trailing status for every command
    pub final_status: u16,
    pub last_subcommand: Option<u8>,
    pub jumped: Option<u32>,
    pub dma_transfers: usize,
    /// Every word stored by write32, in order
    pub writes: Vec<(u32, u32)>,

    /// Writes never complete
    pub stall_writes: bool,
    /// Reads and writes fail with a port error
    pub port_error: bool,

    emulate: bool,
    memory: HashMap<u32, u32>,
    protected: Vec<Region>,
    bounds_check: Vec<u32>,
    cqdma_base: u32,

    corrupt_echo: Option<usize>,
    replies: Vec<(usize, Vec<u8>)>,
    written: Vec<u8>,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
}

impl Target {
    pub fn peek(&self, addr: u32) -> u32 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    pub fn poke(&mut self, addr: u32, v: u32) {
        self.memory.insert(addr, v);
    }

    /// Clear the bounds check flags
    pub fn unlock(&mut self) {
        for a in self.bounds_check.clone() {
            self.poke(a, 0);
        }
    }

    fn blocked(&self, addr: u32, count: u32) -> bool {
        if self.bounds_check.iter().all(|a| self.peek(*a) == 0) {
            return false;
        }

        (0..count).any(|i| {
            let a = addr.wrapping_add(i * 4);
            self.protected.iter().any(|r| r.contains(a))
        })
    }

    fn receive(&mut self, b: u8) {
        let index = self.written.len();
        self.written.push(b);

        match self.corrupt_echo {
            Some(i) if i == index => self.rx.push_back(b ^ 0xFF),
            _ => self.rx.push_back(b),
        }

        let written = self.written.len();
        if let Some(i) = self.replies.iter().position(|(n, _)| *n == written) {
            let (_, data) = self.replies.remove(i);
            self.rx.extend(data);
        }

        if self.emulate {
            self.pending.push(b);
            self.process();
        }
    }

    fn respond_word(&mut self, v: u16) {
        self.rx.extend(v.to_be_bytes().iter());
    }

    fn respond_dword(&mut self, v: u32) {
        self.rx.extend(v.to_be_bytes().iter());
    }

    fn pending_dword(&self, offset: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.pending[offset..offset + 4]);
        u32::from_be_bytes(b)
    }

    fn finish(&mut self) {
        let status = self.final_status;
        self.respond_word(status);
        self.pending.clear();
    }

    fn reject(&mut self) {
        self.respond_word(STATUS_BLOCKED);
        self.pending.clear();
    }

    fn store(&mut self, addr: u32, v: u32) {
        self.poke(addr, v);
        self.writes.push((addr, v));

        if addr == self.cqdma_base + cqdma::EN && v & 1 != 0 {
            let src = self.peek(self.cqdma_base + cqdma::SRC);
            let dst = self.peek(self.cqdma_base + cqdma::DST);
            let len = self.peek(self.cqdma_base + cqdma::LEN);

            for i in 0..len / 4 {
                let w = self.peek(src + i * 4);
                self.poke(dst + i * 4, w);
            }
            self.dma_transfers += 1;
        }
    }

    fn process(&mut self) {
        let len = self.pending.len();

        match (self.pending[0], len) {
            (0xFD, _) => {
                let code = self.hw_code;
                self.respond_word(code);
                self.finish();
            }
            (0xFC, _) => {
                self.respond_word(0x8a00);
                self.respond_word(0xca00);
                self.respond_word(0x0000);
                self.finish();
            }
            (0xD8, _) => {
                self.respond_dword(0x0000_0001);
                self.finish();
            }
            (0xDB, _) => self.finish(),
            (0xC8, 2) => {
                let sub = self.pending[1];
                self.last_subcommand = Some(sub);
                self.rx.push_back(sub);
                self.finish();
            }
            (0xD5, 5) => {
                self.jumped = Some(self.pending_dword(1));
                self.finish();
            }
            (0xD1, 9) => {
                let addr = self.pending_dword(1);
                let count = self.pending_dword(5);
                if self.blocked(addr, count) {
                    return self.reject();
                }

                let status = self.initial_status;
                self.respond_word(status);
                for i in 0..count {
                    let w = self.peek(addr.wrapping_add(i * 4));
                    self.respond_dword(w);
                }
                self.finish();
            }
            (0xD4, 9) => {
                let addr = self.pending_dword(1);
                let count = self.pending_dword(5);
                if self.blocked(addr, count) {
                    return self.reject();
                }

                let status = self.initial_status;
                self.respond_word(status);
                if count == 0 {
                    self.finish();
                }
            }
            (0xD4, n) if n > 9 => {
                let addr = self.pending_dword(1);
                let count = self.pending_dword(5) as usize;
                if n < 9 + count * 4 {
                    return;
                }

                for i in 0..count {
                    let w = self.pending_dword(9 + i * 4);
                    self.store(addr.wrapping_add(i as u32 * 4), w);
                }
                self.finish();
            }
            (0xC8, _) | (0xD5, _) | (0xD1, _) | (0xD4, _) => (),
            _ => self.pending.clear(),
        }
    }
}

#[derive(Clone)]
pub struct MockPort(Rc<RefCell<Target>>);

impl MockPort {
    /// Port that only echoes, responses are queued by hand
    pub fn raw() -> Self {
        Self(Rc::new(RefCell::new(Target::default())))
    }

    /// Emulated MT6735 boot ROM with the bounds check active
    pub fn mt6735() -> Self {
        let p = Chip::Mt6735.profile();

        let mut t = Target {
            hw_code: p.hw_code,
            emulate: true,
            protected: vec![p.brom, p.sram],
            bounds_check: p.bounds_check.iter().map(|(a, _)| *a).collect(),
            cqdma_base: p.cqdma_base,
            ..Target::default()
        };
        for (a, _) in p.bounds_check {
            t.poke(*a, 1);
        }

        Self(Rc::new(RefCell::new(t)))
    }

    pub fn target(&self) -> RefMut<Target> {
        self.0.borrow_mut()
    }

    pub fn queue(&self, data: &[u8]) {
        self.target().rx.extend(data.iter());
    }

    /// All bytes written by the host
    pub fn sent(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    /// Queue a response once `after` bytes have been written in total
    pub fn reply_after(&self, after: usize, data: &[u8]) {
        self.target().replies.push((after, data.to_vec()));
    }

    /// Flip the echo of the nth byte written
    pub fn corrupt_echo(&self, index: usize) {
        self.target().corrupt_echo = Some(index);
    }
}

impl Write<u8> for MockPort {
    type Error = MockError;

    fn write(&mut self, b: u8) -> nb::Result<(), Self::Error> {
        let mut t = self.target();
        if t.port_error {
            return Err(nb::Error::Other(MockError));
        }
        if t.stall_writes {
            return Err(nb::Error::WouldBlock);
        }

        t.receive(b);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

impl Read<u8> for MockPort {
    type Error = MockError;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut t = self.target();
        if t.port_error {
            return Err(nb::Error::Other(MockError));
        }

        t.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}
