//! Echo-verified byte link.
//!
//! The boot ROM reflects every byte the host transmits, so each write is
//! followed by reading the same bytes back. Multi-byte control fields are
//! big-endian on the wire.

use core::marker::PhantomData;

use embedded_hal::blocking::delay::DelayMs;

use crate::{Error, Options, SerialPort};

pub struct Link<P, D, E> {
    port: P,
    delay: D,
    options: Options,
    _err: PhantomData<E>,
}

impl<P, D, E> Link<P, D, E>
where
    P: SerialPort<E>,
    D: DelayMs<u32>,
    E: core::fmt::Debug,
{
    /// Wrap a transport, the boot ROM handshake must already be complete
    pub fn new(port: P, delay: D, options: Options) -> Self {
        Self {
            port,
            delay,
            options,
            _err: PhantomData,
        }
    }

    /// Release the underlying transport
    pub fn free(self) -> (P, D) {
        (self.port, self.delay)
    }

    /// Write bytes and check they are echoed back unchanged
    pub fn send(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        trace!("-> {:02x?}", data);

        for b in data {
            self.write_byte(*b)?;
        }

        let mut echo = vec![0u8; data.len()];
        self.recv(&mut echo)?;

        if echo != data {
            error!("Echo mismatch (sent: {:02x?} received: {:02x?})", data, echo);
            return Err(Error::EchoMismatch {
                sent: data.to_vec(),
                echoed: echo,
            });
        }

        Ok(())
    }

    /// Read exactly `buff.len()` bytes within the response timeout.
    ///
    /// The timeout is counted in poll periods, so the port itself must not
    /// block on reads.
    pub fn recv(&mut self, buff: &mut [u8]) -> Result<(), Error<E>> {
        let expected = buff.len();
        let poll = self.options.poll_delay_ms.max(1);
        let mut t = 0;

        for (received, b) in buff.iter_mut().enumerate() {
            loop {
                match self.port.read() {
                    Err(nb::Error::WouldBlock) => (),
                    Err(nb::Error::Other(e)) => return Err(Error::Serial(e)),
                    Ok(v) => {
                        *b = v;
                        break;
                    }
                }

                if t >= self.options.response_timeout_ms {
                    debug!("Receive timeout ({} of {} bytes)", received, expected);
                    return Err(Error::ShortRead { expected, received });
                }

                self.delay.delay_ms(poll);
                t += poll;
            }
        }

        trace!("<- {:02x?}", buff);

        Ok(())
    }

    fn write_byte(&mut self, b: u8) -> Result<(), Error<E>> {
        let poll = self.options.poll_delay_ms.max(1);
        let mut t = 0;

        loop {
            match self.port.write(b) {
                Err(nb::Error::WouldBlock) => (),
                Err(nb::Error::Other(e)) => return Err(Error::Serial(e)),
                Ok(_) => return Ok(()),
            }

            if t >= self.options.write_timeout_ms {
                error!("Write timeout");
                return Err(Error::WriteTimeout);
            }

            self.delay.delay_ms(poll);
            t += poll;
        }
    }

    pub fn put_byte(&mut self, v: u8) -> Result<(), Error<E>> {
        self.send(&[v])
    }

    pub fn get_byte(&mut self) -> Result<u8, Error<E>> {
        let mut b = [0u8; 1];
        self.recv(&mut b)?;
        Ok(b[0])
    }

    /// Write a big-endian 16-bit value
    pub fn put_word(&mut self, v: u16) -> Result<(), Error<E>> {
        self.send(&v.to_be_bytes())
    }

    /// Read a big-endian 16-bit value
    pub fn get_word(&mut self) -> Result<u16, Error<E>> {
        let mut b = [0u8; 2];
        self.recv(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    /// Write a big-endian 32-bit value
    pub fn put_dword(&mut self, v: u32) -> Result<(), Error<E>> {
        self.send(&v.to_be_bytes())
    }

    /// Read a big-endian 32-bit value
    pub fn get_dword(&mut self) -> Result<u32, Error<E>> {
        let mut b = [0u8; 4];
        self.recv(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }
}
