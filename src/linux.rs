use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use linux_embedded_hal::{Delay, Serial};
use serial_core::{
    BaudRate, CharSize, FlowControl, Parity, SerialDevice as _, SerialPortSettings as _, StopBits,
};

use crate::{Options, Session};

impl Session<Serial, Delay, IoErrorKind> {
    /// Open a linux serial port and connect to the boot ROM behind it
    pub fn linux<P: AsRef<Path>>(port: P, baud: usize, options: Options) -> anyhow::Result<Self> {
        let path = port.as_ref();

        // Open port
        let mut port = Serial::open(path)
            .with_context(|| format!("opening serial port {}", path.display()))?;

        // Apply settings
        let mut settings = port.0.read_settings()?;

        settings.set_char_size(CharSize::Bits8);
        settings.set_stop_bits(StopBits::Stop1);
        settings.set_baud_rate(BaudRate::from_speed(baud))?;
        settings.set_flow_control(FlowControl::FlowNone);
        settings.set_parity(Parity::ParityNone);

        port.0.write_settings(&settings)?;

        // Never block in the port, the link does its own polling and timeout
        port.0.set_timeout(Duration::from_millis(0))?;

        let session = Self::connect(port, Delay {}, options)
            .context("connecting to boot ROM")?;

        Ok(session)
    }
}
