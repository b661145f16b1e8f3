#[macro_use]
extern crate log;

extern crate structopt;
use structopt::StructOpt;

extern crate simplelog;
use simplelog::{Config, LevelFilter, SimpleLogger};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};

use mtk_usbdl::{Access, Options, Session, Subcommand};

/// Watchdog mode register
const WDT_MODE: u32 = 0x1000_7000;
/// Key with all enable bits cleared
const WDT_DISABLE: u32 = 0x2200_0000;

#[derive(Clone, Debug, StructOpt)]
pub struct Args {
    /// Serial port to connect to
    #[structopt(long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Serial port baud rate
    #[structopt(long, default_value = "115200")]
    baud: usize,

    /// Directory to write dumps to
    #[structopt(long, default_value = ".")]
    output: PathBuf,

    /// Bytes per boot ROM read, large indirect reads tend to reset the target
    #[structopt(long, default_value = "1024")]
    chunk_size: u32,

    /// Skip dumping the boot ROM
    #[structopt(long)]
    no_brom: bool,

    #[structopt(flatten)]
    options: Options,

    /// Log level for console output
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

fn write_dump(dir: &Path, name: &str, data: &[u8]) -> anyhow::Result<()> {
    let path = dir.join(name);
    fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {} to {}", bytefmt::format(data.len() as u64), path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse out arguments
    let o = Args::from_args();

    // Configure logger
    let _ = SimpleLogger::init(o.log_level, Config::default());

    if o.chunk_size == 0 {
        bail!("chunk size must be non-zero");
    }

    info!("Connecting to boot ROM on {}", o.port);

    let mut s = Session::linux(&o.port, o.baud, o.options.clone())?;
    let chip = s.chip();
    let name = chip.name.to_lowercase();

    let v = s.link().get_hw_sw_ver()?;
    info!(
        "Hardware subcode: 0x{:04x} hardware version: 0x{:04x} software version: 0x{:04x}",
        v.hw_subcode, v.hw_ver, v.sw_ver
    );

    info!("Disabling watchdog");
    s.link().write32(WDT_MODE, &[WDT_DISABLE])?;

    let config = s.link().get_target_config()?;
    info!("Target config: 0x{:08x}", config.0);
    info!("\tSBC enabled: {}", config.sbc_enabled());
    info!("\tSLA enabled: {}", config.sla_enabled());
    info!("\tDAA enabled: {}", config.daa_enabled());

    info!("Dumping efuses");
    let efuses = s.memory_read(chip.efusec.base, chip.efusec.size, Access::Direct)?;
    debug!("efuses: {}...", hex::encode(&efuses[..efuses.len().min(32)]));
    write_dump(&o.output, &format!("{}-efuses.bin", name), &efuses)?;

    if o.no_brom {
        return Ok(());
    }

    debug!("Disabling caches");
    s.link().c8(Subcommand::B1)?;

    if !s.apply_bypass()? {
        warn!("Bounds check still active, falling back to CQDMA reads");
    }

    let access = if s.indirect_required() {
        Access::Indirect
    } else {
        Access::Direct
    };

    info!("Dumping BROM ({:?})", access);

    let brom = chip.brom;
    let pb = ProgressBar::new(u64::from(brom.size));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {bytes}/{total_bytes} ({eta})")
            .progress_chars("=>-"),
    );

    let start = Instant::now();
    let mut data = Vec::with_capacity(brom.size as usize);

    let mut offset = 0;
    while offset < brom.size {
        let len = o.chunk_size.min(brom.size - offset);

        let chunk = match s.memory_read(brom.base + offset, len, access) {
            Ok(c) => c,
            Err(e) => {
                pb.abandon();
                error!("BROM read failed at offset 0x{:x}: {}", offset, e);
                if offset > 0 {
                    write_dump(&o.output, &format!("{}-brom-partial.bin", name), &data)?;
                }
                return Err(e.into());
            }
        };

        data.extend_from_slice(&chunk);
        pb.inc(u64::from(len));
        offset += len;
    }

    pb.finish_and_clear();

    if data.len() != brom.size as usize {
        bail!("failed to dump entire BROM ({} of {} bytes)", data.len(), brom.size);
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "Dumped the {} BROM in {:.2}s ({}/s)",
        bytefmt::format(data.len() as u64),
        elapsed,
        bytefmt::format((data.len() as f64 / elapsed) as u64)
    );

    write_dump(&o.output, &format!("{}-brom.bin", name), &data)?;

    Ok(())
}
