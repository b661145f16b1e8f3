//! Memory maps of supported chips, keyed by hardware code.

/// A region of target memory
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Region {
    pub base: u32,
    pub size: u32,
}

impl Region {
    pub const fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// Check whether an address lies within the region
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr - self.base) < self.size
    }
}

/// Chips with a known memory map
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Chip {
    Mt6797,
    Mt6735,
    Mt6737m,
    Mt8163,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ChipProfile {
    pub chip: Chip,
    pub name: &'static str,
    pub hw_code: u16,

    /// Boot ROM
    pub brom: Region,
    pub sram: Region,
    pub l2_sram: Region,
    /// eFuse controller
    pub efusec: Region,

    /// Base of the CQDMA peripheral used for indirect access
    pub cqdma_base: u32,
    /// Scratch word the CQDMA copies through
    pub tmp_addr: u32,

    /// Writes that clear the boot ROM's `g_bounds_check` flags, applied in order
    pub bounds_check: &'static [(u32, u32)],
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[error("unknown hardware code 0x{0:04x}")]
pub struct UnknownChip(pub u16);

const EFUSEC: Region = Region::new(0x1020_6000, 0x1000);

static MT6797: ChipProfile = ChipProfile {
    chip: Chip::Mt6797,
    name: "MT6797",
    hw_code: 0x0279,
    brom: Region::new(0x0000_0000, 0x14000),
    sram: Region::new(0x0010_0000, 0x30000),
    // Not at 0x00400000 as the datasheet claims
    l2_sram: Region::new(0x0020_0000, 0x10_0000),
    efusec: EFUSEC,
    cqdma_base: 0x1021_2C00,
    tmp_addr: 0x1100_01A0,
    bounds_check: &[(0x0010_276C, 0x0000_0000), (0x0010_5704, 0x0000_0000)],
};

static MT6735: ChipProfile = ChipProfile {
    chip: Chip::Mt6735,
    name: "MT6735",
    hw_code: 0x0321,
    brom: Region::new(0x0000_0000, 0x10000),
    sram: Region::new(0x0010_0000, 0x10000),
    l2_sram: Region::new(0x0020_0000, 0x40000),
    efusec: EFUSEC,
    cqdma_base: 0x1021_7C00,
    tmp_addr: 0x1100_01A0,
    bounds_check: &[(0x0010_2760, 0x0000_0000), (0x0010_5704, 0x0000_0000)],
};

static MT6737M: ChipProfile = ChipProfile {
    chip: Chip::Mt6737m,
    name: "MT6737M",
    hw_code: 0x0335,
    brom: Region::new(0x0000_0000, 0x10000),
    sram: Region::new(0x0010_0000, 0x10000),
    l2_sram: Region::new(0x0020_0000, 0x40000),
    efusec: EFUSEC,
    cqdma_base: 0x1021_7C00,
    tmp_addr: 0x1100_01A0,
    bounds_check: &[(0x0010_2760, 0x0000_0000), (0x0010_5704, 0x0000_0000)],
};

static MT8163: ChipProfile = ChipProfile {
    chip: Chip::Mt8163,
    name: "MT8163",
    hw_code: 0x8163,
    brom: Region::new(0x0000_0000, 0x14000),
    sram: Region::new(0x0010_0000, 0x10000),
    l2_sram: Region::new(0x0020_0000, 0x40000),
    efusec: EFUSEC,
    cqdma_base: 0x1021_2C00,
    tmp_addr: 0x1100_01A0,
    bounds_check: &[(0x0010_2868, 0x0000_0000)],
};

impl Chip {
    pub const ALL: [Chip; 4] = [Chip::Mt6797, Chip::Mt6735, Chip::Mt6737m, Chip::Mt8163];

    pub fn from_hw_code(hw_code: u16) -> Option<Chip> {
        match hw_code {
            0x0279 => Some(Chip::Mt6797),
            0x0321 => Some(Chip::Mt6735),
            0x0335 => Some(Chip::Mt6737m),
            0x8163 => Some(Chip::Mt8163),
            _ => None,
        }
    }

    pub fn profile(self) -> &'static ChipProfile {
        match self {
            Chip::Mt6797 => &MT6797,
            Chip::Mt6735 => &MT6735,
            Chip::Mt6737m => &MT6737M,
            Chip::Mt8163 => &MT8163,
        }
    }
}

/// Look up the profile for a hardware code, unknown codes are an error
pub fn resolve(hw_code: u16) -> Result<&'static ChipProfile, UnknownChip> {
    Chip::from_hw_code(hw_code)
        .map(Chip::profile)
        .ok_or(UnknownChip(hw_code))
}
