// ref: https://www.kernel.org/doc/html/latest/gpu/amdgpu/thermal.html#pp-od-clk-voltage
// ref: https://www.kernel.org/doc/html/latest/gpu/amdgpu/thermal.html#pp-dpm

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::{OdError, Result};

mod pp_od_clk_voltage;

mod dpm_clock;
pub use dpm_clock::*;

pub const PP_OD_CLK_VOLTAGE: &str = "pp_od_clk_voltage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PState {
    pub clock: u32, // MHz
    pub voltage: Option<u32>, // mV
}

impl PState {
    pub const fn new(clock: u32, voltage: u32) -> Self {
        Self { clock, voltage: Some(voltage) }
    }

    pub const fn clock_only(clock: u32) -> Self {
        Self { clock, voltage: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRange {
    pub min: u32,
    pub max: u32,
}

impl ClockRange {
    pub fn contains(&self, v: u32) -> bool {
        self.min <= v && v <= self.max
    }
}

impl fmt::Display for ClockRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Snapshot of the OverDrive P-state table, or of the plain DPM clock lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockVoltageTable {
    pub supports_table: bool,
    pub gpu_states: Vec<PState>,
    pub mem_states: Vec<PState>,
    pub gpu_clock_range: Option<ClockRange>, // MHz
    pub mem_clock_range: Option<ClockRange>, // MHz
    pub voltage_range: Option<ClockRange>, // mV
    /// `OD_RANGE` rows other than SCLK, MCLK and VDDC.
    pub extra_ranges: BTreeMap<String, ClockRange>,
}

impl ClockVoltageTable {
    /// Reads `pp_od_clk_voltage`, then falls back to `pp_dpm_sclk` and `pp_dpm_mclk`.
    pub fn from_sysfs<P: Into<PathBuf>>(sysfs_path: P) -> Result<Self> {
        let sysfs_path = sysfs_path.into();
        let od_path = sysfs_path.join(PP_OD_CLK_VOLTAGE);
        let mut unreadable = Vec::new();

        match std::fs::read_to_string(&od_path) {
            Ok(s) => match Self::parse_pp_od_clk_voltage(&s) {
                Ok(table) => return Ok(table),
                Err(e) => log::warn!(
                    "{}: {e}, trying {} and {}",
                    od_path.display(),
                    DpmClockType::Sclk.file_name(),
                    DpmClockType::Mclk.file_name(),
                ),
            },
            Err(e) => {
                log::info!(
                    "Cannot read {} ({e}), trying {} and {}",
                    od_path.display(),
                    DpmClockType::Sclk.file_name(),
                    DpmClockType::Mclk.file_name(),
                );
                unreadable.push(od_path);
            },
        }

        Self::from_dpm_clock(&sysfs_path, unreadable)
    }

    fn from_dpm_clock(sysfs_path: &Path, mut unreadable: Vec<PathBuf>) -> Result<Self> {
        let [sclk, mclk] = [DpmClockType::Sclk, DpmClockType::Mclk].map(|clk| {
            let path = sysfs_path.join(clk.file_name());

            match std::fs::read_to_string(&path) {
                Ok(s) => Some(s),
                Err(e) => {
                    log::warn!("Cannot read {}: {e}", path.display());
                    unreadable.push(path);
                    None
                },
            }
        });

        let (Some(sclk), Some(mclk)) = (sclk, mclk) else {
            return Err(OdError::NoClockData { files: unreadable });
        };

        Self::parse_dpm_clock_list(&sclk, &mclk).ok_or_else(|| {
            unreadable.extend([DpmClockType::Sclk, DpmClockType::Mclk].map(|clk| {
                sysfs_path.join(clk.file_name())
            }));

            OdError::NoClockData { files: unreadable }
        })
    }

    /// Clocks only, from the contents of `pp_dpm_sclk` and `pp_dpm_mclk`.
    /// Lines that do not match are skipped, `None` if both lists come out empty.
    pub fn parse_dpm_clock_list(sclk: &str, mclk: &str) -> Option<Self> {
        let [gpu_states, mem_states] = [sclk, mclk].map(|s| {
            DpmClockLine::parse_list(s)
                .into_iter()
                .map(|line| PState::clock_only(line.clock))
                .collect::<Vec<PState>>()
        });

        if gpu_states.is_empty() && mem_states.is_empty() {
            return None;
        }

        Some(Self {
            supports_table: false,
            gpu_states,
            mem_states,
            ..Default::default()
        })
    }

    pub fn states(&self, clk: DpmClockType) -> &[PState] {
        match clk {
            DpmClockType::Sclk => &self.gpu_states,
            DpmClockType::Mclk => &self.mem_states,
        }
    }

    pub fn min_clock(&self, clk: DpmClockType) -> Option<u32> {
        self.states(clk).first().map(|s| s.clock)
    }

    /// Highest defined P-state clock.
    pub fn max_clock(&self, clk: DpmClockType) -> Option<u32> {
        self.states(clk).last().map(|s| s.clock)
    }

    pub fn total_values(&self) -> usize {
        let ranges = [self.gpu_clock_range, self.mem_clock_range, self.voltage_range]
            .iter()
            .filter(|r| r.is_some())
            .count() + self.extra_ranges.len();

        self.gpu_states.len() + self.mem_states.len() + ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const POLARIS_OD: &str = "\
OD_SCLK:
0:        300MHz        750mV
1:        600MHz        769mV
2:        900MHz        887mV
OD_MCLK:
0:        300MHz        750mV
1:       2000MHz        800mV
OD_RANGE:
SCLK:     300MHz       2000MHz
MCLK:     300MHz       2250MHz
VDDC:     750mV        1150mV
";

    #[test]
    fn from_sysfs_with_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PP_OD_CLK_VOLTAGE), POLARIS_OD).unwrap();

        let table = ClockVoltageTable::from_sysfs(dir.path()).unwrap();

        assert!(table.supports_table);
        assert_eq!(table.max_clock(DpmClockType::Sclk), Some(900));
        assert_eq!(table.max_clock(DpmClockType::Mclk), Some(2000));
        assert_eq!(table.mem_clock_range, Some(ClockRange { min: 300, max: 2250 }));
    }

    #[test]
    fn fallback_when_table_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pp_dpm_sclk"), "0: 300Mhz\n1: 1145Mhz *\n").unwrap();
        fs::write(dir.path().join("pp_dpm_mclk"), "0: 150Mhz *\n").unwrap();

        let table = ClockVoltageTable::from_sysfs(dir.path()).unwrap();

        assert!(!table.supports_table);
        assert_eq!(table.gpu_states, vec![PState::clock_only(300), PState::clock_only(1145)]);
        assert_eq!(table.mem_states, vec![PState::clock_only(150)]);
        assert!(table.gpu_clock_range.is_none());
        assert!(table.voltage_range.is_none());
    }

    #[test]
    fn fallback_when_table_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        // Navi1x style, clocks without voltage
        fs::write(dir.path().join(PP_OD_CLK_VOLTAGE), "OD_SCLK:\n0: 800Mhz\n1: 2100Mhz\n").unwrap();
        fs::write(dir.path().join("pp_dpm_sclk"), "0: 800Mhz\n1: 1900Mhz *\n2: 2100Mhz\n").unwrap();
        fs::write(dir.path().join("pp_dpm_mclk"), "0: 100Mhz\n1: 875Mhz *\n").unwrap();

        let table = ClockVoltageTable::from_sysfs(dir.path()).unwrap();

        assert!(!table.supports_table);
        assert_eq!(table.gpu_states.len(), 3);
        assert!(table.gpu_states.iter().all(|s| s.voltage.is_none()));
    }

    #[test]
    fn no_clock_data_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pp_dpm_sclk"), "0: 300Mhz *\n").unwrap();

        let err = ClockVoltageTable::from_sysfs(dir.path()).unwrap_err();
        let OdError::NoClockData { files } = &err else { panic!("{err}") };

        assert!(files.contains(&dir.path().join(PP_OD_CLK_VOLTAGE)));
        assert!(files.contains(&dir.path().join("pp_dpm_mclk")));
        assert!(!files.contains(&dir.path().join("pp_dpm_sclk")));
    }

    #[test]
    fn empty_fallback_lists_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pp_dpm_sclk"), "").unwrap();
        fs::write(dir.path().join("pp_dpm_mclk"), "garbage\n").unwrap();

        assert!(matches!(
            ClockVoltageTable::from_sysfs(dir.path()),
            Err(OdError::NoClockData { .. }),
        ));
    }

    #[test]
    fn fallback_skips_bad_lines() {
        let table = ClockVoltageTable::parse_dpm_clock_list(
            "0: 300Mhz\nS: 600Mhz\n1: 1200Mhz *\n",
            "",
        ).unwrap();

        assert!(!table.supports_table);
        assert_eq!(table.gpu_states, vec![PState::clock_only(300), PState::clock_only(1200)]);
        assert!(table.mem_states.is_empty());
        assert_eq!(table.max_clock(DpmClockType::Mclk), None);
    }
}
