use std::fmt;
use std::path::Path;
use once_cell::sync::Lazy;
use regex::Regex;

// e.g. "1: 1145Mhz *"
static DPM_CLOCK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):\s*(\d+)(?:Mhz|MHz)\s*(\*)?$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DpmClockType {
    Sclk,
    Mclk,
}

impl DpmClockType {
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Sclk => "pp_dpm_sclk",
            Self::Mclk => "pp_dpm_mclk",
        }
    }
}

impl fmt::Display for DpmClockType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sclk => write!(f, "GPU"),
            Self::Mclk => write!(f, "MEM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpmClockLine {
    pub index: u32,
    pub clock: u32, // MHz
    pub active: bool,
}

impl DpmClockLine {
    pub fn parse(line: &str) -> Option<Self> {
        let cap = DPM_CLOCK_LINE.captures(line.trim())?;
        let index = cap.get(1)?.as_str().parse().ok()?;
        let clock = cap.get(2)?.as_str().parse().ok()?;
        let active = cap.get(3).is_some();

        Some(Self { index, clock, active })
    }

    /// Lines that do not match are skipped.
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.lines().filter_map(|line| {
            let parsed = Self::parse(line);
            if parsed.is_none() && !line.trim().is_empty() {
                log::debug!("skip DPM clock line: {line:?}");
            }

            parsed
        }).collect()
    }
}

/// The currently active DPM level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentClock {
    pub clock: Option<u32>, // MHz
    pub state: Option<u32>,
}

impl CurrentClock {
    pub fn parse(s: &str) -> Self {
        s.lines()
            .filter_map(DpmClockLine::parse)
            .find(|line| line.active)
            .map(|line| Self { clock: Some(line.clock), state: Some(line.index) })
            .unwrap_or_default()
    }

    /// A read failure is a miss, not an error.
    pub fn get_from_sysfs<P: AsRef<Path>>(sysfs_path: P, clk: DpmClockType) -> Self {
        let path = sysfs_path.as_ref().join(clk.file_name());

        match std::fs::read_to_string(&path) {
            Ok(s) => Self::parse(&s),
            Err(e) => {
                log::debug!("Cannot read {}: {e}", path.display());
                Self::default()
            },
        }
    }

    pub fn update<P: AsRef<Path>>(&mut self, sysfs_path: P, clk: DpmClockType) {
        *self = Self::get_from_sysfs(sysfs_path, clk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_clock() {
        let cur = CurrentClock::parse("0: 300Mhz\n1: 1145Mhz *\n");

        assert_eq!(cur, CurrentClock { clock: Some(1145), state: Some(1) });
    }

    #[test]
    fn current_clock_without_active_line() {
        assert_eq!(CurrentClock::parse("0: 300Mhz\n1: 1145Mhz\n"), CurrentClock::default());
        assert_eq!(CurrentClock::parse(""), CurrentClock::default());
    }

    #[test]
    fn current_clock_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cur = CurrentClock::get_from_sysfs(dir.path(), DpmClockType::Mclk);

        assert_eq!(cur, CurrentClock::default());
    }

    #[test]
    fn parse_line() {
        assert_eq!(
            DpmClockLine::parse("2: 2100MHz *"),
            Some(DpmClockLine { index: 2, clock: 2100, active: true }),
        );
        assert_eq!(
            DpmClockLine::parse("0: 96Mhz "),
            Some(DpmClockLine { index: 0, clock: 96, active: false }),
        );
        assert_eq!(DpmClockLine::parse("S: 600Mhz *"), None);
        assert_eq!(DpmClockLine::parse("0: 300Mhz 750mV"), None);
    }
}
