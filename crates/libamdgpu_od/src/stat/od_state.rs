// ref: https://www.kernel.org/doc/html/latest/gpu/amdgpu/thermal.html#power-dpm-force-performance-level

use std::fmt;
use std::path::PathBuf;
use super::parse_hwmon;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformanceLevel {
    Auto,
    Low,
    High,
    Manual,
    ProfileStandard,
    ProfileMinSclk,
    ProfileMinMclk,
    ProfilePeak,
    Unknown(String),
}

impl From<&str> for PerformanceLevel {
    fn from(s: &str) -> Self {
        match s {
            "auto" => Self::Auto,
            "low" => Self::Low,
            "high" => Self::High,
            "manual" => Self::Manual,
            "profile_standard" => Self::ProfileStandard,
            "profile_min_sclk" => Self::ProfileMinSclk,
            "profile_min_mclk" => Self::ProfileMinMclk,
            "profile_peak" => Self::ProfilePeak,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown(s) => write!(f, "{s}"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// OverDrive percentages and the forced performance level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OdState {
    pub sclk_od: Option<u32>, // %
    pub mclk_od: Option<u32>, // %
    pub performance_level: Option<PerformanceLevel>,
}

impl OdState {
    pub fn get_from_sysfs<P: Into<PathBuf>>(sysfs_path: P) -> Self {
        let path = sysfs_path.into();
        let [sclk_od, mclk_od] = ["pp_sclk_od", "pp_mclk_od"].map(|name| {
            parse_hwmon::<u32, _>(path.join(name))
        });
        let performance_level = std::fs::read_to_string(path.join("power_dpm_force_performance_level"))
            .ok()
            .map(|s| PerformanceLevel::from(s.trim_end()));

        Self { sclk_od, mclk_od, performance_level }
    }

    pub fn is_manual(&self) -> bool {
        self.performance_level == Some(PerformanceLevel::Manual)
    }
}
