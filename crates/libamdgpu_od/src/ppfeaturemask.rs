// ref: drivers/gpu/drm/amd/include/amd_shared.h

use std::fmt;
use std::path::Path;

pub const PPFEATUREMASK_PATH: &str = "/sys/module/amdgpu/parameters/ppfeaturemask";

#[allow(non_snake_case)]
mod MaskValue {
    pub const PP_SCLK_DPM_MASK: u32 = 0x1;
    pub const PP_MCLK_DPM_MASK: u32 = 0x2;
    pub const PP_PCIE_DPM_MASK: u32 = 0x4;
    pub const PP_SCLK_DEEP_SLEEP_MASK: u32 = 0x8;
    pub const PP_POWER_CONTAINMENT_MASK: u32 = 0x10;
    pub const PP_UVD_HANDSHAKE_MASK: u32 = 0x20;
    pub const PP_SMC_VOLTAGE_CONTROL_MASK: u32 = 0x40;
    pub const PP_VBI_TIME_SUPPORT_MASK: u32 = 0x80;
    pub const PP_ULV_MASK: u32 = 0x100;
    pub const PP_ENABLE_GFX_CG_THRU_SMU: u32 = 0x200;
    pub const PP_CLOCK_STRETCH_MASK: u32 = 0x400;
    pub const PP_OD_FUZZY_FAN_CONTROL_MASK: u32 = 0x800;
    pub const PP_SOCCLK_DPM_MASK: u32 = 0x1000;
    pub const PP_DCEFCLK_DPM_MASK: u32 = 0x2000;
    pub const PP_OVERDRIVE_MASK: u32 = 0x4000;
    pub const PP_GFXOFF_MASK: u32 = 0x8000;
    pub const PP_ACG_MASK: u32 = 0x10000;
    pub const PP_STUTTER_MODE: u32 = 0x20000;
    pub const PP_AVFS_MASK: u32 = 0x40000;
    pub const PP_GFX_DCS_MASK: u32 = 0x80000;
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PpFeatureMask {
    PP_SCLK_DPM_MASK = MaskValue::PP_SCLK_DPM_MASK,
    PP_MCLK_DPM_MASK = MaskValue::PP_MCLK_DPM_MASK,
    PP_PCIE_DPM_MASK = MaskValue::PP_PCIE_DPM_MASK,
    PP_SCLK_DEEP_SLEEP_MASK = MaskValue::PP_SCLK_DEEP_SLEEP_MASK,
    PP_POWER_CONTAINMENT_MASK = MaskValue::PP_POWER_CONTAINMENT_MASK,
    PP_UVD_HANDSHAKE_MASK = MaskValue::PP_UVD_HANDSHAKE_MASK,
    PP_SMC_VOLTAGE_CONTROL_MASK = MaskValue::PP_SMC_VOLTAGE_CONTROL_MASK,
    PP_VBI_TIME_SUPPORT_MASK = MaskValue::PP_VBI_TIME_SUPPORT_MASK,
    PP_ULV_MASK = MaskValue::PP_ULV_MASK,
    PP_ENABLE_GFX_CG_THRU_SMU = MaskValue::PP_ENABLE_GFX_CG_THRU_SMU,
    PP_CLOCK_STRETCH_MASK = MaskValue::PP_CLOCK_STRETCH_MASK,
    PP_OD_FUZZY_FAN_CONTROL_MASK = MaskValue::PP_OD_FUZZY_FAN_CONTROL_MASK,
    PP_SOCCLK_DPM_MASK = MaskValue::PP_SOCCLK_DPM_MASK,
    PP_DCEFCLK_DPM_MASK = MaskValue::PP_DCEFCLK_DPM_MASK,
    PP_OVERDRIVE_MASK = MaskValue::PP_OVERDRIVE_MASK, // disabled by default
    PP_GFXOFF_MASK = MaskValue::PP_GFXOFF_MASK,
    PP_ACG_MASK = MaskValue::PP_ACG_MASK,
    PP_STUTTER_MODE = MaskValue::PP_STUTTER_MODE,
    PP_AVFS_MASK = MaskValue::PP_AVFS_MASK,
    PP_GFX_DCS_MASK = MaskValue::PP_GFX_DCS_MASK, // disabled by default
}

#[derive(Debug, Clone)]
pub struct UnknownMaskValue;

impl TryFrom<u32> for PpFeatureMask {
    type Error = UnknownMaskValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let v = match value {
            MaskValue::PP_SCLK_DPM_MASK => Self::PP_SCLK_DPM_MASK,
            MaskValue::PP_MCLK_DPM_MASK => Self::PP_MCLK_DPM_MASK,
            MaskValue::PP_PCIE_DPM_MASK => Self::PP_PCIE_DPM_MASK,
            MaskValue::PP_SCLK_DEEP_SLEEP_MASK => Self::PP_SCLK_DEEP_SLEEP_MASK,
            MaskValue::PP_POWER_CONTAINMENT_MASK => Self::PP_POWER_CONTAINMENT_MASK,
            MaskValue::PP_UVD_HANDSHAKE_MASK => Self::PP_UVD_HANDSHAKE_MASK,
            MaskValue::PP_SMC_VOLTAGE_CONTROL_MASK => Self::PP_SMC_VOLTAGE_CONTROL_MASK,
            MaskValue::PP_VBI_TIME_SUPPORT_MASK => Self::PP_VBI_TIME_SUPPORT_MASK,
            MaskValue::PP_ULV_MASK => Self::PP_ULV_MASK,
            MaskValue::PP_ENABLE_GFX_CG_THRU_SMU => Self::PP_ENABLE_GFX_CG_THRU_SMU,
            MaskValue::PP_CLOCK_STRETCH_MASK => Self::PP_CLOCK_STRETCH_MASK,
            MaskValue::PP_OD_FUZZY_FAN_CONTROL_MASK => Self::PP_OD_FUZZY_FAN_CONTROL_MASK,
            MaskValue::PP_SOCCLK_DPM_MASK => Self::PP_SOCCLK_DPM_MASK,
            MaskValue::PP_DCEFCLK_DPM_MASK => Self::PP_DCEFCLK_DPM_MASK,
            MaskValue::PP_OVERDRIVE_MASK => Self::PP_OVERDRIVE_MASK,
            MaskValue::PP_GFXOFF_MASK => Self::PP_GFXOFF_MASK,
            MaskValue::PP_ACG_MASK => Self::PP_ACG_MASK,
            MaskValue::PP_STUTTER_MODE => Self::PP_STUTTER_MODE,
            MaskValue::PP_AVFS_MASK => Self::PP_AVFS_MASK,
            MaskValue::PP_GFX_DCS_MASK => Self::PP_GFX_DCS_MASK,
            _ => return Err(UnknownMaskValue),
        };

        Ok(v)
    }
}

impl fmt::Display for PpFeatureMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl PpFeatureMask {
    /// `0xfff7bfff` (hexint), or `4294426623` on kernels exposing the parameter as uint.
    pub fn parse_param(s: &str) -> Option<u32> {
        let s = s.trim();

        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => s.parse::<u32>().ok(),
        }
    }

    pub fn get_param_u32_from_path<P: AsRef<Path>>(path: P) -> Option<u32> {
        let s = std::fs::read_to_string(path).ok()?;

        Self::parse_param(&s)
    }

    pub fn get_param_u32() -> Option<u32> {
        Self::get_param_u32_from_path(PPFEATUREMASK_PATH)
    }

    pub fn enabled_features(mut n: u32) -> Vec<Self> {
        let mut vec: Vec<Self> = Vec::with_capacity(32);
        let mut i = 0;

        while n != 0 {
            if (n & 0b1) == 1 && let Ok(ftr) = PpFeatureMask::try_from(1 << i) {
                vec.push(ftr);
            }
            n >>= 0b1;
            i += 1;
        }

        vec
    }

    pub fn get_all_enabled_feature() -> Vec<Self> {
        Self::get_param_u32().map(Self::enabled_features).unwrap_or_default()
    }
}

/// Whether the kernel exposes writable OverDrive tables, from `ppfeaturemask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverdriveStatus {
    Enabled { mask: u32 },
    Disabled { mask: u32 },
    /// The parameter could not be read, OverDrive is assumed to be enabled.
    Unknown,
}

impl OverdriveStatus {
    pub fn from_mask(mask: u32) -> Self {
        if mask & MaskValue::PP_OVERDRIVE_MASK != 0 {
            Self::Enabled { mask }
        } else {
            Self::Disabled { mask }
        }
    }

    pub fn get_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match PpFeatureMask::get_param_u32_from_path(path) {
            Some(mask) => Self::from_mask(mask),
            None => {
                log::info!("Cannot read {}, assuming OverDrive is enabled", path.display());
                Self::Unknown
            },
        }
    }

    pub fn get() -> Self {
        Self::get_from_path(PPFEATUREMASK_PATH)
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled { .. })
    }

    /// The mask to pass as `amdgpu.ppfeaturemask=` to enable OverDrive.
    pub fn suggested_mask(&self) -> Option<u32> {
        match self {
            Self::Disabled { mask } => Some(mask | MaskValue::PP_OVERDRIVE_MASK),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_param() {
        assert_eq!(PpFeatureMask::parse_param("0xfff7bfff\n"), Some(0xfff7bfff));
        assert_eq!(PpFeatureMask::parse_param("16384\n"), Some(0x4000));
        assert_eq!(PpFeatureMask::parse_param("4294688767\n"), Some(0xfffbbfff));
        assert_eq!(PpFeatureMask::parse_param("fffd7fff"), None);
        assert_eq!(PpFeatureMask::parse_param("overdrive"), None);
    }

    #[test]
    fn enabled_features() {
        let ftrs = PpFeatureMask::enabled_features(0x4003);

        assert_eq!(ftrs, vec![
            PpFeatureMask::PP_SCLK_DPM_MASK,
            PpFeatureMask::PP_MCLK_DPM_MASK,
            PpFeatureMask::PP_OVERDRIVE_MASK,
        ]);
        // bits above PP_GFX_DCS_MASK are not named
        assert!(PpFeatureMask::enabled_features(0x100000).is_empty());
    }

    #[test]
    fn overdrive_disabled_by_default_mask() {
        let status = OverdriveStatus::from_mask(0xfff7bfff);

        assert!(!status.is_enabled());
        assert_eq!(status.suggested_mask(), Some(0xfff7ffff));
    }

    #[test]
    fn overdrive_enabled() {
        let status = OverdriveStatus::from_mask(0xffffffff);

        assert!(status.is_enabled());
        assert_eq!(status.suggested_mask(), None);
    }

    #[test]
    fn unreadable_mask_is_assumed_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let status = OverdriveStatus::get_from_path(dir.path().join("ppfeaturemask"));

        assert_eq!(status, OverdriveStatus::Unknown);
        assert!(status.is_enabled());
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ppfeaturemask");
        std::fs::write(&path, "0xfffd7fff\n").unwrap();

        assert!(OverdriveStatus::get_from_path(&path).is_enabled());
    }

    #[test]
    fn decimal_mask_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ppfeaturemask");
        std::fs::write(&path, "4294688767\n").unwrap();

        let status = OverdriveStatus::get_from_path(&path);

        assert_eq!(status, OverdriveStatus::Disabled { mask: 0xfffbbfff });
        assert_eq!(status.suggested_mask(), Some(0xfffbffff));
    }
}
