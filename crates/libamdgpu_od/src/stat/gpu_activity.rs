use std::path::PathBuf;
use super::parse_hwmon;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuActivity {
    pub gfx: Option<u16>, // %
    pub umc: Option<u16>, // %
}

impl GpuActivity {
    pub const GPU_BUSY: &'static str = "gpu_busy_percent";
    pub const MEM_BUSY: &'static str = "mem_busy_percent";

    pub fn get_from_sysfs<P: Into<PathBuf>>(sysfs_path: P) -> Self {
        let path = sysfs_path.into();
        let [gfx, umc] = [Self::GPU_BUSY, Self::MEM_BUSY].map(|name| {
            parse_hwmon::<u16, _>(path.join(name))
        });

        Self { gfx, umc }
    }
}
