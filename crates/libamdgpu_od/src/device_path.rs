use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use std::fs;
use std::fmt;

/// Alternate sysfs root, e.g. a captured copy of `/sys` from another machine.
pub const SYSFS_ENV: &str = "AMDGPU_OD_SYSFS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevicePath {
    pub instance: u32,
    /// `<sysfs>/class/drm/card<N>/device`
    pub sysfs_path: PathBuf,
    /// `<sysfs_path>/hwmon/hwmon<M>`
    pub hwmon_path: PathBuf,
}

impl DevicePath {
    pub fn sysfs_root() -> PathBuf {
        match std::env::var_os(SYSFS_ENV) {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => PathBuf::from("/sys"),
        }
    }

    pub fn new(instance: u32) -> anyhow::Result<Self> {
        Self::new_with_root(Self::sysfs_root(), instance)
    }

    pub fn new_with_root<P: AsRef<Path>>(root: P, instance: u32) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let sysfs_path = root.join(format!("class/drm/card{instance}/device"));

        if !sysfs_path.join("pp_dpm_sclk").exists() {
            return Err(anyhow!(
                "{} is not an AMDGPU device (no pp_dpm_sclk)",
                sysfs_path.display(),
            ));
        }

        let hwmon_path = Self::find_hwmon(root, &sysfs_path)
            .with_context(|| format!("Failed to find hwmon for card{instance}"))?;

        Ok(Self { instance, sysfs_path, hwmon_path })
    }

    /// `hwmon/hwmon*` under the device, else the first hwmon named `amdgpu`.
    fn find_hwmon(root: &Path, sysfs_path: &Path) -> anyhow::Result<PathBuf> {
        let device_hwmon = sysfs_path.join("hwmon");

        if let Ok(dir) = fs::read_dir(&device_hwmon) {
            let mut list: Vec<PathBuf> = dir
                .flatten()
                .filter(|e| e.file_name().to_string_lossy().starts_with("hwmon"))
                .map(|e| e.path())
                .collect();
            list.sort();

            if let Some(path) = list.into_iter().next() {
                return Ok(path);
            }
        }

        let class_hwmon = root.join("class/hwmon");
        let dir = fs::read_dir(&class_hwmon)
            .with_context(|| format!("No hwmon in {} and cannot read {}",
                device_hwmon.display(),
                class_hwmon.display(),
            ))?;
        let mut list: Vec<PathBuf> = dir
            .flatten()
            .map(|e| e.path())
            .filter(|path| {
                fs::read_to_string(path.join("name"))
                    .map(|name| name.trim() == "amdgpu")
                    .unwrap_or(false)
            })
            .collect();
        list.sort();

        let path = list.into_iter().next().ok_or_else(|| anyhow!(
            "No amdgpu hwmon in {} or {}",
            device_hwmon.display(),
            class_hwmon.display(),
        ))?;

        log::warn!(
            "{} has no hwmon directory, using {}",
            sysfs_path.display(),
            path.display(),
        );

        Ok(path)
    }

    pub fn get_device_path_list() -> Vec<Self> {
        Self::get_device_path_list_with_root(Self::sysfs_root())
    }

    pub fn get_device_path_list_with_root<P: AsRef<Path>>(root: P) -> Vec<Self> {
        let root = root.as_ref();
        let drm = root.join("class/drm");
        let Ok(dir) = fs::read_dir(&drm) else {
            log::warn!("Cannot read {}", drm.display());
            return Vec::new();
        };

        let mut instances: Vec<u32> = dir.flatten().filter_map(|e| {
            let name = e.file_name().into_string().ok()?;

            name.strip_prefix("card")?.parse::<u32>().ok()
        }).collect();
        instances.sort_unstable();

        instances.into_iter().filter_map(|instance| {
            match Self::new_with_root(root, instance) {
                Ok(device_path) => Some(device_path),
                Err(e) => {
                    log::debug!("card{instance}: {e:#}");
                    None
                },
            }
        }).collect()
    }

    pub fn has_od_table(&self) -> bool {
        self.sysfs_path.join(crate::od::PP_OD_CLK_VOLTAGE).exists()
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "card{} ({})", self.instance, self.sysfs_path.display())
    }
}
