use anyhow::Context;
use crate::{DevicePath, KernelVersion};
use crate::od::{ClockVoltageTable, CurrentClock, DpmClockType};
use crate::signal::{CatalogConfig, GpuSnapshot, SignalCatalog, Utilization};
use crate::stat::{GpuActivity, OdState, PowerCap, SensorTree};

/// Everything read from one GPU; the clock table and the tree shape are fixed at creation.
pub struct AppAmdgpuOd {
    pub device_path: DevicePath,
    pub table: ClockVoltageTable,
    pub stat: AppAmdgpuOdStat,
}

#[derive(Clone, Debug)]
pub struct AppAmdgpuOdStat {
    pub sensors: SensorTree,
    pub sclk: CurrentClock,
    pub mclk: CurrentClock,
    pub activity: GpuActivity,
    pub od_state: OdState,
    pub power_cap: Option<PowerCap>,
    pub utilization: Utilization,
}

#[derive(Clone, Debug)]
pub struct AppOption {
    pub max_points: usize,
    pub precision: usize,
    pub kernel: Option<KernelVersion>,
}

impl Default for AppOption {
    fn default() -> Self {
        let catalog = CatalogConfig::default();

        Self {
            max_points: catalog.max_points,
            precision: catalog.precision,
            kernel: None,
        }
    }
}

impl AppOption {
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            max_points: self.max_points,
            precision: self.precision,
            kernel: self.kernel,
            ..Default::default()
        }
    }
}

impl AppAmdgpuOd {
    /// Fails when neither the OverDrive table nor the DPM clock lists can be read,
    /// or when the hwmon directory is missing.
    pub fn new(device_path: DevicePath) -> anyhow::Result<Self> {
        let sysfs_path = &device_path.sysfs_path;
        let table = ClockVoltageTable::from_sysfs(sysfs_path)
            .with_context(|| format!("No usable clock data for {device_path}"))?;
        let sensors = SensorTree::from_hwmon_path(&device_path.hwmon_path)
            .with_context(|| format!("Failed to read hwmon for {device_path}"))?;

        if !table.supports_table {
            log::info!("{device_path}: OverDrive table is not available, clocks only");
        }

        let power_cap = PowerCap::from_sensor_tree(&sensors);
        let mut app = Self {
            table,
            stat: AppAmdgpuOdStat {
                sensors,
                sclk: CurrentClock::get_from_sysfs(sysfs_path, DpmClockType::Sclk),
                mclk: CurrentClock::get_from_sysfs(sysfs_path, DpmClockType::Mclk),
                activity: GpuActivity::get_from_sysfs(sysfs_path),
                od_state: OdState::get_from_sysfs(sysfs_path),
                power_cap,
                utilization: Utilization::default(),
            },
            device_path,
        };
        app.stat.utilization = Utilization::from_snapshot(&app);

        Ok(app)
    }

    /// Devices that fail to initialize are logged and left out.
    pub fn from_device_path_list(device_path_list: &[DevicePath]) -> Vec<Self> {
        device_path_list.iter().filter_map(|device_path| {
            match Self::new(device_path.clone()) {
                Ok(app) => Some(app),
                Err(e) => {
                    log::error!("{e:#}");
                    None
                },
            }
        }).collect()
    }

    /// One refresh: current clocks, then every hwmon leaf, then the values derived from them.
    pub fn update(&mut self) {
        let sysfs_path = &self.device_path.sysfs_path;

        self.stat.sclk.update(sysfs_path, DpmClockType::Sclk);
        self.stat.mclk.update(sysfs_path, DpmClockType::Mclk);
        self.stat.sensors.refresh();
        self.stat.activity = GpuActivity::get_from_sysfs(sysfs_path);
        self.stat.od_state = OdState::get_from_sysfs(sysfs_path);
        self.stat.power_cap = PowerCap::from_sensor_tree(&self.stat.sensors);
        self.stat.utilization = Utilization::from_snapshot(self);
    }
}

impl GpuSnapshot for AppAmdgpuOd {
    fn clock_table(&self) -> &ClockVoltageTable {
        &self.table
    }

    fn sensor_tree(&self) -> &SensorTree {
        &self.stat.sensors
    }

    fn current_clock(&self, clk: DpmClockType) -> CurrentClock {
        match clk {
            DpmClockType::Sclk => self.stat.sclk,
            DpmClockType::Mclk => self.stat.mclk,
        }
    }

    fn gpu_busy(&self) -> Option<u16> {
        self.stat.activity.gfx
    }
}

/// A GPU and its signals, refreshed together.
/// Switching GPUs means dropping this and creating a new one.
pub struct AppOdMonitor {
    pub app: AppAmdgpuOd,
    pub catalog: SignalCatalog,
}

impl AppOdMonitor {
    pub fn new(app: AppAmdgpuOd, opt: &AppOption) -> Self {
        let catalog = SignalCatalog::new(&app, &opt.catalog_config());

        Self { app, catalog }
    }

    pub fn tick(&mut self) {
        self.app.update();
        self.catalog.sample(&self.app);
    }
}
