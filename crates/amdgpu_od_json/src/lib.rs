use libamdgpu_od::{AppAmdgpuOd, AppOdMonitor, AppOption, DevicePath, OverdriveStatus};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

mod output_json;
pub use output_json::OutputJson;

pub fn version_json(title: &str) {
    let version = json!({
        "version": amdgpu_od_version(),
        "title": title,
    });
    println!("{version}");
}

pub fn amdgpu_od_version() -> Value {
    json!({
        "major": env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>().unwrap_or(0),
        "minor": env!("CARGO_PKG_VERSION_MINOR").parse::<u32>().unwrap_or(0),
        "patch": env!("CARGO_PKG_VERSION_PATCH").parse::<u32>().unwrap_or(0),
    })
}

pub trait JsonInfo {
    fn json_info(&self) -> Value;
    fn stat(&self) -> Value;
}

impl JsonInfo for AppAmdgpuOd {
    fn json_info(&self) -> Value {
        json!({
            "DevicePath": self.device_path.json(),
            "ClockVoltageTable": self.table.json(),
        })
    }

    fn stat(&self) -> Value {
        json!({
            "Current GPU Clock": self.stat.sclk.json(),
            "Current MEM Clock": self.stat.mclk.json(),
            "Sensors": self.stat.sensors.json(),
            "Unreadable Sensors": self.stat.sensors.unreadable,
            "gpu_activity": self.stat.activity.json(),
            "OverDrive": self.stat.od_state.json(),
            "Power Cap": self.stat.power_cap.json(),
            "Utilization": self.stat.utilization.json(),
        })
    }
}

/// One snapshot of every device, then exit.
pub fn dump_json(device_path_list: &[DevicePath]) {
    let overdrive = OverdriveStatus::get().json();
    let vec_json_info: Vec<Value> = AppAmdgpuOd::from_device_path_list(device_path_list)
        .iter()
        .map(|app| json!({
            "Info": app.json_info(),
            "Stat": app.stat(),
        }))
        .collect();

    println!("{}", json!({
        "ppfeaturemask": overdrive,
        "devices": vec_json_info,
    }));
}

pub struct JsonApp {
    pub monitors: Vec<AppOdMonitor>,
    pub base_time: Instant,
    pub interval: Duration,
    pub duration_time: Duration,
    pub iterations: u32,
    pub amdgpu_od_version: Value,
    pub title: String,
}

impl JsonApp {
    pub fn new(
        title: &str,
        device_path_list: &[DevicePath],
        opt: &AppOption,
        refresh_period: u64,
        iterations: u32,
    ) -> Self {
        let monitors: Vec<AppOdMonitor> = AppAmdgpuOd::from_device_path_list(device_path_list)
            .into_iter()
            .map(|app| AppOdMonitor::new(app, opt))
            .collect();

        if monitors.is_empty() {
            log::warn!("no device could be initialized");
        }

        let base_time = Instant::now();

        Self {
            monitors,
            base_time,
            interval: Duration::from_millis(refresh_period),
            duration_time: base_time.elapsed(),
            iterations,
            amdgpu_od_version: amdgpu_od_version(),
            title: title.to_string(),
        }
    }

    pub fn update(&mut self) {
        std::thread::sleep(self.interval);

        for monitor in self.monitors.iter_mut() {
            monitor.tick();
        }

        self.duration_time = Instant::now().duration_since(self.base_time);
    }

    pub fn json(&self) -> Value {
        let devices: Vec<Value> = self.monitors
            .iter()
            .map(|m| json!({
                "Info": m.app.json_info(),
                "Stat": m.app.stat(),
                "Signals": m.catalog.json(),
            }))
            .collect();

        json!({
            "period": {
                "duration": self.duration_time.as_millis(),
                "unit": "ms",
            },
            "devices": devices,
            "devices_len": devices.len(),
            "amdgpu_od_version": self.amdgpu_od_version,
            "title": self.title,
        })
    }

    pub fn run(&mut self) {
        let mut n = 0;

        loop {
            self.update();

            let s = self.json().to_string();

            println!("{s}");

            if self.iterations != 0 {
                n += 1;
                if self.iterations == n { break; }
            }
        }
    }
}
