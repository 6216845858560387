use libamdgpu_od::{DevicePath, OverdriveStatus};
use libamdgpu_od::od::{ClockRange, ClockVoltageTable, CurrentClock, PState};
use libamdgpu_od::signal::{Signal, SignalCatalog, Utilization};
use libamdgpu_od::stat::{GpuActivity, OdState, PowerCap, SensorTree, SensorValue};
use serde_json::{json, Map, Value};

pub trait OutputJson {
    fn json(&self) -> Value;
}

impl<T: OutputJson> OutputJson for Option<T> {
    fn json(&self) -> Value {
        self.as_ref().map_or(Value::Null, |v| v.json())
    }
}

impl OutputJson for DevicePath {
    fn json(&self) -> Value {
        json!({
            "card": self.instance,
            "sysfs": self.sysfs_path.display().to_string(),
            "hwmon": self.hwmon_path.display().to_string(),
        })
    }
}

impl OutputJson for ClockRange {
    fn json(&self) -> Value {
        json!({
            "min": self.min,
            "max": self.max,
        })
    }
}

impl OutputJson for PState {
    fn json(&self) -> Value {
        json!({
            "clock": { "value": self.clock, "unit": "MHz" },
            "voltage": self.voltage.map(|v| json!({ "value": v, "unit": "mV" })),
        })
    }
}

impl OutputJson for ClockVoltageTable {
    fn json(&self) -> Value {
        let [gpu_states, mem_states] = [&self.gpu_states, &self.mem_states].map(|states| {
            Value::Array(states.iter().map(|s| s.json()).collect())
        });
        let mut ranges = Map::new();

        for (label, range) in [
            ("SCLK", self.gpu_clock_range),
            ("MCLK", self.mem_clock_range),
            ("VDDC", self.voltage_range),
        ] {
            ranges.insert(label.to_string(), range.json());
        }

        for (label, range) in &self.extra_ranges {
            ranges.insert(label.clone(), range.json());
        }

        json!({
            "supports_table": self.supports_table,
            "GPU": gpu_states,
            "MEM": mem_states,
            "Range": ranges,
        })
    }
}

impl OutputJson for CurrentClock {
    fn json(&self) -> Value {
        json!({
            "clock": self.clock,
            "state": self.state,
            "unit": "MHz",
        })
    }
}

/// Flat `file name -> value`, absent values as `null`.
impl OutputJson for SensorTree {
    fn json(&self) -> Value {
        let mut m = Map::new();

        for (key, leaf) in self.leaves() {
            let val = match &leaf.value {
                Some(SensorValue::Int(v)) => json!(v),
                Some(SensorValue::Str(s)) => json!(s),
                None => Value::Null,
            };

            m.insert(key.to_string(), val);
        }

        m.into()
    }
}

impl OutputJson for PowerCap {
    fn json(&self) -> Value {
        json!({
            "current": self.current,
            "min": self.min,
            "max": self.max,
            "default": self.default,
            "unit": "W",
        })
    }
}

impl OutputJson for GpuActivity {
    fn json(&self) -> Value {
        let mut m = Map::new();

        for (label, usage) in [
            ("GFX", self.gfx),
            ("Memory", self.umc),
        ] {
            m.insert(
                label.to_string(),
                json!({
                    "value": usage,
                    "unit": "%",
                }),
            );
        }

        m.into()
    }
}

impl OutputJson for OdState {
    fn json(&self) -> Value {
        json!({
            "pp_sclk_od": self.sclk_od,
            "pp_mclk_od": self.mclk_od,
            "performance_level": self.performance_level.as_ref().map(|v| v.to_string()),
        })
    }
}

impl OutputJson for Utilization {
    fn json(&self) -> Value {
        json!({
            "GPU Clock": self.gpu_clock,
            "MEM Clock": self.mem_clock,
            "Fan": self.fan,
            "Temperature": self.temperature,
        })
    }
}

impl OutputJson for OverdriveStatus {
    fn json(&self) -> Value {
        match self {
            Self::Enabled { mask } | Self::Disabled { mask } => json!({
                "enabled": self.is_enabled(),
                "ppfeaturemask": format!("{mask:#x}"),
                "suggested": self.suggested_mask().map(|v| format!("{v:#x}")),
            }),
            Self::Unknown => json!({
                "enabled": Value::Null,
                "ppfeaturemask": Value::Null,
                "suggested": Value::Null,
            }),
        }
    }
}

pub(crate) fn signal_json(signal: &Signal, precision: usize) -> Value {
    let stats = signal.stats(precision);

    json!({
        "unit": signal.si_unit(),
        "enabled": signal.enabled,
        "normalize": signal.normalize,
        "color": signal.color,
        "source": signal.source.to_string(),
        "declared": {
            "min": signal.declared_range_si().0,
            "max": signal.declared_range_si().1,
        },
        "current": stats.current,
        "min": stats.min,
        "max": stats.max,
        "mean": stats.mean,
        "samples": signal.samples_si(),
        "normalized": signal.normalized(),
    })
}

impl OutputJson for SignalCatalog {
    fn json(&self) -> Value {
        let mut m = Map::new();

        for s in &self.signals {
            m.insert(s.name.clone(), signal_json(s, self.precision));
        }

        m.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_json() {
        let table = ClockVoltageTable::parse_pp_od_clk_voltage(
            "OD_SCLK:\n0: 300Mhz 750mV\nOD_MCLK:\n0: 150Mhz 750mV\nOD_RANGE:\nSCLK: 300Mhz 2000Mhz\n",
        ).unwrap();
        let v = table.json();

        assert_eq!(v["supports_table"], json!(true));
        assert_eq!(v["GPU"][0]["clock"]["value"], json!(300));
        assert_eq!(v["GPU"][0]["voltage"]["value"], json!(750));
        assert_eq!(v["Range"]["SCLK"], json!({ "min": 300, "max": 2000 }));
        assert_eq!(v["Range"]["VDDC"], Value::Null);
    }

    #[test]
    fn clock_only_state() {
        assert_eq!(PState::clock_only(800).json()["voltage"], Value::Null);
    }

    #[test]
    fn sensor_tree_json_keeps_raw_values() {
        let dir = tempfile::tempdir().unwrap();
        for (name, val) in [("temp1_input", "45000"), ("temp1_label", "edge"), ("fan1_input", "0")] {
            std::fs::write(dir.path().join(name), format!("{val}\n")).unwrap();
        }
        let mut tree = SensorTree::from_hwmon_path(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join("fan1_input")).unwrap();
        tree.refresh();

        let v = tree.json();

        assert_eq!(v["temp1_input"], json!(45000));
        assert!(v["temp1_input"].is_i64());
        assert_eq!(v["temp1_label"], json!("edge"));
        assert_eq!(v["fan1_input"], Value::Null);
    }

    #[test]
    fn overdrive_json() {
        let v = OverdriveStatus::from_mask(0xfff7bfff).json();

        assert_eq!(v["enabled"], json!(false));
        assert_eq!(v["suggested"], json!("0xfff7ffff"));
    }
}
