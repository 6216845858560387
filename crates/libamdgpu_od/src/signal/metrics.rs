use super::{GpuSnapshot, History};
use crate::od::DpmClockType;
use crate::stat::{Attribute, SensorKey, Subsystem};

/// 8-bit duty cycle, when `pwm1_max` is not exposed.
const PWM_MAX: f64 = 255.0;

// ref: https://en.wikipedia.org/wiki/Metric_prefix
/// Strips the metric prefix at the second character of `unit` (`[mV]` -> `[V]`)
/// and scales `value` to match.
/// `MHz` and `GHz` are display units and pass through unscaled.
pub fn convert_to_si(unit: &str, value: f64) -> (String, f64) {
    let mut chars = unit.chars();
    let (Some(first), Some(prefix)) = (chars.next(), chars.next()) else {
        return (unit.to_string(), value);
    };
    let strip = || -> String {
        let mut s = String::with_capacity(unit.len());
        s.push(first);
        s.push_str(chars.as_str());
        s
    };

    match prefix {
        'µ' | 'μ' => (strip(), value / 1_000_000.0),
        'm' => (strip(), value / 1_000.0),
        'c' => (strip(), value / 100.0),
        'd' => (strip(), value / 10.0),
        'k' => (strip(), value * 1_000.0),
        'M' if unit.contains("MHz") => (unit.to_string(), value),
        'M' => (strip(), value * 1_000_000.0),
        'G' if unit.contains("GHz") => (unit.to_string(), value),
        'G' => (strip(), value * 1_000_000_000.0),
        _ => (unit.to_string(), value),
    }
}

pub fn round(value: f64, precision: usize) -> f64 {
    let p = 10f64.powi(precision.min(15) as i32);

    (value * p).round() / p
}

/// `num / den`, or `0.0` when the denominator is zero or the result is not finite.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        return 0.0;
    }

    let r = num / den;

    if r.is_finite() { r } else { 0.0 }
}

/// Like [`ratio`], with an absent operand reported as zero utilization.
pub fn utilization(value: Option<f64>, max: Option<f64>) -> f64 {
    match (value, max) {
        (Some(v), Some(max)) => ratio(v, max),
        _ => 0.0,
    }
}

/// Rescales into [0, 1] against the declared range, or against the observed
/// range when the declared one has zero width.
/// A constant series with no declared width becomes all zeros.
pub fn normalize(samples: &[Option<f64>], declared_min: f64, declared_max: f64) -> Vec<Option<f64>> {
    let (min, max) = if declared_max - declared_min != 0.0 {
        (declared_min, declared_max)
    } else {
        let mut values = samples.iter().filter_map(|v| *v);
        let Some(first) = values.next() else {
            return samples.to_vec();
        };

        values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)))
    };
    let width = max - min;

    samples.iter().map(|v| v.map(|v| ratio(v - min, width))).collect()
}

/// Summary of a [`History`] in SI units; `None` means no value was read yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub current: Option<f64>,
}

impl SignalStats {
    pub fn from_history(history: &History, unit: &str, precision: usize) -> Self {
        let to_si = |v: f64| convert_to_si(unit, v).1;
        let mut count = 0usize;
        let mut sum = 0f64;
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;

        for v in history.values() {
            count += 1;
            sum += v;
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
        }

        let mean = if count == 0 {
            None
        } else {
            Some(round(to_si(sum / count as f64), precision))
        };

        Self {
            min: min.map(to_si),
            max: max.map(to_si),
            mean,
            current: history.latest().map(to_si),
        }
    }
}

/// Fractions in [0, 1] of the current value against its ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Utilization {
    /// current clock / highest P-state clock
    pub gpu_clock: f64,
    pub mem_clock: f64,
    /// PWM duty / `pwm1_max` (or 255)
    pub fan: f64,
    /// `temp1_input` / `temp1_crit`
    pub temperature: f64,
}

impl Utilization {
    pub fn from_snapshot<S: GpuSnapshot + ?Sized>(gpu: &S) -> Self {
        let [gpu_clock, mem_clock] = [DpmClockType::Sclk, DpmClockType::Mclk].map(|clk| {
            utilization(
                gpu.current_clock(clk).clock.map(|v| v as f64),
                gpu.clock_table().max_clock(clk).map(|v| v as f64),
            )
        });

        let tree = gpu.sensor_tree();
        let pwm1 = tree.node(&Subsystem::Pwm, 1);
        let fan = utilization(
            pwm1.and_then(|n| n.leaf.as_ref()).and_then(|l| l.as_f64()),
            Some(pwm1.and_then(|n| n.attribute_f64(&Attribute::Max)).unwrap_or(PWM_MAX)),
        );

        let [temp, crit] = [Attribute::Input, Attribute::Crit].map(|attr| {
            tree.get_f64(&SensorKey::new(Subsystem::Temp, 1, Some(attr)))
        });
        let temperature = utilization(temp, crit);

        Self { gpu_clock, mem_clock, fan, temperature }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::catalog::tests::FakeGpu;
    use crate::od::CurrentClock;
    use crate::stat::sensor_tree::tests::write_hwmon;

    #[test]
    fn si_prefixes() {
        assert_eq!(convert_to_si("[m°C]", 45000.0), ("[°C]".to_string(), 45.0));
        assert_eq!(convert_to_si("[µW]", 35_000_000.0), ("[W]".to_string(), 35.0));
        assert_eq!(convert_to_si("[mV]", 1150.0), ("[V]".to_string(), 1.15));
        assert_eq!(convert_to_si("[kW]", 2.0), ("[W]".to_string(), 2000.0));
        assert_eq!(convert_to_si("[cm]", 250.0), ("[m]".to_string(), 2.5));
        assert_eq!(convert_to_si("[dB]", 30.0), ("[B]".to_string(), 3.0));
        assert_eq!(convert_to_si("[MW]", 1.0), ("[W]".to_string(), 1_000_000.0));
        assert_eq!(convert_to_si("[GW]", 1.0), ("[W]".to_string(), 1_000_000_000.0));
    }

    #[test]
    fn mhz_and_ghz_pass_through() {
        assert_eq!(convert_to_si("[MHz]", 1145.0), ("[MHz]".to_string(), 1145.0));
        assert_eq!(convert_to_si("[GHz]", 1.5), ("[GHz]".to_string(), 1.5));
    }

    #[test]
    fn no_prefix() {
        assert_eq!(convert_to_si("[RPM]", 1200.0), ("[RPM]".to_string(), 1200.0));
        assert_eq!(convert_to_si("[-]", 2.0), ("[-]".to_string(), 2.0));
        assert_eq!(convert_to_si("W", 2.0), ("W".to_string(), 2.0));
        assert_eq!(convert_to_si("", 2.0), ("".to_string(), 2.0));
    }

    #[test]
    fn zero_denominator() {
        assert_eq!(ratio(45.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(f64::INFINITY, 1.0), 0.0);
        assert_eq!(utilization(Some(45.0), Some(0.0)), 0.0);
        assert_eq!(utilization(None, Some(95.0)), 0.0);
        assert_eq!(utilization(Some(1145.0), Some(2290.0)), 0.5);
    }

    #[test]
    fn normalize_declared_range() {
        let samples = [Some(0.0), Some(50.0), Some(100.0), None];
        let n = normalize(&samples, 0.0, 100.0);

        assert_eq!(n, vec![Some(0.0), Some(0.5), Some(1.0), None]);
    }

    #[test]
    fn normalize_within_declared_range_is_bounded() {
        let (min, max) = (300.0, 1145.0);
        let samples: Vec<Option<f64>> = (300..=1145).step_by(13).map(|v| Some(v as f64)).collect();

        for v in normalize(&samples, min, max).into_iter().flatten() {
            assert!((0.0..=1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn normalize_observed_range() {
        let samples = [Some(10.0), Some(20.0), Some(30.0)];

        assert_eq!(normalize(&samples, 0.0, 0.0), vec![Some(0.0), Some(0.5), Some(1.0)]);
    }

    #[test]
    fn normalize_constant_series() {
        let samples = [Some(7.0); 4];

        assert_eq!(normalize(&samples, 5.0, 5.0), vec![Some(0.0); 4]);
        assert!(normalize(&[], 0.0, 0.0).is_empty());
    }

    #[test]
    fn stats() {
        let mut h = History::new(10);
        for v in [44000.0, 45000.0, 46500.0] {
            h.push(Some(v));
        }
        h.push(None);

        let stats = SignalStats::from_history(&h, "[m°C]", 2);

        assert_eq!(stats.min, Some(44.0));
        assert_eq!(stats.max, Some(46.5));
        assert_eq!(stats.mean, Some(45.17));
        assert_eq!(stats.current, None);
    }

    #[test]
    fn stats_of_empty_history() {
        assert_eq!(SignalStats::from_history(&History::new(5), "[MHz]", 2), SignalStats::default());
    }

    #[test]
    fn utilization_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[
            ("pwm1", "51"),
            ("temp1_input", "47500"),
            ("temp1_crit", "95000"),
        ]);
        let mut gpu = FakeGpu::new(dir.path());
        gpu.mclk = CurrentClock::default();

        let u = Utilization::from_snapshot(&gpu);

        assert_eq!(u.gpu_clock, 1.0);
        assert_eq!(u.mem_clock, 0.0);
        assert_eq!(u.fan, 0.2);
        assert_eq!(u.temperature, 0.5);
    }

    #[test]
    fn utilization_with_zero_crit() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[
            ("pwm1", "128"),
            ("pwm1_max", "0"),
            ("temp1_input", "47500"),
            ("temp1_crit", "0"),
        ]);
        let gpu = FakeGpu::new(dir.path());

        let u = Utilization::from_snapshot(&gpu);

        assert_eq!(u.fan, 0.0);
        assert_eq!(u.temperature, 0.0);
    }
}
