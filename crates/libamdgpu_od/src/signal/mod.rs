use std::collections::VecDeque;
use std::fmt;
use crate::od::{ClockVoltageTable, CurrentClock, DpmClockType};
use crate::stat::{SensorKey, SensorTree};

mod catalog;
pub use catalog::*;

mod metrics;
pub use metrics::*;

/// Read access to the live state of one GPU, resolved by [`SignalSource`] on every sample.
pub trait GpuSnapshot {
    fn clock_table(&self) -> &ClockVoltageTable;
    fn sensor_tree(&self) -> &SensorTree;
    fn current_clock(&self, clk: DpmClockType) -> CurrentClock;
    fn gpu_busy(&self) -> Option<u16>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutput {
    Clock,
    State,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalSource {
    Sensor(SensorKey),
    Clock { clk: DpmClockType, output: ClockOutput },
    GpuBusy,
}

impl SignalSource {
    pub fn read<S: GpuSnapshot + ?Sized>(&self, gpu: &S) -> Option<f64> {
        match self {
            Self::Sensor(key) => gpu.sensor_tree().get_f64(key),
            Self::Clock { clk, output } => {
                let cur = gpu.current_clock(*clk);
                let v = match output {
                    ClockOutput::Clock => cur.clock,
                    ClockOutput::State => cur.state,
                };

                v.map(|v| v as f64)
            },
            Self::GpuBusy => gpu.gpu_busy().map(|v| v as f64),
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sensor(key) => write!(f, "{key}"),
            Self::Clock { clk, output } => write!(f, "{} ({output:?})", clk.file_name()),
            Self::GpuBusy => write!(f, "gpu_busy_percent"),
        }
    }
}

/// Fixed-capacity sample buffer, the oldest sample is evicted first.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    buf: VecDeque<Option<f64>>,
    max_points: usize,
}

impl History {
    pub fn new(max_points: usize) -> Self {
        let max_points = max_points.max(1);

        Self {
            buf: VecDeque::with_capacity(max_points),
            max_points,
        }
    }

    pub fn push(&mut self, v: Option<f64>) {
        if self.buf.len() == self.max_points {
            self.buf.pop_front();
        }
        self.buf.push_back(v);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn latest(&self) -> Option<f64> {
        self.buf.back().copied().flatten()
    }

    /// Samples in order, absent reads included.
    pub fn samples(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.buf.iter().copied()
    }

    /// Present values only.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.buf.iter().filter_map(|v| *v)
    }
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub unit: String,
    pub declared_min: f64,
    pub declared_max: f64,
    pub source: SignalSource,
    pub enabled: bool,
    pub normalize: bool,
    pub color: String,
    pub history: History,
}

impl Signal {
    pub fn new(
        name: &str,
        unit: &str,
        (declared_min, declared_max): (f64, f64),
        source: SignalSource,
        color: &str,
        max_points: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            declared_min,
            declared_max,
            source,
            enabled: true,
            normalize: false,
            color: color.to_string(),
            history: History::new(max_points),
        }
    }

    pub fn sample<S: GpuSnapshot + ?Sized>(&mut self, gpu: &S) -> Option<f64> {
        let v = self.source.read(gpu);
        self.history.push(v);

        v
    }

    /// Unit with the metric prefix stripped, e.g. `[m°C]` -> `[°C]`.
    pub fn si_unit(&self) -> String {
        convert_to_si(&self.unit, 0.0).0
    }

    pub fn to_si(&self, v: f64) -> f64 {
        convert_to_si(&self.unit, v).1
    }

    pub fn declared_range_si(&self) -> (f64, f64) {
        (self.to_si(self.declared_min), self.to_si(self.declared_max))
    }

    pub fn current_si(&self) -> Option<f64> {
        self.history.latest().map(|v| self.to_si(v))
    }

    pub fn stats(&self, precision: usize) -> SignalStats {
        SignalStats::from_history(&self.history, &self.unit, precision)
    }

    /// Samples in SI units, absent reads kept as `None`.
    pub fn samples_si(&self) -> Vec<Option<f64>> {
        self.history.samples().map(|v| v.map(|v| self.to_si(v))).collect()
    }

    pub fn normalized(&self) -> Vec<Option<f64>> {
        let samples: Vec<Option<f64>> = self.history.samples().collect();

        normalize(&samples, self.declared_min, self.declared_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_evicts_oldest() {
        let mut h = History::new(3);

        for v in 0..5 {
            h.push(Some(v as f64));
        }

        assert_eq!(h.len(), 3);
        assert_eq!(h.values().collect::<Vec<f64>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(h.latest(), Some(4.0));
    }

    #[test]
    fn history_latest_can_be_absent() {
        let mut h = History::new(4);
        h.push(Some(1.0));
        h.push(None);

        assert_eq!(h.len(), 2);
        assert_eq!(h.latest(), None);
        assert_eq!(h.values().count(), 1);
    }

    #[test]
    fn zero_capacity_keeps_one_sample() {
        let mut h = History::new(0);
        h.push(Some(1.0));
        h.push(Some(2.0));

        assert_eq!(h.max_points(), 1);
        assert_eq!(h.samples().collect::<Vec<_>>(), vec![Some(2.0)]);
    }

    #[test]
    fn signal_unit_conversion() {
        let s = Signal::new(
            "temp1",
            "[m°C]",
            (0.0, 95000.0),
            SignalSource::GpuBusy,
            "#e377c2",
            10,
        );

        assert_eq!(s.si_unit(), "[°C]");
        assert_eq!(s.declared_range_si(), (0.0, 95.0));
    }
}
