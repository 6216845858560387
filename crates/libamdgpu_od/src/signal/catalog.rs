use std::collections::BTreeMap;
use super::{ClockOutput, GpuSnapshot, Signal, SignalSource};
use crate::KernelVersion;
use crate::od::DpmClockType;
use crate::stat::{Attribute, AttributeNode, Leaf, SensorKey, SensorNode, Subsystem};

/// Attributes whose presence at a level bounds or names the signals at that level.
const DESCRIBING: [Attribute; 5] = [
    Attribute::Min,
    Attribute::Max,
    Attribute::Crit,
    Attribute::Cap,
    Attribute::Label,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemStyle {
    pub unit: String,
    pub color: String,
}

impl SubsystemStyle {
    pub fn new(unit: &str, color: &str) -> Self {
        Self { unit: unit.to_string(), color: color.to_string() }
    }
}

pub type StyleMap = BTreeMap<Subsystem, SubsystemStyle>;

/// Units as exposed by the hwmon sysfs interface.
pub fn default_style_map() -> StyleMap {
    [
        (Subsystem::Fan, "[RPM]", "#8c564b"),
        (Subsystem::Pwm, "[-]", "#bcbd22"),
        (Subsystem::Temp, "[m°C]", "#e377c2"),
        (Subsystem::Power, "[µW]", "#7f7f7f"),
        (Subsystem::In, "[mV]", "#17becf"),
        (Subsystem::Curr, "[mA]", "#aec7e8"),
        (Subsystem::Energy, "[µJ]", "#ffbb78"),
        (Subsystem::Freq, "[Hz]", "#98df8a"),
    ]
    .into_iter()
    .map(|(sub, unit, color)| (sub, SubsystemStyle::new(unit, color)))
    .collect()
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub max_points: usize,
    pub precision: usize,
    /// `None` if unknown, the GPU busy signal is not added then.
    pub kernel: Option<KernelVersion>,
    pub styles: StyleMap,
    /// A leaf becomes a signal when the last token of its file name is equal to
    /// one of these. This is an allow-list on whole tokens, not a substring match:
    /// `pwm` marks `pwm1` but not `pwm1_enable` or `pwm1_max`.
    pub markers: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_points: 25,
            precision: 2,
            kernel: None,
            styles: default_style_map(),
            markers: ["input", "average", "pwm"].map(String::from).to_vec(),
        }
    }
}

impl CatalogConfig {
    fn is_marked(&self, key: &SensorKey) -> bool {
        let last = match (&key.attribute, &key.sub_attribute) {
            (_, Some(sub)) => sub.as_str(),
            (Some(attr), None) => attr.as_str(),
            (None, None) => key.subsystem.as_str(),
        };

        self.markers.iter().any(|m| m == last)
    }
}

/// Declared display range from the siblings of a leaf.
/// `min`/`max` first, then `crit`, then `cap`; `(0, 0)` if none is readable.
fn declared_range<'a, F: Fn(&Attribute) -> Option<&'a Leaf>>(sibling: F) -> (f64, f64) {
    let val = |attr: Attribute| sibling(&attr).and_then(|l| l.as_f64());

    if let Some(max) = val(Attribute::Max) {
        return (val(Attribute::Min).unwrap_or(0.0), max);
    }

    let max = val(Attribute::Crit)
        .or_else(|| val(Attribute::Cap))
        .unwrap_or(0.0);

    (0.0, max)
}

fn signal_name<'a, F: Fn(&Attribute) -> Option<&'a Leaf>>(sibling: F, key: &SensorKey) -> String {
    if let Some(label) = sibling(&Attribute::Label).and_then(|l| l.as_str()) {
        return label.to_string();
    }

    let file_name = key.to_string();

    file_name.split('_').next().unwrap_or(&file_name).to_string()
}

/// Suffixes signals sharing a name with the rest of their hwmon file name,
/// e.g. `power1_input` and `power1_average` become `power1 (input)` and `power1 (average)`.
fn disambiguate(signals: &mut [Signal]) {
    let mut count: BTreeMap<String, usize> = BTreeMap::new();

    for s in signals.iter() {
        *count.entry(s.name.clone()).or_default() += 1;
    }

    for s in signals.iter_mut() {
        if count.get(&s.name).copied().unwrap_or(0) < 2 { continue }

        let SignalSource::Sensor(key) = &s.source else { continue };
        let file_name = key.to_string();
        let suffix = match file_name.split_once('_') {
            Some((base, rest)) if base == s.name => rest.to_string(),
            Some(_) => file_name.clone(),
            None => continue,
        };

        s.name = format!("{} ({suffix})", s.name);
    }
}

#[derive(Debug, Clone)]
pub struct SignalCatalog {
    pub signals: Vec<Signal>,
    pub precision: usize,
}

impl SignalCatalog {
    /// All candidate signals, before the first sampling pass.
    pub fn build<S: GpuSnapshot + ?Sized>(gpu: &S, config: &CatalogConfig) -> Self {
        let mut signals = Self::clock_signals(gpu, config);

        for (subsystem, nodes) in &gpu.sensor_tree().subsystems {
            let Some(style) = config.styles.get(subsystem) else {
                log::debug!("no style for hwmon subsystem {subsystem:?}, skipping");
                continue;
            };

            for (index, node) in nodes {
                Self::flatten_node(subsystem, *index, node, style, config, &mut signals);
            }
        }

        match config.kernel {
            Some(ver) if ver.supports_gpu_busy() => signals.push(Signal::new(
                "GPU Usage",
                "[%]",
                (0.0, 100.0),
                SignalSource::GpuBusy,
                "#2ca02c",
                config.max_points,
            )),
            Some(ver) => log::info!(
                "Linux {ver} does not expose gpu_busy_percent (requires {})",
                KernelVersion::GPU_BUSY,
            ),
            None => log::info!("unknown kernel version, GPU usage is not sampled"),
        }

        disambiguate(&mut signals);

        Self { signals, precision: config.precision }
    }

    /// Builds, samples once, and drops every signal that could not be read.
    pub fn new<S: GpuSnapshot + ?Sized>(gpu: &S, config: &CatalogConfig) -> Self {
        let mut catalog = Self::build(gpu, config);

        catalog.sample(gpu);
        catalog.signals.retain(|s| {
            let present = s.history.latest().is_some();

            if !present {
                log::warn!("Removing {} from the catalog, {} could not be read", s.name, s.source);
            }

            present
        });

        catalog
    }

    fn clock_signals<S: GpuSnapshot + ?Sized>(gpu: &S, config: &CatalogConfig) -> Vec<Signal> {
        let table = gpu.clock_table();
        let mut vec = Vec::with_capacity(4);

        for (clk, [clock_color, state_color]) in [
            (DpmClockType::Sclk, ["#1f77b4", "#ff7f0e"]),
            (DpmClockType::Mclk, ["#d62728", "#9467bd"]),
        ] {
            let states = table.states(clk);
            let clock_range = (
                table.min_clock(clk).unwrap_or(0) as f64,
                table.max_clock(clk).unwrap_or(0) as f64,
            );
            let state_range = (0.0, states.len().saturating_sub(1) as f64);

            vec.push(Signal::new(
                &format!("{clk} Clock"),
                "[MHz]",
                clock_range,
                SignalSource::Clock { clk, output: ClockOutput::Clock },
                clock_color,
                config.max_points,
            ));
            vec.push(Signal::new(
                &format!("{clk} State"),
                "[-]",
                state_range,
                SignalSource::Clock { clk, output: ClockOutput::State },
                state_color,
                config.max_points,
            ));
        }

        vec
    }

    fn flatten_node(
        subsystem: &Subsystem,
        index: u32,
        node: &SensorNode,
        style: &SubsystemStyle,
        config: &CatalogConfig,
        signals: &mut Vec<Signal>,
    ) {
        let base = SensorKey::new(subsystem.clone(), index, None);
        let level: Vec<(SensorKey, &Leaf)> = node.leaf.iter()
            .map(|leaf| (base.clone(), leaf))
            .chain(node.attributes.iter().filter_map(|(attr, attr_node)| {
                let key = SensorKey::new(subsystem.clone(), index, Some(attr.clone()));
                attr_node.leaf.as_ref().map(|leaf| (key, leaf))
            }))
            .collect();

        let described = Self::flatten_level(
            &level,
            |attr| node.attribute_leaf(attr),
            style,
            config,
            false,
            signals,
        );

        for (attr, attr_node) in &node.attributes {
            Self::flatten_attribute(subsystem, index, attr, attr_node, style, config, described, signals);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn flatten_attribute(
        subsystem: &Subsystem,
        index: u32,
        attr: &Attribute,
        attr_node: &AttributeNode,
        style: &SubsystemStyle,
        config: &CatalogConfig,
        described: bool,
        signals: &mut Vec<Signal>,
    ) {
        let base = SensorKey::new(subsystem.clone(), index, Some(attr.clone()));
        let level: Vec<(SensorKey, &Leaf)> = attr_node.sub.iter()
            .map(|(sub, leaf)| (base.clone().with_sub(sub.clone()), leaf))
            .collect();

        Self::flatten_level(
            &level,
            |sub| attr_node.sub.get(sub),
            style,
            config,
            described,
            signals,
        );
    }

    /// Emits a signal for each marked leaf of one level.
    /// Returns whether the level described its own scalar, in which case
    /// the levels below it are not flattened.
    fn flatten_level<'a, F>(
        level: &[(SensorKey, &'a Leaf)],
        sibling: F,
        style: &SubsystemStyle,
        config: &CatalogConfig,
        described: bool,
        signals: &mut Vec<Signal>,
    ) -> bool
    where
        F: Fn(&Attribute) -> Option<&'a Leaf> + Copy,
    {
        if described { return true }

        let mut emitted = false;

        for (key, _leaf) in level.iter().filter(|(key, _)| config.is_marked(key)) {
            let name = signal_name(sibling, key);
            let range = declared_range(sibling);

            log::debug!("hwmon signal {name:?} from {key}, range {range:?}");

            signals.push(Signal::new(
                &name,
                &style.unit,
                range,
                SignalSource::Sensor(key.clone()),
                &style.color,
                config.max_points,
            ));
            emitted = true;
        }

        emitted && DESCRIBING.iter().any(|attr| sibling(attr).is_some())
    }

    pub fn sample<S: GpuSnapshot + ?Sized>(&mut self, gpu: &S) {
        for s in self.signals.iter_mut() {
            s.sample(gpu);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.enabled)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
