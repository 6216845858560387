// ref: https://www.kernel.org/doc/html/latest/hwmon/sysfs-interface.html
// ref: https://www.kernel.org/doc/html/latest/gpu/amdgpu/thermal.html#hwmon-interfaces

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use once_cell::sync::Lazy;
use regex::Regex;
use super::{read_sensor, SensorValue};
use crate::error::{OdError, Result};

// <subsystem><index>[_<attribute>[_<subattribute>]]
static HWMON_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z]+)(\d+)(?:_([a-z]+)(?:_([a-z0-9_]+))?)?$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subsystem {
    Fan,
    Pwm,
    Temp,
    Power,
    In,
    Curr,
    Energy,
    Freq,
    Other(String),
}

impl Subsystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fan => "fan",
            Self::Pwm => "pwm",
            Self::Temp => "temp",
            Self::Power => "power",
            Self::In => "in",
            Self::Curr => "curr",
            Self::Energy => "energy",
            Self::Freq => "freq",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for Subsystem {
    fn from(s: &str) -> Self {
        match s {
            "fan" => Self::Fan,
            "pwm" => Self::Pwm,
            "temp" => Self::Temp,
            "power" => Self::Power,
            "in" => Self::In,
            "curr" => Self::Curr,
            "energy" => Self::Energy,
            "freq" => Self::Freq,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Input,
    Average,
    Min,
    Max,
    Crit,
    Cap,
    Emergency,
    Hyst,
    Default,
    Enable,
    Target,
    Label,
    Other(String),
}

impl Attribute {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
            Self::Crit => "crit",
            Self::Cap => "cap",
            Self::Emergency => "emergency",
            Self::Hyst => "hyst",
            Self::Default => "default",
            Self::Enable => "enable",
            Self::Target => "target",
            Self::Label => "label",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        match s {
            "input" => Self::Input,
            "average" => Self::Average,
            "min" => Self::Min,
            "max" => Self::Max,
            "crit" => Self::Crit,
            "cap" => Self::Cap,
            "emergency" => Self::Emergency,
            "hyst" => Self::Hyst,
            "default" => Self::Default,
            "enable" => Self::Enable,
            "target" => Self::Target,
            "label" => Self::Label,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a leaf in a [`SensorTree`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorKey {
    pub subsystem: Subsystem,
    pub index: u32,
    pub attribute: Option<Attribute>,
    pub sub_attribute: Option<Attribute>,
}

impl SensorKey {
    pub fn new(subsystem: Subsystem, index: u32, attribute: Option<Attribute>) -> Self {
        Self { subsystem, index, attribute, sub_attribute: None }
    }

    pub fn with_sub(mut self, sub_attribute: Attribute) -> Self {
        self.sub_attribute = Some(sub_attribute);
        self
    }

    /// `power1_cap_max` -> (power, 1, cap, max)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let cap = HWMON_FILE_NAME.captures(name)?;
        let subsystem = Subsystem::from(cap.get(1)?.as_str());
        let index = cap.get(2)?.as_str().parse::<u32>().ok()?;
        let attribute = cap.get(3).map(|m| Attribute::from(m.as_str()));
        let sub_attribute = cap.get(4).map(|m| Attribute::from(m.as_str()));

        Some(Self { subsystem, index, attribute, sub_attribute })
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.subsystem, self.index)?;

        if let Some(attr) = &self.attribute {
            write!(f, "_{attr}")?;
        }
        if let Some(sub) = &self.sub_attribute {
            write!(f, "_{sub}")?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub path: PathBuf,
    pub value: Option<SensorValue>,
}

impl Leaf {
    pub fn read<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let value = read_sensor(&path)?;

        Ok(Self { path, value: Some(value) })
    }

    pub fn refresh(&mut self) {
        self.value = read_sensor(&self.path).ok();
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|s| s.to_str()).unwrap_or("")
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(|v| v.as_f64())
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeNode {
    pub leaf: Option<Leaf>,
    pub sub: BTreeMap<Attribute, Leaf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorNode {
    /// A file without attribute, e.g. `pwm1`.
    pub leaf: Option<Leaf>,
    pub attributes: BTreeMap<Attribute, AttributeNode>,
}

impl SensorNode {
    pub fn attribute_leaf(&self, attr: &Attribute) -> Option<&Leaf> {
        self.attributes.get(attr)?.leaf.as_ref()
    }

    pub fn attribute_f64(&self, attr: &Attribute) -> Option<f64> {
        self.attribute_leaf(attr)?.as_f64()
    }

    pub fn label(&self) -> Option<&str> {
        self.attribute_leaf(&Attribute::Label)?.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct SensorTree {
    pub hwmon_path: PathBuf,
    pub subsystems: BTreeMap<Subsystem, BTreeMap<u32, SensorNode>>,
    /// Number of sensor files excluded because their first read failed.
    pub unreadable: usize,
}

impl SensorTree {
    pub fn from_hwmon_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let hwmon_path = path.into();
        let entries = std::fs::read_dir(&hwmon_path)
            .map_err(|e| OdError::from_io(&hwmon_path, e))?;
        let mut tree = Self {
            hwmon_path: hwmon_path.clone(),
            subsystems: BTreeMap::new(),
            unreadable: 0,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() { continue }

            let Some(key) = entry.file_name().to_str().and_then(SensorKey::from_file_name) else {
                continue
            };

            match Leaf::read(&path) {
                Ok(leaf) => tree.insert(key, leaf),
                Err(e) => {
                    log::debug!("hwmon: skip {key}: {e}");
                    tree.unreadable += 1;
                },
            }
        }

        if tree.unreadable != 0 {
            log::info!(
                "hwmon: {} unreadable sensor file(s) in {}",
                tree.unreadable,
                hwmon_path.display(),
            );
        }

        Ok(tree)
    }

    fn insert(&mut self, key: SensorKey, leaf: Leaf) {
        let node = self.subsystems
            .entry(key.subsystem)
            .or_default()
            .entry(key.index)
            .or_default();

        match (key.attribute, key.sub_attribute) {
            (None, _) => node.leaf = Some(leaf),
            (Some(attr), None) => node.attributes.entry(attr).or_default().leaf = Some(leaf),
            (Some(attr), Some(sub)) => {
                node.attributes.entry(attr).or_default().sub.insert(sub, leaf);
            },
        }
    }

    pub fn refresh(&mut self) {
        for node in self.subsystems.values_mut().flat_map(|m| m.values_mut()) {
            if let Some(leaf) = node.leaf.as_mut() {
                leaf.refresh();
            }

            for attr in node.attributes.values_mut() {
                if let Some(leaf) = attr.leaf.as_mut() {
                    leaf.refresh();
                }

                for leaf in attr.sub.values_mut() {
                    leaf.refresh();
                }
            }
        }
    }

    pub fn node(&self, subsystem: &Subsystem, index: u32) -> Option<&SensorNode> {
        self.subsystems.get(subsystem)?.get(&index)
    }

    pub fn get(&self, key: &SensorKey) -> Option<&Leaf> {
        let node = self.node(&key.subsystem, key.index)?;

        match (&key.attribute, &key.sub_attribute) {
            (None, None) => node.leaf.as_ref(),
            (None, Some(_)) => None,
            (Some(attr), None) => node.attribute_leaf(attr),
            (Some(attr), Some(sub)) => node.attributes.get(attr)?.sub.get(sub),
        }
    }

    pub fn get_f64(&self, key: &SensorKey) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    /// All leaves in tree order.
    pub fn leaves(&self) -> Vec<(SensorKey, &Leaf)> {
        let mut vec = Vec::new();

        for (subsystem, nodes) in &self.subsystems {
            for (index, node) in nodes {
                let key = SensorKey::new(subsystem.clone(), *index, None);

                if let Some(leaf) = &node.leaf {
                    vec.push((key.clone(), leaf));
                }

                for (attr, attr_node) in &node.attributes {
                    let key = SensorKey::new(subsystem.clone(), *index, Some(attr.clone()));

                    if let Some(leaf) = &attr_node.leaf {
                        vec.push((key.clone(), leaf));
                    }

                    for (sub, leaf) in &attr_node.sub {
                        vec.push((key.clone().with_sub(sub.clone()), leaf));
                    }
                }
            }
        }

        vec
    }

    /// Keys only; two scans of an unchanged directory have the same shape.
    pub fn shape(&self) -> Vec<SensorKey> {
        self.leaves().into_iter().map(|(key, _)| key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    pub(crate) fn write_hwmon(dir: &Path, files: &[(&str, &str)]) {
        for (name, val) in files {
            fs::write(dir.join(name), format!("{val}\n")).unwrap();
        }
    }

    #[test]
    fn decompose_file_name() {
        let key = SensorKey::from_file_name("power1_cap_max").unwrap();
        assert_eq!(key.subsystem, Subsystem::Power);
        assert_eq!(key.index, 1);
        assert_eq!(key.attribute, Some(Attribute::Cap));
        assert_eq!(key.sub_attribute, Some(Attribute::Max));

        let key = SensorKey::from_file_name("pwm1").unwrap();
        assert_eq!(key, SensorKey::new(Subsystem::Pwm, 1, None));

        let key = SensorKey::from_file_name("temp2_crit_hyst").unwrap();
        assert_eq!(key.to_string(), "temp2_crit_hyst");

        assert!(SensorKey::from_file_name("name").is_none());
        assert!(SensorKey::from_file_name("uevent").is_none());
        assert!(SensorKey::from_file_name("temp_input").is_none());
    }

    #[test]
    fn build_tree() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[
            ("name", "amdgpu"),
            ("temp1_input", "45000"),
            ("temp1_crit", "95000"),
            ("temp1_crit_hyst", "-273150"),
            ("temp1_label", "edge"),
            ("pwm1", "76"),
            ("pwm1_enable", "2"),
            ("power1_cap_max", "150000000"),
        ]);
        fs::write(dir.path().join("fan1_input"), "").unwrap();
        fs::create_dir(dir.path().join("power")).unwrap();

        let tree = SensorTree::from_hwmon_path(dir.path()).unwrap();

        assert_eq!(tree.unreadable, 1);
        assert!(tree.node(&Subsystem::Fan, 1).is_none());

        let temp1 = tree.node(&Subsystem::Temp, 1).unwrap();
        assert_eq!(temp1.attribute_f64(&Attribute::Input), Some(45000.0));
        assert_eq!(temp1.label(), Some("edge"));
        assert_eq!(
            temp1.attributes[&Attribute::Crit].sub[&Attribute::Hyst].value,
            Some(SensorValue::Int(-273150)),
        );

        let pwm1 = tree.node(&Subsystem::Pwm, 1).unwrap();
        assert_eq!(pwm1.leaf.as_ref().and_then(|l| l.as_f64()), Some(76.0));

        // `cap` has only a sub-attribute here
        let key = SensorKey::new(Subsystem::Power, 1, Some(Attribute::Cap));
        assert!(tree.get(&key).is_none());
        assert_eq!(tree.get_f64(&key.with_sub(Attribute::Max)), Some(150000000.0));
    }

    #[test]
    fn rebuild_is_structurally_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[
            ("fan1_input", "1200"),
            ("fan1_min", "0"),
            ("fan1_max", "3300"),
            ("in0_input", "806"),
            ("in0_label", "vddgfx"),
        ]);

        let a = SensorTree::from_hwmon_path(dir.path()).unwrap();
        write_hwmon(dir.path(), &[("fan1_input", "1500")]);
        let b = SensorTree::from_hwmon_path(dir.path()).unwrap();

        assert_eq!(a.shape(), b.shape());
        assert_eq!(a.shape().len(), 5);
    }

    #[test]
    fn refresh_in_place() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[("temp1_input", "45000"), ("temp1_crit", "95000")]);

        let mut tree = SensorTree::from_hwmon_path(dir.path()).unwrap();
        let input = SensorKey::new(Subsystem::Temp, 1, Some(Attribute::Input));
        let crit = SensorKey::new(Subsystem::Temp, 1, Some(Attribute::Crit));

        write_hwmon(dir.path(), &[("temp1_input", "51000")]);
        fs::remove_file(dir.path().join("temp1_crit")).unwrap();
        tree.refresh();

        assert_eq!(tree.get_f64(&input), Some(51000.0));
        // the leaf stays, only its value goes away
        assert!(tree.get(&crit).is_some());
        assert_eq!(tree.get_f64(&crit), None);
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let r = SensorTree::from_hwmon_path(dir.path().join("hwmon9"));

        assert!(matches!(r, Err(OdError::MissingFile { .. })));
    }
}
