use super::{Attribute, SensorKey, SensorTree, Subsystem};

#[derive(Clone, Debug, PartialEq)]
pub struct PowerCap {
    pub current: f64, // W
    pub min: f64, // W
    pub max: f64, // W
    pub default: Option<f64>, // W
}

impl PowerCap {
    pub fn from_sensor_tree(tree: &SensorTree) -> Option<Self> {
        let cap = SensorKey::new(Subsystem::Power, 1, Some(Attribute::Cap));
        let [current, min, max, default] = [
            None,
            Some(Attribute::Min),
            Some(Attribute::Max),
            Some(Attribute::Default),
        ].map(|sub| {
            let key = match sub {
                Some(sub) => cap.clone().with_sub(sub),
                None => cap.clone(),
            };

            tree.get_f64(&key).map(|v| v / 1_000_000.0)
        });

        Some(Self {
            current: current?,
            min: min?,
            max: max?,
            default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::sensor_tree::tests::write_hwmon;

    #[test]
    fn power_cap_in_watts() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[
            ("power1_cap", "150000000"),
            ("power1_cap_min", "0"),
            ("power1_cap_max", "180000000"),
        ]);

        let tree = SensorTree::from_hwmon_path(dir.path()).unwrap();
        let cap = PowerCap::from_sensor_tree(&tree).unwrap();

        assert_eq!(cap.current, 150.0);
        assert_eq!(cap.min, 0.0);
        assert_eq!(cap.max, 180.0);
        assert_eq!(cap.default, None);
    }

    #[test]
    fn no_power_cap_without_limits() {
        let dir = tempfile::tempdir().unwrap();
        write_hwmon(dir.path(), &[("power1_cap", "150000000")]);

        let tree = SensorTree::from_hwmon_path(dir.path()).unwrap();

        assert!(PowerCap::from_sensor_tree(&tree).is_none());
    }
}
