use std::fmt;
use std::path::{Path, PathBuf};
use crate::error::{OdError, Result};

pub(crate) mod sensor_tree;
pub use sensor_tree::*;

mod power_cap;
pub use power_cap::*;

mod gpu_activity;
pub use gpu_activity::*;

mod od_state;
pub use od_state::*;

/// A single scalar as exposed by sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Int(i64),
    Str(String),
}

impl SensorValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_i64().map(|v| v as f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(s) => Some(s.as_str()),
        }
    }
}

impl From<&str> for SensorValue {
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Str(s.to_string()),
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Reads the first line of a sysfs file as an integer, or as a trimmed string.
pub fn read_sensor<P: AsRef<Path>>(path: P) -> Result<SensorValue> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).map_err(|e| OdError::from_io(path, e))?;
    let line = s.lines().next().unwrap_or("").trim();

    if line.is_empty() {
        return Err(OdError::UnreadableValue {
            path: path.to_path_buf(),
            reason: "empty content".to_string(),
        });
    }

    Ok(SensorValue::from(line))
}

pub(crate) fn parse_hwmon<T: std::str::FromStr, P: Into<PathBuf>>(path: P) -> Option<T> {
    std::fs::read_to_string(path.into()).ok()
        .and_then(|file| file.trim_end().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn read_int_and_string() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("temp1_input"), "45000\n").unwrap();
        fs::write(dir.path().join("temp1_label"), "edge\n").unwrap();

        assert_eq!(read_sensor(dir.path().join("temp1_input")).unwrap(), SensorValue::Int(45000));
        assert_eq!(
            read_sensor(dir.path().join("temp1_label")).unwrap(),
            SensorValue::Str("edge".to_string()),
        );
    }

    #[test]
    fn read_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pwm1"), "").unwrap();

        assert!(matches!(
            read_sensor(dir.path().join("pwm1")),
            Err(OdError::UnreadableValue { .. }),
        ));
        assert!(matches!(
            read_sensor(dir.path().join("fan1_input")),
            Err(OdError::MissingFile { .. }),
        ));
    }

    #[test]
    fn negative_value_is_int() {
        assert_eq!(SensorValue::from("-5"), SensorValue::Int(-5));
        assert_eq!(SensorValue::Int(-5).as_f64(), Some(-5.0));
        assert_eq!(SensorValue::from("manual").as_str(), Some("manual"));
    }
}
