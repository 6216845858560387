use once_cell::sync::Lazy;
use regex::Regex;
use super::{ClockRange, ClockVoltageTable, PState};
use crate::error::{OdError, Result};

static LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z_]+):$").unwrap());
// e.g. "1:        600MHz        769mV", "SCLK:     300MHz       2000MHz"
static VALUE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+):\s+(\d+)(MHz|Mhz|mV)\s+(\d+)(MHz|Mhz|mV)$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    None,
    Sclk,
    Mclk,
    Range,
    /// Recognized label whose rows are not modeled, e.g. `OD_VDDC_CURVE`.
    Unsupported(String),
}

impl From<&str> for Section {
    fn from(label: &str) -> Self {
        match label {
            "OD_SCLK" => Self::Sclk,
            "OD_MCLK" => Self::Mclk,
            "OD_RANGE" => Self::Range,
            _ => Self::Unsupported(label.to_string()),
        }
    }
}

struct ValuePair<'a> {
    label: &'a str,
    v1: u32,
    unit1: &'a str,
    v2: u32,
    unit2: &'a str,
}

impl<'a> ValuePair<'a> {
    fn parse(line_no: usize, line: &'a str) -> Result<Self> {
        let cap = VALUE_PAIR
            .captures(line)
            .ok_or_else(|| OdError::malformed(line_no, line, "expected `<index>: <value><unit> <value><unit>`"))?;
        let [v1, v2] = [2, 4].map(|i| cap.get(i).and_then(|m| m.as_str().parse::<u32>().ok()));
        let (Some(label), Some(v1), Some(unit1), Some(v2), Some(unit2)) = (
            cap.get(1),
            v1,
            cap.get(3),
            v2,
            cap.get(5),
        ) else {
            return Err(OdError::malformed(line_no, line, "value out of range"));
        };

        Ok(Self {
            label: label.as_str(),
            v1,
            unit1: unit1.as_str(),
            v2,
            unit2: unit2.as_str(),
        })
    }

    fn is_mhz(unit: &str) -> bool {
        unit == "MHz" || unit == "Mhz"
    }

    fn to_pstate(&self, line_no: usize, line: &str) -> Result<PState> {
        if !Self::is_mhz(self.unit1) || self.unit2 != "mV" {
            return Err(OdError::malformed(line_no, line, "expected `<clock>MHz <voltage>mV`"));
        }

        Ok(PState::new(self.v1, self.v2))
    }

    fn to_range(&self, line_no: usize, line: &str) -> Result<ClockRange> {
        if self.unit1 != self.unit2 && !(Self::is_mhz(self.unit1) && Self::is_mhz(self.unit2)) {
            return Err(OdError::malformed(line_no, line, "mixed units in range"));
        }
        if self.v1 > self.v2 {
            return Err(OdError::malformed(line_no, line, "range min is greater than max"));
        }

        Ok(ClockRange { min: self.v1, max: self.v2 })
    }
}

impl ClockVoltageTable {
    pub fn parse_pp_od_clk_voltage(s: &str) -> Result<Self> {
        let mut table = Self { supports_table: true, ..Default::default() };
        let mut section = Section::None;

        for (i, line) in s.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();

            if line.is_empty() { continue }

            if let Some(cap) = LABEL.captures(line) {
                section = Section::from(&cap[1]);

                if let Section::Unsupported(label) = &section {
                    let e = OdError::UnsupportedFormat { section: label.clone() };
                    log::warn!("{e}, skipping");
                }

                continue;
            }

            match &section {
                Section::None => {
                    return Err(OdError::malformed(line_no, line, "value outside of a section"));
                },
                Section::Unsupported(_) => continue,
                Section::Sclk => {
                    let pstate = ValuePair::parse(line_no, line)?.to_pstate(line_no, line)?;
                    table.gpu_states.push(pstate);
                },
                Section::Mclk => {
                    let pstate = ValuePair::parse(line_no, line)?.to_pstate(line_no, line)?;
                    table.mem_states.push(pstate);
                },
                Section::Range => {
                    let pair = ValuePair::parse(line_no, line)?;
                    let range = pair.to_range(line_no, line)?;

                    match pair.label {
                        "SCLK" => table.gpu_clock_range = Some(range),
                        "MCLK" => table.mem_clock_range = Some(range),
                        "VDDC" => table.voltage_range = Some(range),
                        label => {
                            log::warn!(
                                "{label} limit is not recognized, \
                                this hardware may not be fully supported",
                            );
                            table.extra_ranges.insert(label.to_string(), range);
                        },
                    }
                },
            }
        }

        table.validate()?;

        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.total_values() == 0 {
            return Err(OdError::malformed(0, "", "no values"));
        }

        for (name, states) in [("OD_SCLK", &self.gpu_states), ("OD_MCLK", &self.mem_states)] {
            if states.is_empty() {
                return Err(OdError::malformed(0, "", format!("{name} is missing or empty")));
            }

            if states.windows(2).any(|w| w[0].clock > w[1].clock) {
                return Err(OdError::malformed(0, "", format!("{name} is not sorted by clock")));
            }
        }

        if let Some(vddc) = self.voltage_range {
            for s in self.gpu_states.iter().chain(self.mem_states.iter()) {
                let Some(v) = s.voltage else { continue };
                if !vddc.contains(v) {
                    log::warn!("{v}mV @ {}MHz is outside of VDDC range ({vddc} mV)", s.clock);
                }
            }
        }

        Ok(())
    }
}
