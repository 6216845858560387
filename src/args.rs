pub struct MainOpt {
    pub instance: Option<u32>,
    pub refresh_period: u64, // ms
    pub iterations: u32,
    pub max_points: usize,
    pub precision: usize,
    pub app_mode: AppMode,
    pub dump_mode: DumpMode,
}

impl Default for MainOpt {
    fn default() -> Self {
        Self {
            instance: None,
            refresh_period: 1000, // 1000ms, 1s
            iterations: 0,
            max_points: 25,
            precision: 2,
            app_mode: AppMode::Monitor,
            dump_mode: DumpMode::NoDump,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum AppMode {
    Monitor,
    #[cfg(feature = "json")]
    JSON,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DumpMode {
    Info,
    List,
    Version,
    NoDump,
}

const HELP_MSG: &str = concat!(
    env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"), "\n",
    env!("CARGO_PKG_REPOSITORY"), "\n",
    "\n",
    "USAGE:\n",
    "    cargo run -- [options ..] or <", env!("CARGO_PKG_NAME"), "> [options ..]\n",
    "\n",
    "FLAGS:\n",
    "   -d, --dump\n",
    "       Dump the OverDrive table, current clocks and hwmon sensors.\n",
    "       This option can be combined with the \"-J\" option.\n",
    "   -l, --list\n",
    "       Display a list of AMDGPU devices.\n",
    "   -J, --json\n",
    "       Output JSON formatted data.\n",
    "       This option can be combined with the \"-d\" option.\n",
    "   -V, --version\n",
    "       Print version information.\n",
    "   -h, --help\n",
    "       Print help information.\n",
    "\n",
    "OPTIONS:\n",
    "   -i <u32>\n",
    "       Select GPU instance (card<N>).\n",
    "   -s <u64>, -s <u64>ms\n",
    "       Refresh period (interval) in milliseconds. (default: 1000ms)\n",
    "   -n <u32>\n",
    "       Specifies the maximum number of iteration.\n",
    "       If 0 is specified, it will be an infinite loop. (default: 0)\n",
    "   --max-points <usize>\n",
    "       Number of samples kept per signal. (default: 25)\n",
    "   --precision <usize>\n",
    "       Decimal places of the mean value. (default: 2)\n",
    "\n",
    "ENVIRONMENT:\n",
    "   AMDGPU_OD_SYSFS=<Path>\n",
    "       Read devices from another sysfs root. (default: /sys)\n",
    "   RUST_LOG=<filter>\n",
    "       Log level. (default: warn)\n",
);

fn value<'a>(args: &'a [String], idx: usize, usage: &str) -> Result<&'a str, String> {
    args.get(idx+1)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("missing argument: \"{usage}\""))
}

fn parse_num<T: std::str::FromStr>(s: &str, usage: &str) -> Result<T, String> {
    s.parse::<T>().map_err(|_| format!("invalid argument: {s:?} for \"{usage}\""))
}

impl MainOpt {
    pub fn parse() -> Self {
        let args = std::env::args().skip(1).collect::<Vec<String>>();

        if args.iter().any(|arg| arg == "-h" || arg == "--help") {
            println!("{HELP_MSG}");
            std::process::exit(0);
        }

        Self::parse_from(&args).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        })
    }

    pub fn parse_from(args: &[String]) -> Result<Self, String> {
        let mut opt = Self::default();
        let mut skip = false;

        for (idx, arg) in args.iter().enumerate() {
            if skip {
                skip = false;
                continue;
            }

            match arg.as_str() {
                "-i" => {
                    let usage = "-i <u32>";
                    opt.instance = Some(parse_num(value(args, idx, usage)?, usage)?);
                    skip = true;
                },
                "-d" | "--dump" => {
                    opt.dump_mode = DumpMode::Info;
                },
                "-l" | "--list" => {
                    opt.dump_mode = DumpMode::List;
                },
                "-V" | "--version" => {
                    opt.dump_mode = DumpMode::Version;
                },
                "-J" | "--json" => {
                    #[cfg(feature = "json")]
                    {
                        opt.app_mode = AppMode::JSON;
                    }
                    #[cfg(not(feature = "json"))]
                    {
                        return Err("\"json\" feature is not enabled for this build.".to_string());
                    }
                },
                "-s" => {
                    let usage = "-s <u64>";
                    let val_str = value(args, idx, usage)?;
                    let tmp: u64 = parse_num(val_str.strip_suffix("ms").unwrap_or(val_str), usage)?;

                    if tmp != 0 {
                        opt.refresh_period = tmp;
                    }

                    skip = true;
                },
                "-n" => {
                    let usage = "-n <u32>";
                    opt.iterations = parse_num(value(args, idx, usage)?, usage)?;
                    skip = true;
                },
                "--max-points" | "--max_points" => {
                    let usage = "--max-points <usize>";
                    let tmp: usize = parse_num(value(args, idx, usage)?, usage)?;

                    if tmp != 0 {
                        opt.max_points = tmp;
                    }

                    skip = true;
                },
                "--precision" => {
                    let usage = "--precision <usize>";
                    opt.precision = parse_num(value(args, idx, usage)?, usage)?;
                    skip = true;
                },
                _ => return Err(format!("Unknown option: {arg}")),
            }
        }

        Ok(opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn defaults() {
        let opt = MainOpt::parse_from(&[]).unwrap();

        assert_eq!(opt.refresh_period, 1000);
        assert_eq!(opt.max_points, 25);
        assert_eq!(opt.precision, 2);
        assert_eq!(opt.app_mode, AppMode::Monitor);
        assert_eq!(opt.dump_mode, DumpMode::NoDump);
    }

    #[test]
    fn options() {
        let opt = MainOpt::parse_from(&args("-i 1 -s 250ms -n 10 --max-points 50 -d")).unwrap();

        assert_eq!(opt.instance, Some(1));
        assert_eq!(opt.refresh_period, 250);
        assert_eq!(opt.iterations, 10);
        assert_eq!(opt.max_points, 50);
        assert_eq!(opt.dump_mode, DumpMode::Info);
    }

    #[test]
    fn zero_period_keeps_default() {
        assert_eq!(MainOpt::parse_from(&args("-s 0")).unwrap().refresh_period, 1000);
    }

    #[test]
    fn errors() {
        assert!(MainOpt::parse_from(&args("-i")).is_err());
        assert!(MainOpt::parse_from(&args("-n many")).is_err());
        assert!(MainOpt::parse_from(&args("--gui")).is_err());
    }
}
