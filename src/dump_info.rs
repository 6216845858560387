use libamdgpu_od::{AppAmdgpuOd, AppOdMonitor, AppOption, DevicePath, OverdriveStatus, PpFeatureMask};
use libamdgpu_od::od::{ClockVoltageTable, CurrentClock, DpmClockType};
use libamdgpu_od::signal::SignalCatalog;
use std::time::Duration;

const NA: &str = "N/A";

fn opt_to_string<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or(NA.to_string(), |v| v.to_string())
}

pub fn dump_list(device_path_list: &[DevicePath]) {
    for device_path in device_path_list {
        println!("{device_path}");
        println!("    hwmon    : {}", device_path.hwmon_path.display());
        println!("    OD table : {}", device_path.has_od_table());
    }
}

pub fn dump_ppfeaturemask(overdrive: &OverdriveStatus) {
    match overdrive {
        OverdriveStatus::Enabled { mask } | OverdriveStatus::Disabled { mask } => {
            println!("ppfeaturemask: {mask:#010x}");

            for ftr in PpFeatureMask::enabled_features(*mask) {
                println!("    {ftr}");
            }
        },
        OverdriveStatus::Unknown => println!("ppfeaturemask: {NA}"),
    }

    if let Some(suggested) = overdrive.suggested_mask() {
        println!("OverDrive is disabled, boot with \"amdgpu.ppfeaturemask={suggested:#x}\" to enable it");
    }
}

pub fn dump_all(title: &str, device_path_list: &[DevicePath], overdrive: &OverdriveStatus) {
    println!("{title}\n");
    dump_ppfeaturemask(overdrive);

    for app in AppAmdgpuOd::from_device_path_list(device_path_list) {
        println!("\n--------\n");
        dump(&app);
    }
}

fn dump(app: &AppAmdgpuOd) {
    println!("{}", app.device_path);
    dump_table(&app.table);

    println!();
    for (clk, cur) in [(DpmClockType::Sclk, app.stat.sclk), (DpmClockType::Mclk, app.stat.mclk)] {
        dump_current_clock(clk, &cur);
    }

    let od = &app.stat.od_state;
    println!();
    println!("pp_sclk_od         : {} %", opt_to_string(od.sclk_od));
    println!("pp_mclk_od         : {} %", opt_to_string(od.mclk_od));
    println!("Performance Level  : {}", opt_to_string(od.performance_level.as_ref()));
    println!("GPU Activity       : {} %", opt_to_string(app.stat.activity.gfx));

    if let Some(cap) = &app.stat.power_cap {
        println!("Power Cap.         : {:3} W ({}-{} W)", cap.current, cap.min, cap.max);
        if let Some(default) = cap.default {
            println!("Power Cap. (Default): {default:3} W");
        }
    }

    println!();
    println!("hwmon: {}", app.stat.sensors.hwmon_path.display());
    for (key, leaf) in app.stat.sensors.leaves() {
        let val = leaf.value.as_ref().map_or(NA.to_string(), |v| v.to_string());
        println!("    {:<24}: {val}", key.to_string());
    }
    if app.stat.sensors.unreadable != 0 {
        println!("    ({} unreadable)", app.stat.sensors.unreadable);
    }
}

fn dump_table(table: &ClockVoltageTable) {
    if !table.supports_table {
        println!("OverDrive table is not available, from pp_dpm_sclk/pp_dpm_mclk:");
    }

    for clk in [DpmClockType::Sclk, DpmClockType::Mclk] {
        println!("{clk}:");

        for (i, s) in table.states(clk).iter().enumerate() {
            match s.voltage {
                Some(v) => println!("    {i}: {:>5} MHz {v:>5} mV", s.clock),
                None => println!("    {i}: {:>5} MHz", s.clock),
            }
        }
    }

    if !table.supports_table { return }

    println!("Range:");
    for (label, range, unit) in [
        ("SCLK", table.gpu_clock_range, "MHz"),
        ("MCLK", table.mem_clock_range, "MHz"),
        ("VDDC", table.voltage_range, "mV"),
    ] {
        println!("    {label:<6}: {} {unit}", opt_to_string(range));
    }
    for (label, range) in &table.extra_ranges {
        println!("    {label:<6}: {range}");
    }
}

fn dump_current_clock(clk: DpmClockType, cur: &CurrentClock) {
    println!(
        "{clk} Clock (Current) : {} MHz (state {})",
        opt_to_string(cur.clock),
        opt_to_string(cur.state),
    );
}

fn print_catalog(catalog: &SignalCatalog) {
    println!(
        "{:<16} {:>10} {:>10} {:>10} {:>10} {:<8}",
        "Signal", "Current", "Min", "Mean", "Max", "Unit",
    );

    for s in catalog.enabled() {
        let stats = s.stats(catalog.precision);
        let [cur, min, mean, max] = [stats.current, stats.min, stats.mean, stats.max].map(|v| {
            v.map_or(NA.to_string(), |v| format!("{v:.prec$}", prec = catalog.precision))
        });

        println!("{:<16} {cur:>10} {min:>10} {mean:>10} {max:>10} {:<8}", s.name, s.si_unit());
    }
}

pub fn run_monitor(
    device_path_list: &[DevicePath],
    opt: &AppOption,
    refresh_period: u64,
    iterations: u32,
) {
    let mut monitors: Vec<AppOdMonitor> = AppAmdgpuOd::from_device_path_list(device_path_list)
        .into_iter()
        .map(|app| AppOdMonitor::new(app, opt))
        .collect();
    let interval = Duration::from_millis(refresh_period);
    let mut n = 0;

    loop {
        std::thread::sleep(interval);

        for monitor in monitors.iter_mut() {
            monitor.tick();

            println!("{}", monitor.app.device_path);
            print_catalog(&monitor.catalog);
            println!();
        }

        if iterations != 0 {
            n += 1;
            if iterations == n { break; }
        }
    }
}
