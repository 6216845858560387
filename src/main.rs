use anyhow::{bail, Context};
use libamdgpu_od::{AppOption, DevicePath, KernelVersion, OverdriveStatus};

mod args;
use args::{AppMode, DumpMode, MainOpt};

mod dump_info;

const TITLE: &str = env!("TITLE");

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

fn kernel_version() -> Option<KernelVersion> {
    let uts = nix::sys::utsname::uname().ok()?;

    KernelVersion::parse(uts.release().to_str()?)
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let main_opt = MainOpt::parse();

    if main_opt.dump_mode == DumpMode::Version {
        #[cfg(feature = "json")]
        {
            if main_opt.app_mode == AppMode::JSON {
                amdgpu_od_json::version_json(TITLE);
                return Ok(());
            }
        }

        println!("{TITLE}");
        return Ok(());
    }

    let kernel = kernel_version();

    match kernel {
        Some(ver) if ver < KernelVersion::MIN_SUPPORTED => bail!(
            "Linux {ver} is not supported, {} or later is required",
            KernelVersion::MIN_SUPPORTED,
        ),
        Some(ver) => log::debug!("Linux {ver}"),
        None => log::warn!("Failed to get the kernel version"),
    }

    let overdrive = OverdriveStatus::get();

    if let Some(suggested) = overdrive.suggested_mask() {
        log::warn!(
            "OverDrive is disabled, boot with \"amdgpu.ppfeaturemask={suggested:#x}\" to enable it",
        );
    }

    let device_path_list = match main_opt.instance {
        Some(i) => vec![
            DevicePath::new(i).with_context(|| format!("Failed to select card{i}"))?,
        ],
        None => DevicePath::get_device_path_list(),
    };

    if device_path_list.is_empty() {
        bail!(
            "No AMDGPU device found in {}",
            DevicePath::sysfs_root().join("class/drm").display(),
        );
    }

    let opt = AppOption {
        max_points: main_opt.max_points,
        precision: main_opt.precision,
        kernel,
    };

    match main_opt.dump_mode {
        DumpMode::List => {
            dump_info::dump_list(&device_path_list);
            return Ok(());
        },
        DumpMode::Info => {
            #[cfg(feature = "json")]
            {
                if main_opt.app_mode == AppMode::JSON {
                    amdgpu_od_json::dump_json(&device_path_list);
                    return Ok(());
                }
            }

            dump_info::dump_all(TITLE, &device_path_list, &overdrive);
            return Ok(());
        },
        DumpMode::Version | DumpMode::NoDump => {},
    }

    match main_opt.app_mode {
        AppMode::Monitor => dump_info::run_monitor(
            &device_path_list,
            &opt,
            main_opt.refresh_period,
            main_opt.iterations,
        ),
        #[cfg(feature = "json")]
        AppMode::JSON => {
            let mut j = amdgpu_od_json::JsonApp::new(
                TITLE,
                &device_path_list,
                &opt,
                main_opt.refresh_period,
                main_opt.iterations,
            );

            j.run();
        },
    }

    Ok(())
}
