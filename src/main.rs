use anyhow::{anyhow, bail, Result};
use std::io::Write;
use std::time::Duration;

use kospel_cmi::controller::TYPED_SETTINGS;
use kospel_cmi::options::{Command, Options};
use kospel_cmi::prelude::*;
use kospel_cmi::scanner::{self, live};

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();
    let config = Config::from_options(&options)?;

    init_logging(config.loglevel());
    info!("kospel {} starting", kospel_cmi::CARGO_PKG_VERSION);
    config.log_summary();
    config.require_backend()?;

    let backend = Backend::from_config(&config)?;
    let result = run(options.command, &config, &backend).await;
    backend.release().await;

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}

/// Runs one subcommand. `Ok(false)` means it ran but did not fully succeed.
async fn run(command: Command, config: &Config, backend: &Backend) -> Result<bool> {
    match command {
        Command::Scan { range, output } => {
            let result = scanner::scan_register_range(backend, &range.start_register, range.count).await?;
            match output {
                Some(path) => {
                    scanner::write_scan_result(&path, &result, range.show_empty).await?;
                    println!("Wrote scan to {}", path.display());
                }
                None => println!("{}", scanner::format_scan_result(&result, range.show_empty)),
            }
            Ok(true)
        }

        Command::Watch {
            range,
            output,
            interval,
        } => {
            if !interval.is_finite() || interval <= 0.0 {
                bail!("--interval must be a positive number of seconds");
            }
            let options = live::LiveScanOptions {
                start_register: range.start_register,
                count: range.count,
                interval: Duration::from_secs_f64(interval),
                output,
                include_empty: range.show_empty,
            };
            live::run_live_scan(backend, &options).await?;
            Ok(true)
        }

        Command::Show => {
            let mut controller = HeaterController::new(backend, load_registry(config)?);
            controller.refresh().await;
            print!("{}", controller.format_settings());
            Ok(true)
        }

        Command::Set { assignments } => {
            let pairs = Command::assignments(&assignments)
                .ok_or_else(|| anyhow!("expected NAME VALUE pairs, got {} argument(s)", assignments.len()))?;

            let mut controller = HeaterController::new(backend, load_registry(config)?);
            controller.refresh().await;

            for (name, raw) in pairs {
                let value: SettingValue = raw
                    .parse()
                    .map_err(|e| anyhow!("{}: {}", name, e))?;
                controller.set_setting(name, value)?;
            }

            let saved = controller.save().await;
            print!("{}", controller.format_settings());
            if !saved {
                error!("Not all settings were saved");
            }
            Ok(saved)
        }
    }
}

fn load_registry(config: &Config) -> Result<Arc<Registry>> {
    let registry = Registry::open(config.registry())?;
    info!("Loaded registry {} ({} settings)", config.registry(), registry.len());

    let missing = registry.missing(TYPED_SETTINGS);
    if !missing.is_empty() {
        warn!("Registry does not define: {}", missing.join(", "));
    }
    Ok(Arc::new(registry))
}
