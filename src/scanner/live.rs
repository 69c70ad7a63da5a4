//! Polls a register range and reports only what changed between polls. Meant
//! for recording a session while settings are changed on the heater's own
//! panel.

use crate::prelude::*;

use super::{format_register_row, format_scan_result, scan_register_range, RegisterInterpretation};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// `(old, new)` pairs for registers whose hex value changed.
pub type Changes = Vec<(RegisterInterpretation, RegisterInterpretation)>;

#[derive(Clone, Debug)]
pub struct LiveScanOptions {
    pub start_register: String,
    pub count: u16,
    pub interval: Duration,
    /// Change blocks are appended here when set.
    pub output: Option<PathBuf>,
    pub include_empty: bool,
}

pub fn diff_scans(
    previous: &HashMap<String, RegisterInterpretation>,
    current: &[RegisterInterpretation],
) -> Changes {
    current
        .iter()
        .filter_map(|reg| {
            let old = previous.get(&reg.register)?;
            (old.hex != reg.hex).then(|| (old.clone(), reg.clone()))
        })
        .collect()
}

pub fn format_changes(changes: &Changes, timestamp: DateTime<Local>) -> String {
    if changes.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        format!(
            "{} - {} change(s)",
            timestamp.format("%Y-%m-%d %H:%M:%S %z"),
            changes.len()
        ),
        String::new(),
    ];

    let separator = "\u{2500}".repeat(60);
    for (i, (old, new)) in changes.iter().enumerate() {
        lines.push(old.register.clone());
        lines.push(format_register_row(old, &format!("  {:<6}", "old")));
        lines.push(format_register_row(new, &format!("  {:<6}", "new")));
        if i + 1 < changes.len() {
            lines.push(separator.clone());
        }
    }
    lines.push(String::new());

    lines.join("\n")
}

#[derive(Serialize)]
struct ChangeEntry<'a> {
    register: &'a str,
    old_hex: &'a str,
    new_hex: &'a str,
    old_int: i16,
    new_int: i16,
    old_scaled_temp: Option<f64>,
    new_scaled_temp: Option<f64>,
    old_scaled_pressure: Option<f64>,
    new_scaled_pressure: Option<f64>,
}

#[derive(Serialize)]
struct ChangeBlock<'a> {
    timestamp: String,
    changes: Vec<ChangeEntry<'a>>,
}

/// A YAML document for appending to a change log, prefixed with a `---`
/// separator. Empty when there is nothing to record.
pub fn serialize_changes(changes: &Changes, timestamp: DateTime<Local>) -> Result<String, serde_yaml::Error> {
    if changes.is_empty() {
        return Ok(String::new());
    }

    let block = ChangeBlock {
        timestamp: timestamp.to_rfc3339(),
        changes: changes
            .iter()
            .map(|(old, new)| ChangeEntry {
                register: &old.register,
                old_hex: &old.hex,
                new_hex: &new.hex,
                old_int: old.raw_int,
                new_int: new.raw_int,
                old_scaled_temp: old.scaled_temp,
                new_scaled_temp: new.scaled_temp,
                old_scaled_pressure: old.scaled_pressure,
                new_scaled_pressure: new.scaled_pressure,
            })
            .collect(),
    };

    Ok(format!("\n---\n{}", serde_yaml::to_string(&block)?))
}

async fn append(path: &Path, content: &str) -> anyhow::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Takes an initial scan, then polls every `interval` and prints changes until
/// Ctrl-C.
pub async fn run_live_scan<B: RegisterBackend + ?Sized>(backend: &B, options: &LiveScanOptions) -> anyhow::Result<()> {
    let result = scan_register_range(backend, &options.start_register, options.count).await?;
    let mut previous: HashMap<String, RegisterInterpretation> = result
        .registers
        .iter()
        .map(|r| (r.register.clone(), r.clone()))
        .collect();

    println!(
        "Live Scan: {} - {} (polling every {:?})",
        options.start_register,
        result.end_register()?,
        options.interval
    );
    let initial = result
        .registers
        .iter()
        .filter(|r| options.include_empty || !r.is_empty())
        .count();
    println!(
        "{} - Initial state ({} registers)\n",
        Local::now().format("%Y-%m-%d %H:%M:%S %z"),
        initial
    );
    println!("{}", format_scan_result(&result, options.include_empty));

    let mut interval = tokio::time::interval(options.interval);
    // the first tick completes immediately
    interval.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Live scan interrupted");
                break;
            }
            _ = interval.tick() => {
                let result = scan_register_range(backend, &options.start_register, options.count).await?;
                let changes = diff_scans(&previous, &result.registers);

                if !changes.is_empty() {
                    let now = Local::now();
                    println!("{}", format_changes(&changes, now));

                    if let Some(path) = &options.output {
                        let block = serialize_changes(&changes, now)?;
                        if let Err(e) = append(path, &block).await {
                            error!("Could not record changes: {:#}", e);
                        }
                    }
                }

                for reg in result.registers {
                    previous.insert(reg.register.clone(), reg);
                }
            }
        }
    }

    Ok(())
}
