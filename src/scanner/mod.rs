//! Register range scanning for reverse-engineering the register map.
//!
//! A scan reads a contiguous block of registers and interprets each one every
//! way it might plausibly be meant: raw integer, scaled temperature, scaled
//! pressure and individual bits.

use crate::prelude::*;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod live;

pub const FORMAT_VERSION: &str = "1";

const SET_GLYPH: char = '\u{25CF}';
const CLEAR_GLYPH: char = '\u{00B7}';

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegisterInterpretation {
    #[serde(skip)]
    pub register: String,
    pub hex: String,
    pub raw_int: i16,
    pub scaled_temp: Option<f64>,
    pub scaled_pressure: Option<f64>,
    pub bits: BTreeMap<u8, bool>,
}

impl RegisterInterpretation {
    pub fn new(register: &str, hex_val: &str) -> Self {
        let raw_int = reg_to_int(hex_val);
        Self {
            register: register.to_string(),
            hex: hex_val.to_string(),
            raw_int,
            scaled_temp: registers::decoders::decode_scaled_temp(hex_val),
            scaled_pressure: registers::decoders::decode_scaled_pressure(hex_val),
            bits: (0..16).map(|i| (i, get_bit(raw_int, i))).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hex == registers::EMPTY_REGISTER
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegisterScanResult {
    pub start_register: String,
    pub count: u16,
    pub registers: Vec<RegisterInterpretation>,
}

impl RegisterScanResult {
    pub fn end_register(&self) -> Result<String, Error> {
        end_register(&self.start_register, self.count)
    }

    fn displayed(&self, include_empty: bool) -> Vec<&RegisterInterpretation> {
        self.registers
            .iter()
            .filter(|r| include_empty || !r.is_empty())
            .collect()
    }

    /// Raw register values keyed by address, as `ingest_registers` expects.
    pub fn to_register_map(&self) -> HashMap<String, String> {
        self.registers
            .iter()
            .map(|r| (r.register.clone(), r.hex.clone()))
            .collect()
    }
}

/// Last address of a `count`-long range starting at `start_register`.
pub fn end_register(start_register: &str, count: u16) -> Result<String, Error> {
    let prefix = registers::utils::reg_address_prefix(start_register)?;
    let start = reg_address_to_int(start_register)? as u32;
    int_to_reg_address(prefix, (start + count as u32).saturating_sub(1))
}

/// Reads `count` registers from `start_register`. Registers the backend did
/// not return are filled in as `"0000"`.
pub async fn scan_register_range<B: RegisterBackend + ?Sized>(
    backend: &B,
    start_register: &str,
    count: u16,
) -> Result<RegisterScanResult, Error> {
    let prefix = registers::utils::reg_address_prefix(start_register)?;
    let start = reg_address_to_int(start_register)? as u32;
    // validate the whole range before touching the device
    end_register(start_register, count)?;

    let raw = backend.read_registers(start_register, count).await;
    if raw.is_empty() {
        warn!("No registers returned for {} (+{})", start_register, count);
    }

    let mut interpretations = Vec::with_capacity(count as usize);
    for index in start..start + count as u32 {
        let register = int_to_reg_address(prefix, index)?;
        let hex_val = raw
            .get(&register)
            .map(String::as_str)
            .unwrap_or(registers::EMPTY_REGISTER);
        interpretations.push(RegisterInterpretation::new(&register, hex_val));
    }

    Ok(RegisterScanResult {
        start_register: start_register.to_string(),
        count,
        registers: interpretations,
    })
}

/// One table row. `first_col` is the already padded leading column, e.g. the
/// address or an `old`/`new` label.
pub fn format_register_row(reg: &RegisterInterpretation, first_col: &str) -> String {
    let temp = reg
        .scaled_temp
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string());
    let press = reg
        .scaled_pressure
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string());

    // most significant bit first, in nibbles
    let bits: Vec<char> = (0..16u8)
        .rev()
        .map(|i| {
            if reg.bits.get(&i).copied().unwrap_or(false) {
                SET_GLYPH
            } else {
                CLEAR_GLYPH
            }
        })
        .collect();
    let bits = bits
        .chunks(4)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{} {:<6} {:>7} {:>6} {:>6}  {}",
        first_col, reg.hex, reg.raw_int, temp, press, bits
    )
}

pub fn format_scan_result(result: &RegisterScanResult, include_empty: bool) -> String {
    let end = result
        .end_register()
        .unwrap_or_else(|_| result.start_register.clone());
    let displayed = result.displayed(include_empty);

    let mut lines = Vec::new();
    if !include_empty && displayed.len() < result.count as usize {
        lines.push(format!(
            "Register Scan: {} - {} ({} of {} registers, empty hidden)",
            result.start_register,
            end,
            displayed.len(),
            result.count
        ));
    } else {
        lines.push(format!(
            "Register Scan: {} - {} ({} registers)",
            result.start_register,
            end,
            displayed.len()
        ));
    }
    lines.push(String::new());

    if displayed.is_empty() {
        lines.push("(no registers)".to_string());
        return lines.join("\n");
    }

    lines.push(format!(
        "{:<8} {:<6} {:>7} {:>6} {:>6}  Bits",
        "Register", "Hex", "Int", "°C", "bar"
    ));
    lines.push(format!(
        "{} {} {} {} {}  {}",
        "-".repeat(8),
        "-".repeat(6),
        "-".repeat(7),
        "-".repeat(6),
        "-".repeat(6),
        "-".repeat(19)
    ));
    for reg in displayed {
        lines.push(format_register_row(reg, &format!("{:<8}", reg.register)));
    }

    lines.join("\n")
}

// serialisation {{{
#[derive(Serialize)]
struct ScanMeta<'a> {
    start_register: &'a str,
    count: u16,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hide_empty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registers_shown: Option<usize>,
}

#[derive(Serialize)]
struct ScanDocument<'a> {
    format_version: &'static str,
    scan: ScanMeta<'a>,
    registers: BTreeMap<&'a str, &'a RegisterInterpretation>,
}

pub fn serialize_scan_result(result: &RegisterScanResult, include_empty: bool) -> Result<String, serde_yaml::Error> {
    serialize_scan_result_at(result, include_empty, Utc::now())
}

/// As [`serialize_scan_result`] with an explicit scan time.
pub fn serialize_scan_result_at(
    result: &RegisterScanResult,
    include_empty: bool,
    timestamp: DateTime<Utc>,
) -> Result<String, serde_yaml::Error> {
    let displayed = result.displayed(include_empty);

    let doc = ScanDocument {
        format_version: FORMAT_VERSION,
        scan: ScanMeta {
            start_register: &result.start_register,
            count: result.count,
            timestamp: timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            hide_empty: (!include_empty).then_some(true),
            registers_shown: (!include_empty).then_some(displayed.len()),
        },
        registers: displayed
            .into_iter()
            .map(|r| (r.register.as_str(), r))
            .collect(),
    };

    serde_yaml::to_string(&doc)
}

pub async fn write_scan_result(
    path: &std::path::Path,
    result: &RegisterScanResult,
    include_empty: bool,
) -> anyhow::Result<()> {
    let content = serialize_scan_result(result, include_empty)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}
// }}}
