//! Parsing of human-readable quantities.
//!
//! Configuration values are written the way hardware people write them:
//! `"256kB"`, `"1GHz"`, `"13.75ns"`, `"1V"`. Sizes use binary multiples
//! (`kB` = 1024 bytes). Times resolve to ticks, where one tick is one picosecond.

use super::constants::TICKS_PER_SECOND;
use super::error::ConfigError;

/// The engine's discrete unit of virtual time (1 ps).
pub type Tick = u64;

/// A clock frequency in hertz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(u64);

impl Frequency {
    /// Wraps a frequency in hertz.
    pub const fn from_hz(hz: u64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in hertz.
    pub const fn hz(self) -> u64 {
        self.0
    }

    /// Clock period in ticks, rounded to the nearest tick.
    pub const fn period_ticks(self) -> Tick {
        (TICKS_PER_SECOND + self.0 / 2) / self.0
    }
}

/// Splits `"13.75ns"` into `("13.75", "ns")`.
fn split_quantity(input: &str) -> Option<(&str, &str)> {
    let s = input.trim();
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(idx);
    if number.is_empty() {
        return None;
    }
    Some((number, unit.trim()))
}

/// Scales a decimal literal by an integer multiplier without going through
/// floating point when the literal is integral.
fn scale(number: &str, multiplier: u64) -> Result<u64, String> {
    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| "value does not fit in 64 bits".to_string());
    }
    let value: f64 = number
        .parse()
        .map_err(|_| format!("'{number}' is not a number"))?;
    let scaled = value * multiplier as f64;
    if !scaled.is_finite() || scaled >= u64::MAX as f64 {
        return Err("value does not fit in 64 bits".to_string());
    }
    Ok(scaled.round() as u64)
}

/// Parses a memory size such as `"256kB"`, `"512MB"` or `"64"` into bytes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSize`] for empty strings, unknown suffixes,
/// fractional byte counts and values that overflow.
pub fn parse_memory_size(input: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidSize {
        value: input.to_string(),
        reason,
    };
    if input.trim().is_empty() {
        return Err(invalid("empty size string".to_string()));
    }
    let (number, unit) = split_quantity(input).ok_or_else(|| invalid("missing number".into()))?;
    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "k" | "K" | "kB" | "KB" | "KiB" | "kiB" => 1 << 10,
        "M" | "MB" | "MiB" => 1 << 20,
        "G" | "GB" | "GiB" => 1 << 30,
        "T" | "TB" | "TiB" => 1 << 40,
        other => return Err(invalid(format!("unknown size unit '{other}'"))),
    };
    if number.contains('.') {
        let value: f64 = number
            .parse()
            .map_err(|_| invalid(format!("'{number}' is not a number")))?;
        let bytes = value * multiplier as f64;
        if bytes.fract() != 0.0 {
            return Err(invalid("size is not a whole number of bytes".into()));
        }
    }
    scale(number, multiplier).map_err(invalid)
}

/// Parses a frequency such as `"1GHz"` or `"500MHz"`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFrequency`] for malformed input, zero, or
/// frequencies above one tick per period.
pub fn parse_frequency(input: &str) -> Result<Frequency, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidFrequency {
        value: input.to_string(),
        reason,
    };
    let (number, unit) = split_quantity(input).ok_or_else(|| invalid("missing number".into()))?;
    let multiplier: u64 = match unit {
        "Hz" => 1,
        "kHz" => 1_000,
        "MHz" => 1_000_000,
        "GHz" => 1_000_000_000,
        other => return Err(invalid(format!("unknown frequency unit '{other}'"))),
    };
    let hz = scale(number, multiplier).map_err(invalid)?;
    if hz == 0 {
        return Err(invalid("frequency must be non-zero".into()));
    }
    if hz > TICKS_PER_SECOND {
        return Err(invalid("period is shorter than one tick".into()));
    }
    Ok(Frequency(hz))
}

/// Parses a duration such as `"13.75ns"` into ticks.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidTime`] for malformed input or unknown units.
pub fn parse_time(input: &str) -> Result<Tick, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTime {
        value: input.to_string(),
        reason,
    };
    let (number, unit) = split_quantity(input).ok_or_else(|| invalid("missing number".into()))?;
    let multiplier: u64 = match unit {
        "ps" | "t" => 1,
        "ns" => 1_000,
        "us" => 1_000_000,
        "ms" => 1_000_000_000,
        "s" => TICKS_PER_SECOND,
        other => return Err(invalid(format!("unknown time unit '{other}'"))),
    };
    scale(number, multiplier).map_err(invalid)
}

/// Parses a voltage such as `"1V"` or `"900mV"` into millivolts.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidVoltage`] for malformed input, unknown units,
/// or a zero voltage.
pub fn parse_voltage(input: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidVoltage {
        value: input.to_string(),
        reason,
    };
    let (number, unit) = split_quantity(input).ok_or_else(|| invalid("missing number".into()))?;
    let multiplier: u64 = match unit {
        "mV" => 1,
        "V" => 1_000,
        other => return Err(invalid(format!("unknown voltage unit '{other}'"))),
    };
    let mv = scale(number, multiplier).map_err(invalid)?;
    if mv == 0 {
        return Err(invalid("voltage must be non-zero".into()));
    }
    u32::try_from(mv).map_err(|_| invalid("voltage out of range".into()))
}
