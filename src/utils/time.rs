//! Time parsing for command-line arguments

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::model::Seconds;
use crate::error::{ScreencapError, ScreencapResult};

/// Parse `SS`, `MM:SS` or `HH:MM:SS` (each with optional fraction) into seconds
pub fn parse_seconds(text: &str) -> ScreencapResult<Seconds> {
    let text = text.trim();
    let invalid = || ScreencapError::Config {
        message: format!("invalid time '{}': expected SS, MM:SS or HH:MM:SS", text),
    };

    let parts: Vec<&str> = text.split(':').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    let (last, leading) = parts.split_last().ok_or_else(invalid)?;
    let seconds = Decimal::from_str(last).map_err(|_| invalid())?;
    if seconds.is_sign_negative() || (!leading.is_empty() && seconds >= Decimal::from(60)) {
        return Err(invalid());
    }

    let mut total = Decimal::ZERO;
    for (position, part) in leading.iter().enumerate() {
        let value: u32 = part.parse().map_err(|_| invalid())?;
        // minutes are the last leading field and must stay below an hour
        let is_minutes = position + 1 == leading.len();
        if is_minutes && leading.len() == 2 && value >= 60 {
            return Err(invalid());
        }
        total = total * Decimal::from(60) + Decimal::from(value);
    }
    Ok((total * Decimal::from(60) + seconds).normalize())
}

/// Format seconds as `H:MM:SS.fff`, dropping an empty fraction
pub fn format_seconds(seconds: Seconds) -> String {
    let whole = seconds.trunc();
    let fraction = (seconds - whole).normalize();
    let total = whole.to_i64().unwrap_or(0);
    let base = format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60);
    if fraction.is_zero() {
        base
    } else {
        let digits = fraction.to_string();
        format!("{}{}", base, digits.trim_start_matches('0'))
    }
}
