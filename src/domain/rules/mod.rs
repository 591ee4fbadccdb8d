// Domain rules - Naming, labelling and ordering policies

use std::cmp::Reverse;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::model::Entry;

/// Characters that cannot appear in generated file names
pub const DROP_CHARS: &str = "/;:<>&";

/// Extension every remuxed segment is written with
pub const REMUX_EXTENSION: &str = ".MKV";

/// Source extensions that are split by remuxing rather than by direct trim
const REMUX_FAMILIES: &[&str] = &["", ".mkv", ".mp4", ".webm"];

/// Replace spaces with underscores and unsafe characters with dashes
pub fn clean_filename(text: &str) -> String {
    text.replace(' ', "_")
        .chars()
        .map(|c| if DROP_CHARS.contains(c) { '-' } else { c })
        .collect()
}

/// Strip the `(2)` suffixes clip tools append to default names
pub fn sanitize_label(text: &str) -> String {
    let mut label = text.trim();
    while let Some(stripped) = label.strip_suffix("(2)") {
        label = stripped.trim_end();
    }
    label.to_string()
}

/// Split a file name at its last dot; the extension keeps the dot
pub fn splitext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Last `/`- or `\`-separated component of a path or URL string
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Insert `suffix` between a file name's stem and extension
pub fn insert_filename_suffix(name: &str, suffix: &str) -> String {
    let (stem, ext) = splitext(name);
    format!("{}{}{}", stem, suffix, ext)
}

/// Whether a source container is split by remuxing into Matroska
pub fn needs_remux(extension: &str) -> bool {
    REMUX_FAMILIES.contains(&extension.to_lowercase().as_str())
}

/// `H:MM:SS` with leading zero fields trimmed, e.g. `1:05` or `1:02:05`
pub fn duration_label(duration: Decimal) -> String {
    let total = duration.round().to_u64().unwrap_or(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// `1,234,567 bytes`
pub fn size_label(size: u64) -> String {
    let digits = size.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{} bytes", grouped)
}

/// `2.1 Mpx @ 4.5 Mbit`
pub fn quality_label(width: u64, height: u64, bit_rate: u64) -> String {
    let mpixels = (width * height) as f64 / 1e6;
    if bit_rate > 0 {
        format!("{:.1} Mpx @ {:.1} Mbit", mpixels, bit_rate as f64 / 1e6)
    } else {
        format!("{:.1} Mpx", mpixels)
    }
}

/// Sort key putting reachable, wide, high bit-rate entries first
pub fn video_quality_key(entry: &Entry) -> (bool, Reverse<u64>, Reverse<u64>, usize) {
    (
        !entry.is_reachable(),
        Reverse(entry.width()),
        Reverse(entry.bit_rate()),
        entry.order,
    )
}

#[cfg(test)]
mod tests;
