//! Shared formatting helpers for metric values.

/// Format byte count with binary (IEC) units and two decimals.
///
/// `"512 B"`, `"1.50 KiB"`, `"15.62 GiB"`
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    while exp + 1 < SUFFIXES.len() && bytes / div >= UNIT {
        div *= UNIT;
        exp += 1;
    }
    format!("{:.2} {}iB", bytes as f64 / div as f64, SUFFIXES[exp])
}

/// Format a percentage with two decimals: `"62.50%"`.
pub fn format_percent(percent: f64) -> String {
    format!("{:.2}%", percent)
}

/// Two-decimal number without unit, `"-"` when unknown.
pub fn format_decimal(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
