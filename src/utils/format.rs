const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable byte count, e.g. `1.50 MB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// `uploaded / total` for a progress row; the total is omitted while unknown.
pub fn format_transfer(uploaded: u64, total: u64) -> String {
    if total == 0 {
        format_size(uploaded)
    } else {
        format!("{} / {}", format_size(uploaded), format_size(total))
    }
}
