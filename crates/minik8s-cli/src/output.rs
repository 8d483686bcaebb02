//! Formatted output helpers for CLI commands.

/// Formats a byte count with binary units, e.g. `128.0 MiB`.
///
/// Zero prints as `-`, the engine's value for "no limit".
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10)];

    if bytes == 0 {
        return "-".to_string();
    }
    UNITS
        .iter()
        .find(|(_, size)| bytes >= *size)
        .map_or_else(
            || format!("{bytes} B"),
            |(unit, size)| format!("{:.1} {unit}", bytes as f64 / *size as f64),
        )
}
