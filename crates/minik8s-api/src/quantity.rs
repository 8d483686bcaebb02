//! CPU and memory quantity parsing.
//!
//! CPU quantities are cores (`"2"`, `"0.25"`) or millicores (`"250m"`) and
//! convert to engine nano-CPUs. Memory quantities are bytes, optionally
//! with a binary (`Ki`, `Mi`, `Gi`, `Ti`) or decimal (`K`, `M`, `G`, `T`)
//! suffix. The number may be fractional (`1.5Gi`) or in exponent form
//! (`1e9`); fractional bytes round up. A bare integer passes through
//! unchanged.

use minik8s_common::constants::NANO_CPUS_PER_CORE;
use minik8s_common::error::{Minik8sError, Result};

/// Converts a CPU quantity into engine nano-CPUs.
///
/// # Errors
///
/// Returns [`Minik8sError::InvalidQuantity`] if the text is not a
/// non-negative core or millicore count.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cpu_to_nano(value: &str) -> Result<i64> {
    let invalid = || Minik8sError::InvalidQuantity {
        resource: "cpu",
        value: value.to_string(),
    };
    let text = value.trim();
    if let Some(millis) = text.strip_suffix('m') {
        let millis: i64 = millis.parse().map_err(|_| invalid())?;
        if millis < 0 {
            return Err(invalid());
        }
        return millis.checked_mul(1_000_000).ok_or_else(invalid);
    }
    let cores: f64 = text.parse().map_err(|_| invalid())?;
    if !cores.is_finite() || cores < 0.0 {
        return Err(invalid());
    }
    let nanos = (cores * NANO_CPUS_PER_CORE as f64).round();
    if nanos > i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(nanos as i64)
}

/// Converts a memory quantity into bytes.
///
/// # Errors
///
/// Returns [`Minik8sError::InvalidQuantity`] for unknown suffixes,
/// non-numeric text, or values that overflow.
#[allow(
    clippy::option_if_let_else,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
pub fn memory_to_bytes(value: &str) -> Result<i64> {
    let invalid = || Minik8sError::InvalidQuantity {
        resource: "memory",
        value: value.to_string(),
    };
    let s = value.trim();
    let (num_str, multiplier): (&str, i64) = if let Some(n) = s.strip_suffix("Ti") {
        (n, 1 << 40)
    } else if let Some(n) = s.strip_suffix("Gi") {
        (n, 1 << 30)
    } else if let Some(n) = s.strip_suffix("Mi") {
        (n, 1 << 20)
    } else if let Some(n) = s.strip_suffix("Ki") {
        (n, 1 << 10)
    } else if let Some(n) = s.strip_suffix('T') {
        (n, 1_000_000_000_000)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1_000_000_000)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('K').or_else(|| s.strip_suffix('k')) {
        (n, 1000)
    } else {
        (s, 1)
    };
    let num_str = num_str.trim();
    if let Ok(n) = num_str.parse::<i64>() {
        if n < 0 {
            return Err(invalid());
        }
        return n.checked_mul(multiplier).ok_or_else(invalid);
    }
    let n: f64 = num_str.parse().map_err(|_| invalid())?;
    if !n.is_finite() || n < 0.0 {
        return Err(invalid());
    }
    let bytes = (n * multiplier as f64).ceil();
    if bytes >= i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as i64)
}
