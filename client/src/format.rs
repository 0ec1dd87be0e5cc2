//! Display formatting shared by the front end.

/// Render a byte count with binary units, e.g. `1.5 KB`.
#[must_use]
pub fn human_size(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if !bytes.is_finite() || bytes < 1024.0 {
        return format!("{bytes} B");
    }
    let mut value = bytes / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_print_bytes() {
        assert_eq!(human_size(0.0), "0 B");
        assert_eq!(human_size(1023.0), "1023 B");
        assert_eq!(human_size(-5.0), "-5 B");
    }

    #[test]
    fn larger_sizes_use_one_decimal() {
        assert_eq!(human_size(1024.0), "1.0 KB");
        assert_eq!(human_size(1536.0), "1.5 KB");
        assert_eq!(human_size(5.0 * 1024.0 * 1024.0), "5.0 MB");
        assert_eq!(human_size(1024f64.powi(3) * 2.0), "2.0 GB");
    }

    #[test]
    fn terabytes_are_the_ceiling() {
        assert_eq!(human_size(1024f64.powi(5)), "1024.0 TB");
    }
}
