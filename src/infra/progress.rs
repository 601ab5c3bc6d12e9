// ============================================================
// Layer 6 — Progress Display
// ============================================================

const BAR_WIDTH: usize = 10;

/// Text bar for a completed fraction, e.g. `[####      ] 40.00%`.
/// The fraction is clamped to [0, 1].
pub fn progress_bar(fraction: f64) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled   = (fraction * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:.2}%",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        fraction * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_bar() {
        assert_eq!(progress_bar(0.4), "[####      ] 40.00%");
    }

    #[test]
    fn test_bar_is_clamped() {
        assert_eq!(progress_bar(1.7), format!("[{}] 100.00%", "#".repeat(10)));
        assert_eq!(progress_bar(-0.2), format!("[{}] 0.00%", " ".repeat(10)));
    }
}
