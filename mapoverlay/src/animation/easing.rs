//! Progress curves.

use std::time::{Duration, Instant};

/// Normalized progress `min(1, elapsed / duration)`. Zero duration is done.
pub fn progress(start: Instant, now: Instant, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(start).as_secs_f64();
    (elapsed / duration.as_secs_f64()).min(1.0)
}

/// Vertical bounce offset in pixels for progress `t`.
///
/// Rises with an ease-out over the first half to `-height`, then falls back
/// to zero with an ease-in. Negative is up.
pub fn bounce_offset(t: f64, height_px: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        let u = t * 2.0;
        -height_px * (1.0 - (1.0 - u) * (1.0 - u))
    } else {
        let u = (t - 0.5) * 2.0;
        -height_px * (1.0 - u * u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounce_endpoints_and_peak() {
        assert_eq!(bounce_offset(0.0, 20.0), 0.0);
        assert_eq!(bounce_offset(0.5, 20.0), -20.0);
        assert_eq!(bounce_offset(1.0, 20.0), 0.0);
    }

    #[test]
    fn test_bounce_is_continuous_at_peak() {
        let before = bounce_offset(0.4999, 20.0);
        let after = bounce_offset(0.5001, 20.0);
        assert!((before - after).abs() < 0.01);
    }

    #[test]
    fn test_progress() {
        let start = Instant::now();
        let d = Duration::from_millis(100);
        assert_eq!(progress(start, start, d), 0.0);
        assert_eq!(progress(start, start + Duration::from_millis(50), d), 0.5);
        assert_eq!(progress(start, start + Duration::from_secs(9), d), 1.0);
        assert_eq!(progress(start, start, Duration::ZERO), 1.0);
    }
}
