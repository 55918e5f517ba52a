pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Whole seconds, e.g. `42s`
pub fn format_seconds(seconds: f64) -> String {
    format!("{}s", seconds.max(0.0).floor() as u64)
}

/// Seconds with one decimal for the live hold timer, e.g. `12.3s`
pub fn format_seconds_with_decimal(seconds: f64) -> String {
    format!("{:.1}s", seconds)
}

/// Session wall time as `m:ss`
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_reps(reps: f64) -> String {
    let count = reps.max(0.0).floor() as u64;
    format!("{} {}", count, if count == 1 { "rep" } else { "reps" })
}

pub fn format_countdown(seconds: u32) -> String {
    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[15., 7., 55., 12., 4.]), Some(18.6));
    }

    #[test]
    fn test_mean_single_value() {
        assert_eq!(mean(&[42.0]), Some(42.0));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(42.9), "42s");
        assert_eq!(format_seconds(0.0), "0s");
    }

    #[test]
    fn test_format_seconds_with_decimal() {
        assert_eq!(format_seconds_with_decimal(12.34), "12.3s");
        assert_eq!(format_seconds_with_decimal(0.0), "0.0s");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(3600), "60:00");
    }

    #[test]
    fn test_format_reps() {
        assert_eq!(format_reps(1.0), "1 rep");
        assert_eq!(format_reps(12.0), "12 reps");
        assert_eq!(format_reps(0.0), "0 reps");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(15), "15s");
    }
}
