//! Display formatting for speeds, distances, sizes and times.

use chrono::NaiveDateTime;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn format_speed(speed_kmh: f64) -> String {
    if speed_kmh < 1.0 {
        return "0 km/h".to_string();
    }
    format!("{:.1} km/h", speed_kmh)
}

/// Meters below one kilometer, kilometers from there on
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        return format!("{:.0} m", meters);
    }
    format!("{:.2} km", meters / 1000.0)
}

/// 1024-based sizes with at most two decimals
pub fn format_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }

    let bytes = bytes as f64;
    let exponent = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(SIZE_UNITS.len() - 1);
    let value = bytes / 1024f64.powi(exponent as i32);

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", rendered, SIZE_UNITS[exponent])
}

/// Render seconds as `1d 2h 3m 4s`, dropping leading zero units
pub fn format_duration(total_secs: i64) -> String {
    if total_secs <= 0 {
        return "0s".to_string();
    }

    let units = [
        (total_secs / 86_400, "d"),
        (total_secs % 86_400 / 3_600, "h"),
        (total_secs % 3_600 / 60, "m"),
        (total_secs % 60, "s"),
    ];

    units
        .iter()
        .skip_while(|(value, _)| *value == 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed() {
        assert_eq!(format_speed(0.0), "0 km/h");
        assert_eq!(format_speed(0.9), "0 km/h");
        assert_eq!(format_speed(-5.0), "0 km/h");
        assert_eq!(format_speed(62.34), "62.3 km/h");
    }

    #[test]
    fn distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(111_200.0), "111.20 km");
    }

    #[test]
    fn file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(-1), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024 + 300 * 1024), "5.29 MB");
        assert_eq!(format_file_size(3 * 1024_i64.pow(5)), "3072 TB");
    }

    #[test]
    fn duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(-3), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3_725), "1h 2m 5s");
        assert_eq!(format_duration(86_400), "1d 0h 0m 0s");
    }

    #[test]
    fn timestamp() {
        let time: NaiveDateTime = "2024-06-01T08:05:09.5".parse().unwrap();
        assert_eq!(format_timestamp(&time), "2024-06-01 08:05:09");
    }
}
