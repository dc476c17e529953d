use std::time::Duration;

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn mb_from_bytes(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

/// Output megabytes per second, rounded to two decimals for the summary log.
/// A sub-second run reports the plain size to avoid a division blow-up.
pub fn throughput_mb_s(bytes: u64, elapsed: Duration) -> f64 {
    let total_mb = mb_from_bytes(bytes);
    let value = if elapsed.as_secs_f64() > 0.0 {
        total_mb / elapsed.as_secs_f64()
    } else {
        total_mb
    };
    (value * 100.0).round() / 100.0
}
