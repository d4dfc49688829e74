//! Time utilities for the frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const FRAME_TPS: u32 = 60; // 60 physics frames per second
pub const SNAPSHOT_TPS: u32 = 20; // 20 renderer snapshots per second
pub const FUSE_SCAN_MILLIS: u64 = 100;
pub const ANIMATION_MILLIS: u64 = 50;
pub const STATUS_PUSH_MILLIS: u64 = 500;

/// Upper bound for a single frame's delta time (seconds)
pub const MAX_FRAME_DELTA: f32 = 1.0 / 20.0;

/// Nominal duration of one frame
pub fn frame_duration() -> Duration {
    Duration::from_micros(1_000_000 / FRAME_TPS as u64)
}

/// Measured delta time between two frames, clamped to `[0, MAX_FRAME_DELTA]`
pub fn frame_delta(last: Instant, now: Instant) -> f32 {
    now.saturating_duration_since(last)
        .as_secs_f32()
        .min(MAX_FRAME_DELTA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_delta_is_clamped() {
        let start = Instant::now();
        assert_eq!(frame_delta(start, start), 0.0);
        assert_eq!(frame_delta(start, start + Duration::from_secs(3)), MAX_FRAME_DELTA);
        // Clock going backwards never yields a negative delta
        assert_eq!(frame_delta(start + Duration::from_secs(1), start), 0.0);
    }

    #[test]
    fn frame_duration_matches_rate() {
        assert_eq!(frame_duration(), Duration::from_micros(16_666));
    }
}
