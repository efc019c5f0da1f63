//! XP to level conversion.
//!
//! Levels grow quadratically: reaching level `n` takes `(n - 1)^2 * 100` XP.

use serde::{Deserialize, Serialize};

/// XP scale factor of the level curve.
pub const XP_PER_LEVEL_UNIT: u64 = 100;

/// Integer square root (floor).
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    // Correct float rounding in either direction.
    while x.checked_mul(x).map_or(true, |sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).map_or(false, |sq| sq <= n) {
        x += 1;
    }
    x
}

/// `floor(sqrt(xp / 100)) + 1`
pub fn level_from_xp(xp: u64) -> u32 {
    let level = isqrt(xp / XP_PER_LEVEL_UNIT) + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// XP at which `level` starts and at which the next level starts.
pub fn xp_bounds(level: u32) -> (u64, u64) {
    let level = level.max(1) as u64;
    let floor = (level - 1).saturating_mul(level - 1).saturating_mul(XP_PER_LEVEL_UNIT);
    let ceiling = level.saturating_mul(level).saturating_mul(XP_PER_LEVEL_UNIT);
    (floor, ceiling)
}

/// Where a user sits inside their current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub xp: u64,
    pub xp_for_level: u64,
    pub xp_for_next_level: u64,
    pub xp_progress: u64,
    pub xp_needed: u64,
    pub xp_to_next_level: u64,
    pub progress_percentage: u8,
}

impl LevelProgress {
    pub fn from_xp(xp: u64) -> Self {
        let level = level_from_xp(xp);
        let (xp_for_level, xp_for_next_level) = xp_bounds(level);
        let xp_progress = xp - xp_for_level;
        let xp_needed = xp_for_next_level - xp_for_level;
        let percentage = (xp_progress as f64 / xp_needed as f64 * 100.0).round() as u8;

        Self {
            level,
            xp,
            xp_for_level,
            xp_for_next_level,
            xp_progress,
            xp_needed,
            xp_to_next_level: xp_for_next_level - xp,
            progress_percentage: percentage.min(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_curve_reference_points() {
        assert_eq!(level_from_xp(0), 1);
        assert_eq!(level_from_xp(99), 1);
        assert_eq!(level_from_xp(100), 2);
        assert_eq!(level_from_xp(399), 2);
        assert_eq!(level_from_xp(400), 3);
        assert_eq!(level_from_xp(1_600), 5);
        assert_eq!(level_from_xp(1_599), 4);
    }

    #[test]
    fn level_is_monotonic_and_bracketed() {
        let mut previous = 1;
        for xp in (0..50_000u64).step_by(7) {
            let level = level_from_xp(xp);
            assert!(level >= previous, "level dropped at xp {}", xp);
            let (low, high) = xp_bounds(level);
            assert!(low <= xp && xp < high, "xp {} outside {:?}", xp, (low, high));
            previous = level;
        }
    }

    #[test]
    fn isqrt_handles_large_values() {
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
        assert_eq!(isqrt(1 << 62), 1 << 31);
        assert_eq!(level_from_xp(u64::MAX), 429_496_730);
    }

    #[test]
    fn bounds_for_first_levels() {
        assert_eq!(xp_bounds(1), (0, 100));
        assert_eq!(xp_bounds(2), (100, 400));
        assert_eq!(xp_bounds(3), (400, 900));
    }

    #[test]
    fn progress_inside_level() {
        let progress = LevelProgress::from_xp(250);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.xp_progress, 150);
        assert_eq!(progress.xp_needed, 300);
        assert_eq!(progress.xp_to_next_level, 150);
        assert_eq!(progress.progress_percentage, 50);
    }
}
