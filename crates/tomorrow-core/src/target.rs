//! Randomized echo point placement and day arithmetic.

use std::f64::consts::TAU;

use rand::Rng;
use tomorrow_types::BlockPos;

/// Planar target cell; the height comes from the host's terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanarTarget {
    /// X cell.
    pub x: i32,
    /// Z cell.
    pub z: i32,
}

impl PlanarTarget {
    /// Attach a height.
    pub const fn with_height(self, y: i32) -> BlockPos {
        BlockPos::new(self.x, y, self.z)
    }
}

/// Pick a cell at a uniform angle and an integer distance in
/// `[min_distance, max_distance]` around `origin`.
///
/// The same RNG state always yields the same cell.
pub fn generate_target<R: Rng>(
    origin: BlockPos,
    min_distance: u32,
    max_distance: u32,
    rng: &mut R,
) -> PlanarTarget {
    let angle = rng.random::<f64>() * TAU;
    let (lo, hi) = if min_distance <= max_distance {
        (min_distance, max_distance)
    } else {
        (max_distance, min_distance)
    };
    let distance = f64::from(rng.random_range(lo..=hi));

    PlanarTarget {
        x: origin.x.saturating_add(round_to_cell(angle.cos() * distance)),
        z: origin.z.saturating_add(round_to_cell(angle.sin() * distance)),
    }
}

/// Whole game days elapsed at `time`.
pub const fn day_index(time: u64, ticks_per_day: u64) -> u64 {
    match time.checked_div(ticks_per_day) {
        Some(day) => day,
        None => 0,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_cell(offset: f64) -> i32 {
    // Offsets are bounded by the configured max distance.
    offset.round() as i32
}
