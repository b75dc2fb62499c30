//! Depth planning: V-bit cut depth derivation and multi-pass slicing.

use pcbmill_core::{FailKind, FailResult};
use tracing::warn;

/// Tolerance used when comparing depths
const DEPTH_EPSILON: f64 = 1e-9;

/// Upper bound on the passes of one multi-depth plan
pub const MAX_DEPTH_PASSES: usize = 10_000;

/// Cut depth that makes a V-bit cut `diameter` wide at the surface.
///
/// Returns the depth and whether `previous` had to be used instead because
/// the tip geometry gives no finite depth (a zero tip angle, for example).
pub fn vbit_cut_z(diameter: f64, tip_dia: f64, tip_angle: f64, previous: f64) -> (f64, bool) {
    let denominator = 2.0 * (tip_angle / 2.0).to_radians().tan();
    if denominator.abs() < DEPTH_EPSILON || !denominator.is_finite() {
        warn!(
            "V-bit angle {} gives no usable depth, keeping cut Z {}",
            tip_angle, previous
        );
        return (previous, true);
    }
    let cut_z = -((diameter - tip_dia) / denominator);
    if !cut_z.is_finite() {
        warn!("V-bit depth is not finite, keeping cut Z {}", previous);
        return (previous, true);
    }
    (cut_z, false)
}

/// Z levels the tool cuts at, from the first pass to the final depth.
///
/// Without multi-depth, or for a cut at or above the stock surface, the
/// plan is the single final depth. Otherwise passes step down from Z=0 by
/// at most `depth_per_pass` and the last level is exactly `cut_z`. Plans
/// needing more than [`MAX_DEPTH_PASSES`] passes are rejected.
pub fn plan_depths(cut_z: f64, depth_per_pass: f64, multidepth: bool) -> FailResult<Vec<f64>> {
    if !cut_z.is_finite() {
        return Err(FailKind::InvalidParameters(format!(
            "cut Z must be finite, got {}",
            cut_z
        )));
    }
    if !multidepth || cut_z >= 0.0 || depth_per_pass <= 0.0 || !depth_per_pass.is_finite() {
        return Ok(vec![cut_z]);
    }
    let passes = (-cut_z / depth_per_pass).ceil();
    if passes > MAX_DEPTH_PASSES as f64 {
        return Err(FailKind::InvalidParameters(format!(
            "cut Z {} at {} per pass needs {} passes, limit is {}",
            cut_z, depth_per_pass, passes, MAX_DEPTH_PASSES
        )));
    }

    let mut depths = Vec::new();
    let mut pass = 1u32;
    loop {
        let z = -(pass as f64) * depth_per_pass;
        if z <= cut_z + DEPTH_EPSILON {
            break;
        }
        depths.push(z);
        pass += 1;
    }
    depths.push(cut_z);
    Ok(depths)
}
