//! Ducking attenuation curves.

use super::speaker::{AVS_SET_VOLUME_MAX, AVS_SET_VOLUME_MIN};

/// Maps an unducked volume to the volume applied while ducked.
///
/// Runs under the owning controller's lock: it must return quickly and must
/// not call back into the controller. It never needs to be `Sync`.
pub type VolumeCurveFunction = Box<dyn FnMut(i8) -> i8 + Send>;

/// 20% of the maximum volume, the width of each curve segment and the ducked ceiling.
const DUCK_STEP: i8 = (AVS_SET_VOLUME_MAX as i16 * 20 / 100) as i8;

/// Default piece-wise attenuation:
///
/// - `[MIN, MIN + 0.2*MAX)`: `MIN`
/// - `[MIN + 0.2*MAX, MIN + 0.4*MAX]`: `volume - 0.2*MAX`
/// - above: `0.2*MAX`
pub fn default_volume_attenuate(unducked_volume: i8) -> i8 {
    let lower = AVS_SET_VOLUME_MIN.saturating_add(DUCK_STEP);
    let upper = AVS_SET_VOLUME_MIN.saturating_add(DUCK_STEP.saturating_mul(2));

    if unducked_volume < lower {
        AVS_SET_VOLUME_MIN
    } else if unducked_volume <= upper {
        unducked_volume - DUCK_STEP
    } else {
        DUCK_STEP
    }
}
