//! Device orientation from accelerometer and magnetometer samples
//!
//! Only the latest sample of each sensor is kept. Once both are present every
//! update recomputes the rotation matrix and derives azimuth, pitch and roll
//! (device frame: x right, y up the screen, z out of the screen; world frame:
//! x east, y north, z up).
//!
//! Degenerate samples (free fall, magnetic field parallel to gravity) leave
//! the previous reading in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{FLAT_TOLERANCE_DEGREES, NORTH_TOLERANCE_DEGREES};

/// Standard gravity (m/s²)
const STANDARD_GRAVITY: f64 = 9.80665;

/// Accelerations below 10% of g are treated as free fall
const FREE_FALL_GRAVITY_SQUARED: f64 = 0.01 * STANDARD_GRAVITY * STANDARD_GRAVITY;

/// Minimum horizontal field magnitude (µT) for a usable heading
const MIN_HORIZONTAL_FIELD: f64 = 0.1;

/// Raw sensor sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
}

/// Orientation angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationAngles {
    /// Rotation about the world z axis, 0 when the top of the device faces north
    pub azimuth: f64,
    /// Rotation about the device x axis
    pub pitch: f64,
    /// Rotation about the device y axis
    pub roll: f64,
}

impl OrientationAngles {
    pub fn new(azimuth: f64, pitch: f64, roll: f64) -> Self {
        Self {
            azimuth,
            pitch,
            roll,
        }
    }

    /// Azimuth folded into `[0, 360)`
    pub fn normalized_azimuth(&self) -> f64 {
        let normalized = self.azimuth.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if normalized >= 360.0 {
            0.0
        } else {
            normalized
        }
    }
}

/// The two booleans the login gate consumes, always replaced together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrientationReading {
    pub flat: bool,
    pub pointing_north: bool,
}

/// Fuses gravity and geomagnetic samples into flat/north flags
#[derive(Debug, Clone)]
pub struct OrientationClassifier {
    gravity: Option<[f64; 3]>,
    geomagnetic: Option<[f64; 3]>,
    angles: Option<OrientationAngles>,
    reading: OrientationReading,
    flat_tolerance: f64,
    north_tolerance: f64,
}

impl Default for OrientationClassifier {
    fn default() -> Self {
        Self::new(FLAT_TOLERANCE_DEGREES, NORTH_TOLERANCE_DEGREES)
    }
}

impl OrientationClassifier {
    /// Create a classifier with custom tolerances (degrees)
    pub fn new(flat_tolerance: f64, north_tolerance: f64) -> Self {
        Self {
            gravity: None,
            geomagnetic: None,
            angles: None,
            reading: OrientationReading::default(),
            flat_tolerance,
            north_tolerance,
        }
    }

    /// Record a sample and recompute when both sensors have reported
    pub fn update(&mut self, kind: SensorKind, vector: [f64; 3]) {
        match kind {
            SensorKind::Accelerometer => self.gravity = Some(vector),
            SensorKind::Magnetometer => self.geomagnetic = Some(vector),
        }

        let (Some(gravity), Some(geomagnetic)) = (self.gravity, self.geomagnetic) else {
            return;
        };

        match rotation_matrix(gravity, geomagnetic) {
            Some(r) => {
                let angles = orientation_angles(&r);
                self.apply(angles);
            }
            None => warn!(?kind, "degenerate orientation sample, keeping previous reading"),
        }
    }

    /// Replace the reading from already-derived angles
    pub fn apply(&mut self, angles: OrientationAngles) {
        let reading = self.classify(&angles);
        if reading != self.reading {
            debug!(
                azimuth = angles.normalized_azimuth(),
                pitch = angles.pitch,
                roll = angles.roll,
                flat = reading.flat,
                north = reading.pointing_north,
                "orientation changed"
            );
        }
        self.angles = Some(angles);
        self.reading = reading;
    }

    /// Classify angles without touching state
    pub fn classify(&self, angles: &OrientationAngles) -> OrientationReading {
        let flat = angles.pitch.abs() < self.flat_tolerance && angles.roll.abs() < self.flat_tolerance;

        let azimuth = angles.normalized_azimuth();
        let pointing_north =
            azimuth < self.north_tolerance || azimuth > 360.0 - self.north_tolerance;

        OrientationReading {
            flat,
            pointing_north,
        }
    }

    pub fn reading(&self) -> OrientationReading {
        self.reading
    }

    pub fn is_flat(&self) -> bool {
        self.reading.flat
    }

    pub fn is_pointing_north(&self) -> bool {
        self.reading.pointing_north
    }

    /// Angles from the last successful computation
    pub fn angles(&self) -> Option<OrientationAngles> {
        self.angles
    }
}

/// Row-major rotation matrix mapping device coordinates to world coordinates
///
/// Returns `None` when the device is in free fall or the magnetic field is
/// (nearly) parallel to gravity.
pub fn rotation_matrix(gravity: [f64; 3], geomagnetic: [f64; 3]) -> Option<[f64; 9]> {
    let [mut ax, mut ay, mut az] = gravity;
    let [ex, ey, ez] = geomagnetic;

    let norm_sq_a = ax * ax + ay * ay + az * az;
    if !norm_sq_a.is_finite() || norm_sq_a < FREE_FALL_GRAVITY_SQUARED {
        return None;
    }

    // East = field x gravity
    let mut hx = ey * az - ez * ay;
    let mut hy = ez * ax - ex * az;
    let mut hz = ex * ay - ey * ax;
    let norm_h = (hx * hx + hy * hy + hz * hz).sqrt();
    if !norm_h.is_finite() || norm_h < MIN_HORIZONTAL_FIELD {
        return None;
    }

    let inv_h = 1.0 / norm_h;
    hx *= inv_h;
    hy *= inv_h;
    hz *= inv_h;

    let inv_a = 1.0 / norm_sq_a.sqrt();
    ax *= inv_a;
    ay *= inv_a;
    az *= inv_a;

    // North = gravity x east
    let mx = ay * hz - az * hy;
    let my = az * hx - ax * hz;
    let mz = ax * hy - ay * hx;

    Some([hx, hy, hz, mx, my, mz, ax, ay, az])
}

/// Azimuth, pitch and roll (degrees) of a rotation matrix
pub fn orientation_angles(r: &[f64; 9]) -> OrientationAngles {
    OrientationAngles {
        azimuth: r[1].atan2(r[4]).to_degrees(),
        pitch: (-r[7]).clamp(-1.0, 1.0).asin().to_degrees(),
        roll: (-r[6]).atan2(r[8]).to_degrees(),
    }
}
