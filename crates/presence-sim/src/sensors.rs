//! Synthetic accelerometer and magnetometer samples
//!
//! Builds the device-to-world rotation for a set of orientation angles and
//! projects gravity and a northern-hemisphere geomagnetic field into device
//! coordinates. Feeding the result back through the classifier yields the
//! same angles for any pitch strictly inside (-90, 90).

use presence_core::OrientationAngles;

/// Standard gravity (m/s^2)
pub const GRAVITY: f64 = 9.81;

/// Horizontal component of the simulated geomagnetic field (uT)
pub const FIELD_HORIZONTAL: f64 = 20.0;

/// Downward component of the simulated geomagnetic field (uT)
pub const FIELD_VERTICAL: f64 = 40.0;

/// Sensor readings for a device held at `angles`
///
/// Returns `(accelerometer, magnetometer)`.
pub fn synthesize(angles: &OrientationAngles) -> ([f64; 3], [f64; 3]) {
    let (sa, ca) = angles.azimuth.to_radians().sin_cos();
    let (sp, cp) = angles.pitch.to_radians().sin_cos();
    let (sr, cr) = angles.roll.to_radians().sin_cos();

    // Up, east and north axes expressed in device coordinates
    let up = [-cp * sr, -sp, cp * cr];
    let east0 = [cr, 0.0, sr];
    let north0 = [-sp * sr, cp, sp * cr];

    let north = [
        -sa * east0[0] + ca * north0[0],
        -sa * east0[1] + ca * north0[1],
        -sa * east0[2] + ca * north0[2],
    ];

    let accel = up.map(|c| c * GRAVITY);
    let field = [
        FIELD_HORIZONTAL * north[0] - FIELD_VERTICAL * up[0],
        FIELD_HORIZONTAL * north[1] - FIELD_VERTICAL * up[1],
        FIELD_HORIZONTAL * north[2] - FIELD_VERTICAL * up[2],
    ];

    (accel, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_core::orientation::{orientation_angles, rotation_matrix};

    fn roundtrip(azimuth: f64, pitch: f64, roll: f64) -> OrientationAngles {
        let (accel, field) = synthesize(&OrientationAngles::new(azimuth, pitch, roll));
        let r = rotation_matrix(accel, field).unwrap();
        orientation_angles(&r)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "expected {b}, got {a}");
    }

    #[test]
    fn test_flat_north() {
        let (accel, field) = synthesize(&OrientationAngles::new(0.0, 0.0, 0.0));
        assert_close(accel[2], GRAVITY);
        assert_close(field[0], 0.0);
        assert_close(field[1], FIELD_HORIZONTAL);
        assert_close(field[2], -FIELD_VERTICAL);
    }

    #[test]
    fn test_flat_east() {
        let (_, field) = synthesize(&OrientationAngles::new(90.0, 0.0, 0.0));
        assert_close(field[0], -FIELD_HORIZONTAL);
        assert_close(field[1], 0.0);
    }

    #[test]
    fn test_angles_roundtrip() {
        for (azimuth, pitch, roll) in [
            (0.0, 0.0, 0.0),
            (30.0, 5.0, -5.0),
            (-120.0, 45.0, 20.0),
            (170.0, -60.0, 100.0),
            (10.0, 20.0, -150.0),
        ] {
            let angles = roundtrip(azimuth, pitch, roll);
            assert_close(angles.azimuth, azimuth);
            assert_close(angles.pitch, pitch);
            assert_close(angles.roll, roll);
        }
    }
}
