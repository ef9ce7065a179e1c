//! Geofence around fixed target places

use serde::{Deserialize, Serialize};

use crate::{ARRABAH, DISTANCE_THRESHOLD_METERS, TEL_AVIV};

/// Mean Earth radius (meters)
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A point on the Earth's surface in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude within ±90 and longitude within ±180
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Point reached by travelling `distance` meters along `bearing` degrees
    pub fn destination(&self, bearing: f64, distance: f64) -> GeoPoint {
        let phi1 = self.latitude.to_radians();
        let lambda1 = self.longitude.to_radians();
        let theta = bearing.to_radians();
        let delta = distance / EARTH_RADIUS_METERS;

        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

        GeoPoint::new(phi2.to_degrees(), lambda2.to_degrees())
    }
}

/// A location fix delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    /// Horizontal accuracy radius reported by the provider (meters)
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            point: GeoPoint::new(latitude, longitude),
            accuracy: None,
        }
    }
}

impl From<GeoPoint> for LocationFix {
    fn from(point: GeoPoint) -> Self {
        Self {
            point,
            accuracy: None,
        }
    }
}

/// A named place the user must be near
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub label: String,
    #[serde(flatten)]
    pub point: GeoPoint,
}

impl Target {
    pub fn new(label: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            label: label.into(),
            point,
        }
    }
}

/// Great-circle distance in meters (haversine)
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Checks whether a fix lies within the threshold of any target
#[derive(Debug, Clone)]
pub struct GeofenceChecker {
    targets: Vec<Target>,
    threshold: f64,
}

impl Default for GeofenceChecker {
    fn default() -> Self {
        Self::new(
            vec![Target::new("Arrabah", ARRABAH), Target::new("Tel Aviv", TEL_AVIV)],
            DISTANCE_THRESHOLD_METERS,
        )
    }
}

impl GeofenceChecker {
    pub fn new(targets: Vec<Target>, threshold: f64) -> Self {
        Self { targets, threshold }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Radius around each target (meters)
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `false` until a fix is available; the boundary counts as inside
    pub fn is_near_any_target(&self, fix: Option<&LocationFix>) -> bool {
        match fix {
            Some(fix) => self.nearest(fix).is_some_and(|(_, d)| d <= self.threshold),
            None => false,
        }
    }

    /// Closest target and its distance
    pub fn nearest(&self, fix: &LocationFix) -> Option<(&Target, f64)> {
        self.targets
            .iter()
            .map(|target| (target, haversine_distance(&fix.point, &target.point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
