//! Great-circle helpers on a spherical Earth.

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Length of one degree of latitude in metres on the same sphere
/// [`haversine_m`] uses (about 111,195 m).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Extra margin in degrees so rounding never puts an in-range point outside.
const BOX_SLACK_DEG: f64 = 1e-9;

/// Haversine distance in metres between two `(lon, lat)` points in degrees.
pub fn haversine_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

/// Initial bearing in degrees `[0, 360)` from the first point toward the second.
pub fn initial_bearing_deg(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    normalize_deg(y.atan2(x).to_degrees())
}

/// Smallest absolute difference between two headings, in `[0, 180]`.
pub fn heading_delta_deg(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    d.min(360.0 - d)
}

fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

/// Degree-space box that contains every point within a radius of a centre.
///
/// Longitude bounds may run past ±180; [`BoundingBox::contains`] wraps them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Box around `(lon, lat)` wide enough for `radius_m`.
    ///
    /// The longitude half-width is `asin(sin(d) / cos(lat))` for angular
    /// radius `d`, which also covers the poleward bulge of the circle. When the
    /// circle reaches a pole the box spans every longitude.
    pub fn around(lon: f64, lat: f64, radius_m: f64) -> Self {
        let angular = radius_m / EARTH_RADIUS_M;
        let dlat = angular.to_degrees() + BOX_SLACK_DEG;
        let cos_lat = lat.to_radians().cos().abs();
        let dlon = if angular.sin() >= cos_lat {
            180.0
        } else {
            (angular.sin() / cos_lat).asin().to_degrees() + BOX_SLACK_DEG
        };
        Self {
            min_lon: lon - dlon,
            max_lon: lon + dlon,
            min_lat: lat - dlat,
            max_lat: lat + dlat,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        [lon, lon - 360.0, lon + 360.0]
            .into_iter()
            .any(|l| l >= self.min_lon && l <= self.max_lon)
    }
}
