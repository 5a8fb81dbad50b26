//! Nearest-camera lookup over an immutable catalog.

use crate::catalog::CameraRecord;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, haversine_m, heading_delta_deg, initial_bearing_deg};

/// Read-only spatial index over a camera catalog.
///
/// Built once per run; lookups never mutate it, so a shared reference can be
/// used from any number of threads.
#[derive(Debug, Clone)]
pub struct CameraIndex {
    cameras: Vec<CameraRecord>,
    radius_m: f64,
    heading_tolerance_deg: f64,
}

/// Best camera for a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatch<'a> {
    pub camera: &'a CameraRecord,
    /// Great-circle distance from the query point in metres.
    pub distance_m: f64,
}

impl<'a> CameraMatch<'a> {
    pub fn id(&self) -> &'a str {
        &self.camera.id
    }

    pub fn speed_limit(&self) -> Option<f64> {
        self.camera.speed_limit
    }

    pub fn heading(&self) -> f64 {
        self.camera.heading
    }

    pub fn code(&self) -> &'a str {
        &self.camera.code
    }

    pub fn row_index(&self) -> i64 {
        self.camera.row_index
    }
}

impl CameraIndex {
    pub fn new(cameras: Vec<CameraRecord>, config: &Config) -> Result<Self> {
        if cameras.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self {
            cameras,
            radius_m: config.search_radius_m,
            heading_tolerance_deg: config.heading_tolerance_deg,
        })
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn cameras(&self) -> &[CameraRecord] {
        &self.cameras
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Closest camera within the search radius.
    ///
    /// With `require_heading`, a camera qualifies only when both its own
    /// heading and the bearing from the query point toward it lie within the
    /// heading tolerance of `heading`; a query without a heading then never
    /// matches. Equal distances resolve to the earlier catalog entry.
    pub fn lookup(
        &self,
        lon: f64,
        lat: f64,
        heading: Option<f64>,
        require_heading: bool,
    ) -> Option<CameraMatch<'_>> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let heading = heading.filter(|h| h.is_finite());
        if require_heading && heading.is_none() {
            return None;
        }

        let bbox = BoundingBox::around(lon, lat, self.radius_m);
        let mut best: Option<CameraMatch<'_>> = None;

        for cam in &self.cameras {
            if !bbox.contains(cam.longitude, cam.latitude) {
                continue;
            }
            let distance_m = haversine_m(lon, lat, cam.longitude, cam.latitude);
            if distance_m > self.radius_m {
                continue;
            }
            if require_heading && let Some(h) = heading {
                if heading_delta_deg(cam.heading, h) > self.heading_tolerance_deg {
                    continue;
                }
                let bearing = initial_bearing_deg(lon, lat, cam.longitude, cam.latitude);
                if heading_delta_deg(bearing, h) > self.heading_tolerance_deg {
                    continue;
                }
            }
            if best.is_none_or(|b| distance_m < b.distance_m) {
                best = Some(CameraMatch {
                    camera: cam,
                    distance_m,
                });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::METERS_PER_DEGREE;

    const LON: f64 = 127.0;
    const LAT: f64 = 37.0;

    fn cam(id: &str, lon: f64, lat: f64, heading: f64) -> CameraRecord {
        CameraRecord {
            id: id.into(),
            longitude: lon,
            latitude: lat,
            heading,
            speed_limit: Some(100.0),
            code: "1".into(),
            row_index: 0,
            enforcement_point: true,
        }
    }

    /// Latitude `meters` due north of the query origin.
    fn north(meters: f64) -> f64 {
        LAT + meters / METERS_PER_DEGREE
    }

    /// Longitude `meters` due east of the query origin, along the great circle.
    fn east(meters: f64) -> f64 {
        let half = meters / (2.0 * crate::geo::EARTH_RADIUS_M);
        LON + (2.0 * (half.sin() / LAT.to_radians().cos()).asin()).to_degrees()
    }

    fn index(cameras: Vec<CameraRecord>) -> CameraIndex {
        CameraIndex::new(cameras, &Config::default()).unwrap()
    }

    #[test]
    fn empty_catalog_rejected() {
        assert!(matches!(
            CameraIndex::new(vec![], &Config::default()),
            Err(Error::EmptyCatalog)
        ));
    }

    #[test]
    fn picks_nearest_within_radius() {
        let idx = index(vec![
            cam("far", LON, north(800.0), 0.0),
            cam("near", LON, north(300.0), 0.0),
            cam("out", LON, north(1_200.0), 0.0),
        ]);
        let m = idx.lookup(LON, LAT, None, false).unwrap();
        assert_eq!(m.id(), "near");
        assert!((m.distance_m - 300.0).abs() < 1.0);
    }

    #[test]
    fn matches_at_edge_of_radius() {
        for (id, lon, lat) in [("n", LON, north(999.5)), ("e", east(999.5), LAT)] {
            let idx = index(vec![cam(id, lon, lat, 0.0)]);
            let m = idx.lookup(LON, LAT, None, false).unwrap();
            assert_eq!(m.id(), id);
            assert!((m.distance_m - 999.5).abs() < 1e-3, "{}", m.distance_m);
        }
    }

    #[test]
    fn matches_across_antimeridian() {
        let idx = index(vec![cam("wrap", -179.9995, 0.0, 0.0)]);
        let m = idx.lookup(179.9995, 0.0, None, false).unwrap();
        assert_eq!(m.id(), "wrap");
        assert!(m.distance_m < 200.0);
    }

    #[test]
    fn matched_id_outlives_match() {
        let idx = index(vec![cam("kept", LON, north(10.0), 0.0)]);
        let id: Option<&str> = idx.lookup(LON, LAT, None, false).map(|m| m.id());
        let code: Option<&str> = idx.lookup(LON, LAT, None, false).map(|m| m.code());
        assert_eq!(id, Some("kept"));
        assert_eq!(code, Some("1"));
    }

    #[test]
    fn nothing_beyond_radius() {
        let idx = index(vec![cam("out", LON, north(1_050.0), 0.0)]);
        assert!(idx.lookup(LON, LAT, None, false).is_none());
    }

    #[test]
    fn returned_match_is_within_radius() {
        let cams: Vec<CameraRecord> = (0..40)
            .map(|i| {
                let angle = (i as f64) * 0.7;
                let r = 100.0 + (i as f64) * 30.0;
                let dlat = r * angle.cos() / METERS_PER_DEGREE;
                let dlon = r * angle.sin() / (METERS_PER_DEGREE * LAT.to_radians().cos());
                cam(&format!("c{i}"), LON + dlon, LAT + dlat, 0.0)
            })
            .collect();
        let idx = index(cams);
        for (qlon, qlat) in [(LON, LAT), (LON + 0.005, LAT - 0.004), (LON - 0.01, LAT + 0.01)] {
            if let Some(m) = idx.lookup(qlon, qlat, None, false) {
                let d = haversine_m(qlon, qlat, m.camera.longitude, m.camera.latitude);
                assert!(d <= 1000.0, "match at {d} m");
            }
        }
    }

    #[test]
    fn tie_goes_to_first_in_catalog() {
        let mut a = cam("a", LON, north(500.0), 0.0);
        a.row_index = 1;
        let mut b = cam("b", LON, north(500.0), 0.0);
        b.row_index = 2;
        let idx = index(vec![a, b]);
        assert_eq!(idx.lookup(LON, LAT, None, false).unwrap().id(), "a");
    }

    #[test]
    fn heading_constraint_checks_camera_heading() {
        let idx = index(vec![cam("c", LON, north(400.0), 90.0)]);
        assert!(idx.lookup(LON, LAT, Some(0.0), true).is_none());
        assert!(idx.lookup(LON, LAT, Some(0.0), false).is_some());
    }

    #[test]
    fn heading_constraint_checks_bearing() {
        // Camera faces north, query faces north, but the camera is behind us.
        let idx = index(vec![cam("behind", LON, north(-400.0), 0.0)]);
        assert!(idx.lookup(LON, LAT, Some(0.0), true).is_none());

        let idx = index(vec![cam("ahead", LON, north(400.0), 10.0)]);
        let m = idx.lookup(LON, LAT, Some(355.0), true).unwrap();
        assert_eq!(m.id(), "ahead");
    }

    #[test]
    fn heading_constraint_prefers_aligned_over_closer() {
        let idx = index(vec![
            cam("close_wrong_way", LON, north(100.0), 180.0),
            cam("aligned", LON, north(600.0), 5.0),
        ]);
        assert_eq!(idx.lookup(LON, LAT, Some(0.0), true).unwrap().id(), "aligned");
        assert_eq!(
            idx.lookup(LON, LAT, Some(0.0), false).unwrap().id(),
            "close_wrong_way"
        );
    }

    #[test]
    fn required_heading_without_query_heading() {
        let idx = index(vec![cam("c", LON, north(100.0), 0.0)]);
        assert!(idx.lookup(LON, LAT, None, true).is_none());
        assert!(idx.lookup(LON, LAT, Some(f64::NAN), true).is_none());
    }

    #[test]
    fn non_finite_query_point() {
        let idx = index(vec![cam("c", LON, LAT, 0.0)]);
        assert!(idx.lookup(f64::NAN, LAT, None, false).is_none());
    }

    #[test]
    fn match_exposes_camera_fields() {
        let mut c = cam("c", LON, north(100.0), 12.0);
        c.row_index = 42;
        c.code = "3".into();
        let idx = index(vec![c]);
        let m = idx.lookup(LON, LAT, None, false).unwrap();
        assert_eq!(m.row_index(), 42);
        assert_eq!(m.code(), "3");
        assert_eq!(m.heading(), 12.0);
        assert_eq!(m.speed_limit(), Some(100.0));
    }
}
