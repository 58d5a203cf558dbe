//! Geodesy helpers for rotation geometry
//!
//! Spherical-earth formulas; angles are degrees throughout.

use crate::model::Location;

/// Mean earth radius used for degree/kilometre conversion
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const FULL_CIRCLE_DEG: f64 = 360.0;
pub const HALF_CIRCLE_DEG: f64 = 180.0;
pub const THREE_QUARTER_CIRCLE_DEG: f64 = 270.0;
pub const QUARTER_CIRCLE_DEG: f64 = 90.0;

/// `|a - b| <= tolerance`; a missing value never matches
pub fn are_within_tolerance(tolerance: f64, a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= tolerance,
        _ => false,
    }
}

/// Normalize an angle into `[0, 360)`
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle % FULL_CIRCLE_DEG;
    if wrapped < 0.0 {
        wrapped + FULL_CIRCLE_DEG
    } else {
        wrapped
    }
}

/// Arc length in kilometres for an angular distance in degrees
pub fn deg_to_km(degrees: f64) -> f64 {
    degrees.to_radians() * EARTH_RADIUS_KM
}

/// Angular separation (degrees) between two points, haversine formulation
pub fn great_circle_angular_separation(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    c.to_degrees()
}

/// Initial bearing (degrees clockwise from north, `[0, 360)`) from point 1 toward point 2
pub fn great_circle_azimuth(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_lambda = (lon2 - lon1).to_radians();
    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    normalize_degrees(y.atan2(x).to_degrees())
}

/// Azimuth from a receiver location toward a source location
pub fn azimuth_between(receiver: &Location, source: &Location) -> f64 {
    great_circle_azimuth(
        receiver.latitude_degrees,
        receiver.longitude_degrees,
        source.latitude_degrees,
        source.longitude_degrees,
    )
}

/// Surface distance in kilometres between two locations
pub fn distance_km(a: &Location, b: &Location) -> f64 {
    deg_to_km(great_circle_angular_separation(
        a.latitude_degrees,
        a.longitude_degrees,
        b.latitude_degrees,
        b.longitude_degrees,
    ))
}

/// Circular mean of a set of angles; `None` for an empty set
pub fn mean_angle_degrees(angles: &[f64]) -> Option<f64> {
    if angles.is_empty() {
        return None;
    }
    let (sin_sum, cos_sum) = angles.iter().fold((0.0, 0.0), |(s, c), a| {
        let r = a.to_radians();
        (s + r.sin(), c + r.cos())
    });
    let n = angles.len() as f64;
    Some((sin_sum / n).atan2(cos_sum / n).to_degrees())
}

/// Arithmetic mean; `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Flat-earth (non-wrapping) average of two locations
pub fn average_flat_earth_location(a: &Location, b: &Location) -> Location {
    Location {
        latitude_degrees: mean(&[a.latitude_degrees, b.latitude_degrees]),
        longitude_degrees: mean(&[a.longitude_degrees, b.longitude_degrees]),
        depth_km: mean(&[a.depth_km, b.depth_km]),
        elevation_km: mean(&[a.elevation_km, b.elevation_km]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lon: f64) -> Location {
        Location {
            latitude_degrees: lat,
            longitude_degrees: lon,
            depth_km: 0.0,
            elevation_km: 0.0,
        }
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        assert!(are_within_tolerance(2.0, Some(10.0), Some(12.0)));
        assert!(!are_within_tolerance(2.0, Some(10.0), Some(12.000_001)));
        assert!(!are_within_tolerance(2.0, None, Some(12.0)));
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(0.0), 0.0);
    }

    #[test]
    fn test_one_degree_is_about_111_km() {
        assert!((deg_to_km(1.0) - 111.195).abs() < 0.001);
    }

    #[test]
    fn test_cardinal_azimuths() {
        assert!((great_circle_azimuth(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((great_circle_azimuth(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((great_circle_azimuth(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((great_circle_azimuth(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_angular_separation_along_equator() {
        let sep = great_circle_angular_separation(0.0, 10.0, 0.0, 13.0);
        assert!((sep - 3.0).abs() < 1e-9);
        assert!((distance_km(&loc(0.0, 0.0), &loc(0.0, 1.0)) - 111.195).abs() < 0.001);
    }

    #[test]
    fn test_circular_mean_wraps() {
        let m = mean_angle_degrees(&[350.0, 10.0]).unwrap();
        assert!(m.abs() < 1e-9);
        let m = mean_angle_degrees(&[90.0, 90.0]).unwrap();
        assert!((m - 90.0).abs() < 1e-9);
        assert!(mean_angle_degrees(&[]).is_none());
    }

    #[test]
    fn test_flat_earth_average_does_not_wrap() {
        let avg = average_flat_earth_location(&loc(10.0, 179.0), &loc(20.0, -179.0));
        assert_eq!(avg.latitude_degrees, 15.0);
        assert_eq!(avg.longitude_degrees, 0.0);
    }
}
