//! Datum shift from WGS-84 into the obfuscated frame used by Chinese map providers.
//!
//! The correction is an empirical polynomial with sine terms, evaluated on the
//! offset from (105°E, 35°N) and scaled by a Krasovsky-ellipsoid factor. The
//! coefficients must match the map provider bit-for-bit, so they are spelled
//! out literally below.

use std::f64::consts::PI;

use crate::models::DisplayCoordinate;

/// Krasovsky 1940 semi-major axis in meters.
const SEMI_MAJOR_AXIS: f64 = 6378245.0;
/// Krasovsky 1940 first eccentricity squared.
const ECCENTRICITY_SQ: f64 = 0.00669342162296594323;

/// Region where the shift applies. Outside it the transform is the identity.
const MIN_LON: f64 = 72.004;
const MAX_LON: f64 = 137.8347;
const MIN_LAT: f64 = 0.8293;
const MAX_LAT: f64 = 55.8271;

/// True when the point lies outside the shifted region.
pub fn out_of_region(lon: f64, lat: f64) -> bool {
    !(MIN_LON..=MAX_LON).contains(&lon) || !(MIN_LAT..=MAX_LAT).contains(&lat)
}

/// Shifts a WGS-84 (lon, lat) pair into the display frame.
pub fn transform(lon: f64, lat: f64) -> (f64, f64) {
    if out_of_region(lon, lat) {
        return (lon, lat);
    }

    let mut d_lat = shift_lat(lon - 105.0, lat - 35.0);
    let mut d_lon = shift_lon(lon - 105.0, lat - 35.0);

    let rad_lat = lat / 180.0 * PI;
    let magic = 1.0 - ECCENTRICITY_SQ * rad_lat.sin() * rad_lat.sin();
    let sqrt_magic = magic.sqrt();

    d_lat = (d_lat * 180.0)
        / ((SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ)) / (magic * sqrt_magic) * PI);
    d_lon = (d_lon * 180.0) / (SEMI_MAJOR_AXIS / sqrt_magic * rad_lat.cos() * PI);

    (lon + d_lon, lat + d_lat)
}

/// Convenience wrapper producing a [`DisplayCoordinate`].
pub fn to_display(lon: f64, lat: f64) -> DisplayCoordinate {
    let (lon, lat) = transform(lon, lat);
    DisplayCoordinate { lon, lat }
}

fn shift_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn shift_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}
