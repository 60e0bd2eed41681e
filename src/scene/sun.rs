use anyhow::{Context, Result};
use serde::Serialize;
use time::{Date, Month};

use crate::util_3d::Vector3;

// The editor simulates a fixed, non leap, year
const YEAR: i32 = 2025;
// The scene north is rotated from the geographic one, this is compensated in the latitude
const LATITUDE_OFFSET: f64 = 40.0;
// Distance from the origin of the directional light
pub const LIGHT_DISTANCE: f32 = 100.0;

/// Sun angles, in radians. The azimuth is 0 at north and grows clockwise (90 is east).
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SunPosition {
    pub elevation: f64,
    pub azimuth: f64,
}

pub fn day_of_year(month: u8, day: u8) -> Result<u16> {
    let month = Month::try_from(month).with_context(|| format!("invalid month {month}"))?;
    let date = Date::from_calendar_date(YEAR, month, day)
        .with_context(|| format!("invalid day {day} of {month}"))?;
    Ok(date.ordinal())
}

pub fn sun_position(month: u8, day: u8, hour: u8, minute: u8, latitude: f64) -> Result<SunPosition> {
    let day_of_year = f64::from(day_of_year(month, day)?);
    let declination = (-23.45 * (360.0 / 365.0 * (day_of_year + 10.0)).to_radians().cos()).to_radians();
    // 0 at solar noon, negative in the morning
    let hour_angle = ((f64::from(hour) + f64::from(minute) / 60.0 - 12.0) * 15.0).to_radians();
    let latitude = (latitude - LATITUDE_OFFSET).to_radians();

    let elevation = (declination.sin() * latitude.sin()
        + declination.cos() * latitude.cos() * hour_angle.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let azimuth = hour_angle.sin().atan2(
        hour_angle.cos() * latitude.sin() - declination.tan() * latitude.cos()
    );
    Ok(SunPosition { elevation, azimuth })
}

impl SunPosition {
    /// Where to put the directional light, at `distance` from the origin.
    pub fn light_position(&self, distance: f32) -> Vector3 {
        let (el, az) = (self.elevation as f32, self.azimuth as f32);
        Vector3::new(
            distance * el.cos() * az.sin(),
            distance * el.sin(),
            distance * el.cos() * az.cos(),
        )
    }
}

pub fn is_daylight(hour: u8) -> bool {
    (5 ..= 21).contains(&hour)
}

pub fn light_intensity(hour: u8) -> f32 {
    if is_daylight(hour) { 1.0 } else { 0.3 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::InnerSpace;

    #[test]
    fn ordinal_days() {
        assert_eq!(day_of_year(1, 1).unwrap(), 1);
        assert_eq!(day_of_year(3, 1).unwrap(), 60);
        assert_eq!(day_of_year(12, 31).unwrap(), 365);
        assert!(day_of_year(2, 29).is_err());
        assert!(day_of_year(13, 1).is_err());
    }

    #[test]
    fn noon_is_due_south_and_highest() {
        // adjusted latitude 10: the sun is south of the zenith all year
        let noon = sun_position(6, 21, 12, 0, 50.0).unwrap();
        assert_abs_diff_eq!(noon.azimuth.abs(), std::f64::consts::PI, epsilon = 1e-9);
        let morning = sun_position(6, 21, 9, 0, 50.0).unwrap();
        let afternoon = sun_position(6, 21, 15, 0, 50.0).unwrap();
        assert!(noon.elevation > morning.elevation);
        assert_abs_diff_eq!(morning.elevation, afternoon.elevation, epsilon = 1e-9);
        assert_abs_diff_eq!(morning.azimuth, -afternoon.azimuth, epsilon = 1e-9);
    }

    #[test]
    fn equator_of_the_scene_at_equinox() {
        // adjusted latitude 0, declination close to 0 in late March
        let p = sun_position(3, 21, 12, 0, 40.0).unwrap();
        assert!(p.elevation.to_degrees() > 85.0);
    }

    #[test]
    fn light_is_at_the_given_distance() {
        let p = sun_position(8, 1, 10, 30, 45.0).unwrap();
        let light = p.light_position(LIGHT_DISTANCE);
        assert_abs_diff_eq!(light.magnitude(), LIGHT_DISTANCE, epsilon = 1e-3);
        assert!(light.y > 0.0);
    }

    #[test]
    fn night_dims_the_light() {
        assert!(is_daylight(5) && is_daylight(21));
        assert!(!is_daylight(4) && !is_daylight(22));
        assert_eq!(light_intensity(12), 1.0);
        assert_eq!(light_intensity(23), 0.3);
    }
}
