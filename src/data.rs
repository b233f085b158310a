// GeoTrack — Runtime Data Types
//
// The per-boot snapshot of everything the publisher and the web UI display.
// Unlike the persisted clock this lives in ordinary RAM and starts fresh
// every wake cycle.

/// Temperature/humidity/pressure reading from the environment sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

/// One GPS position fix. Typed numeric fields only; the NMEA field grammar
/// is the modem driver's problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f32,
    pub speed_kmph: f32,
    pub course_deg: f32,
    pub satellites: u8,
}

/// Runtime snapshot assembled by the orchestrator.
#[derive(Debug, Clone)]
pub struct DeviceData {
    pub voltage: f32,
    pub env: Option<EnvReading>,
    pub fix: Option<GpsFix>,
    pub is_moving: bool,
    /// Countdown until the next sleep transition, `-1` when not imminent.
    pub seconds_to_deep_sleep: i64,
}

impl Default for DeviceData {
    fn default() -> Self {
        Self {
            voltage: 0.0,
            env: None,
            fix: None,
            is_moving: false,
            seconds_to_deep_sleep: -1,
        }
    }
}

/// Great-circle distance between two fixes in meters (haversine). Drives
/// the moving/stationary decision against `minMovingDistance`.
pub fn distance_m(a: &GpsFix, b: &GpsFix) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_372_795.0;
    let lat_a = a.latitude_deg.to_radians();
    let lat_b = b.latitude_deg.to_radians();
    let d_lat = (b.latitude_deg - a.latitude_deg).to_radians();
    let d_lon = (b.longitude_deg - a.longitude_deg).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64) -> GpsFix {
        GpsFix {
            latitude_deg: lat,
            longitude_deg: lon,
            altitude_m: 0.0,
            speed_kmph: 0.0,
            course_deg: 0.0,
            satellites: 5,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let f = fix(48.137, 11.575);
        assert_eq!(distance_m(&f, &f), 0.0);
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let d = distance_m(&fix(48.0, 11.0), &fix(49.0, 11.0));
        assert!((d - 111_000.0).abs() < 500.0, "{d}");
    }

    #[test]
    fn city_block_scale() {
        // ~100 m apart in Munich
        let d = distance_m(&fix(48.1370, 11.5750), &fix(48.1379, 11.5750));
        assert!(d > 80.0 && d < 120.0, "{d}");
    }
}
