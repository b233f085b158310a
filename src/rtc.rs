// GeoTrack — Persisted Clock Record
//
// Fixed-layout record kept in the RTC memory region that survives deep sleep
// (but not a cold power-up). Holds the cumulative time accumulators and the
// per-subsystem last-read stamps, guarded by a CRC-32. While the device is
// asleep no clock runs, so all timekeeping is reconstructed from this record
// plus the uptime of the current boot cycle.

use crate::config::{RTC_RECORD_FIELDS, RTC_RECORD_SIZE};

/// Cumulative counters surviving the sleep/wake cycle. All fields are
/// seconds; timestamps are on the "seconds since first power-on" timeline
/// (see [`RtcData::lifetime_sec`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtcData {
    /// Time spent awake across all previous wake cycles.
    pub active_time_sec: u32,
    /// Time the modem/radio rail was energized across all previous cycles.
    pub power_on_time_sec: u32,
    /// Time spent in deep sleep (accumulated from configured sleep quanta,
    /// not measured).
    pub deep_sleep_time_sec: u32,
    /// When the current low-power sleep budget window began.
    /// Only meaningful while a budget countdown is in progress.
    pub deep_sleep_start_sec: u32,
    /// Time spent below the power-save voltage threshold while awake.
    pub low_power_active_time_sec: u32,
    /// Subset of the above during which the radio rail was energized.
    pub low_power_power_on_time_sec: u32,
    /// Last environment sensor read stamp.
    pub last_sensor_read_sec: u32,
    /// Last GPS position read stamp.
    pub last_gps_read_sec: u32,
    /// Last broker reconnect attempt stamp.
    pub last_mqtt_reconnect_sec: u32,
    /// Last broker publish stamp.
    pub last_mqtt_send_sec: u32,
}

impl RtcData {
    /// Data fields in serialization order (CRC excluded).
    fn fields(&self) -> [u32; RTC_RECORD_FIELDS - 1] {
        [
            self.active_time_sec,
            self.power_on_time_sec,
            self.deep_sleep_time_sec,
            self.deep_sleep_start_sec,
            self.low_power_active_time_sec,
            self.low_power_power_on_time_sec,
            self.last_sensor_read_sec,
            self.last_gps_read_sec,
            self.last_mqtt_reconnect_sec,
            self.last_mqtt_send_sec,
        ]
    }

    /// CRC-32 over all data fields, folding one field at a time.
    pub fn checksum(&self) -> u32 {
        self.fields()
            .iter()
            .fold(0, |crc, f| crc32_fold(crc, &f.to_le_bytes()))
    }

    /// Serialize the record with a freshly computed checksum.
    pub fn to_bytes(&self) -> [u8; RTC_RECORD_SIZE] {
        let mut buf = [0u8; RTC_RECORD_SIZE];
        for (i, f) in self.fields().iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&f.to_le_bytes());
        }
        let crc = self.checksum();
        buf[RTC_RECORD_SIZE - 4..].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Deserialize a record and verify its checksum. An invalid record must
    /// never be partially trusted: callers fall back to a zeroed record.
    pub fn from_bytes(buf: &[u8; RTC_RECORD_SIZE]) -> (Self, bool) {
        let word = |i: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&buf[i * 4..i * 4 + 4]);
            u32::from_le_bytes(b)
        };
        let data = Self {
            active_time_sec: word(0),
            power_on_time_sec: word(1),
            deep_sleep_time_sec: word(2),
            deep_sleep_start_sec: word(3),
            low_power_active_time_sec: word(4),
            low_power_power_on_time_sec: word(5),
            last_sensor_read_sec: word(6),
            last_gps_read_sec: word(7),
            last_mqtt_reconnect_sec: word(8),
            last_mqtt_send_sec: word(9),
        };
        let stored = word(RTC_RECORD_FIELDS - 1);
        (data, stored == data.checksum())
    }

    /// Seconds since the device first powered on, reconstructed from the
    /// accumulators plus the current boot cycle's uptime. `power_on_time_sec`
    /// is a subset of active time and therefore not added.
    pub fn lifetime_sec(&self, uptime_sec: u32) -> u32 {
        self.active_time_sec + self.deep_sleep_time_sec + uptime_sec
    }
}

/// Fold `bytes` into a running CRC-32 (reversed polynomial 0xEDB88320,
/// bit-at-a-time). Seed the chain with 0; the value is complemented on entry
/// and exit of each fold, matching standard CRC-32 chaining semantics.
pub fn crc32_fold(crc: u32, bytes: &[u8]) -> u32 {
    let mut c = !crc;
    for &b in bytes {
        c ^= b as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 {
                (c >> 1) ^ 0xEDB8_8320
            } else {
                c >> 1
            };
        }
    }
    !c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RtcData {
        RtcData {
            active_time_sec: 1234,
            power_on_time_sec: 567,
            deep_sleep_time_sec: 89_000,
            deep_sleep_start_sec: 90_000,
            low_power_active_time_sec: 42,
            low_power_power_on_time_sec: 17,
            last_sensor_read_sec: 100,
            last_gps_read_sec: 200,
            last_mqtt_reconnect_sec: 300,
            last_mqtt_send_sec: 400,
        }
    }

    #[test]
    fn crc32_matches_reference() {
        // "123456789" -> 0xCBF43926 is the standard CRC-32 check value.
        assert_eq!(crc32_fold(0, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc32_fold_chains_like_one_shot() {
        let once = crc32_fold(0, b"123456789");
        let chained = crc32_fold(crc32_fold(crc32_fold(0, b"123"), b"456"), b"789");
        assert_eq!(once, chained);
    }

    #[test]
    fn round_trip_preserves_record() {
        let r = sample();
        let (back, valid) = RtcData::from_bytes(&r.to_bytes());
        assert!(valid);
        assert_eq!(back, r);
    }

    #[test]
    fn zeroed_record_round_trips() {
        let (back, valid) = RtcData::from_bytes(&RtcData::default().to_bytes());
        assert!(valid);
        assert_eq!(back, RtcData::default());
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let bytes = sample().to_bytes();
        for bit in 0..bytes.len() * 8 {
            let mut corrupted = bytes;
            corrupted[bit / 8] ^= 1 << (bit % 8);
            let (_, valid) = RtcData::from_bytes(&corrupted);
            assert!(!valid, "bit flip at {bit} not detected");
        }
    }

    #[test]
    fn uninitialized_memory_is_invalid() {
        // Freshly powered RTC memory tends to be garbage; all-0xFF must not
        // validate (all-zero happens to carry a zero CRC only if the CRC of
        // ten zero words were zero, which it is not).
        let (_, valid) = RtcData::from_bytes(&[0xFF; RTC_RECORD_SIZE]);
        assert!(!valid);
        let mut zeros = [0u8; RTC_RECORD_SIZE];
        // all-zero data with an all-zero CRC field
        let (_, valid) = RtcData::from_bytes(&zeros);
        assert!(!valid);
        // but a properly checksummed zero record is fine
        zeros.copy_from_slice(&RtcData::default().to_bytes());
        let (_, valid) = RtcData::from_bytes(&zeros);
        assert!(valid);
    }

    #[test]
    fn lifetime_is_active_plus_sleep_plus_uptime() {
        let r = sample();
        assert_eq!(r.lifetime_sec(10), 1234 + 89_000 + 10);
    }
}
