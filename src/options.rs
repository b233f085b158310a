// GeoTrack — Runtime Options
//
// Complete configuration of the tracker, persisted as one `key=value` pair
// per line (the web UI edits the same file). Loading is all-or-nothing: a
// malformed line or unknown key rejects the whole file and the device keeps
// whatever it already holds in memory.

use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("options file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: missing '=' separator")]
    MissingSeparator { line: usize },
    #[error("line {line}: unknown option key '{key}'")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: invalid value for '{key}': '{value}'")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub gprs_ap: String,
    pub wlan_ap: String,
    pub wlan_password: String,
    pub is_debug_active: bool,
    pub bme280_check_interval_sec: u32,
    pub gsm_power: bool,
    pub is_gsm_enabled: bool,
    pub is_gps_enabled: bool,
    pub gps_check_interval_sec: u32,
    pub min_moving_distance: u32,
    pub phone_number: String,
    pub sms_check_interval_sec: u32,
    pub is_deep_sleep_enabled: bool,
    pub power_save_mode_voltage: f32,
    pub power_check_interval_sec: u32,
    pub active_time_sec: u32,
    pub deep_sleep_time_sec: u32,
    pub is_mqtt_enabled: bool,
    pub mqtt_name: String,
    pub mqtt_id: String,
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_password: String,
    pub mqtt_reconnect_interval_sec: u32,
    pub mqtt_send_on_move_every_sec: u32,
    pub mqtt_send_on_non_move_every_sec: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            gprs_ap: "internet".into(),
            wlan_ap: String::new(),
            wlan_password: String::new(),
            is_debug_active: false,
            bme280_check_interval_sec: 60,
            gsm_power: true,
            is_gsm_enabled: true,
            is_gps_enabled: true,
            gps_check_interval_sec: 60,
            min_moving_distance: 100,
            phone_number: String::new(),
            sms_check_interval_sec: 60,
            is_deep_sleep_enabled: true,
            power_save_mode_voltage: 15.0,
            power_check_interval_sec: 60,
            active_time_sec: 10,
            deep_sleep_time_sec: 600,
            is_mqtt_enabled: false,
            mqtt_name: "GeoTrack".into(),
            mqtt_id: "01".into(),
            mqtt_server: String::new(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_password: String::new(),
            mqtt_reconnect_interval_sec: 10,
            mqtt_send_on_move_every_sec: 600,
            mqtt_send_on_non_move_every_sec: 600,
        }
    }
}

impl Options {
    /// Parse a full options file. Starts from the defaults; any error
    /// rejects the entire text.
    pub fn parse(text: &str) -> Result<Self, OptionsError> {
        let mut opts = Self::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (key, value) = trimmed
                .split_once('=')
                .ok_or(OptionsError::MissingSeparator { line })?;
            opts.set(line, key.trim(), value.trim())?;
        }
        Ok(opts)
    }

    /// Replace the current options with the contents of `path`. On any
    /// failure the previous values stay in effect and the error is returned
    /// for logging.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), OptionsError> {
        let text = fs::read_to_string(path)?;
        *self = Self::parse(&text)?;
        Ok(())
    }

    /// Write the options back out in the same line format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OptionsError> {
        fs::write(path, self.to_file_string())?;
        Ok(())
    }

    fn set(&mut self, line: usize, key: &str, value: &str) -> Result<(), OptionsError> {
        let invalid = || OptionsError::InvalidValue {
            line,
            key: key.to_string(),
            value: value.to_string(),
        };
        let as_bool = || parse_bool(value).ok_or_else(invalid);
        macro_rules! num {
            () => {
                value.parse().map_err(|_| invalid())?
            };
        }
        match key {
            "gprsAP" => self.gprs_ap = value.into(),
            "wlanAP" => self.wlan_ap = value.into(),
            "wlanPassword" => self.wlan_password = value.into(),
            "isDebugActive" => self.is_debug_active = as_bool()?,
            "bme280CheckIntervalSec" => self.bme280_check_interval_sec = num!(),
            "gsmPower" => self.gsm_power = as_bool()?,
            "isGsmEnabled" => self.is_gsm_enabled = as_bool()?,
            "isGpsEnabled" => self.is_gps_enabled = as_bool()?,
            "gpsCheckIntervalSec" => self.gps_check_interval_sec = num!(),
            "minMovingDistance" => self.min_moving_distance = num!(),
            "phoneNumber" => self.phone_number = value.into(),
            "smsCheckIntervalSec" => self.sms_check_interval_sec = num!(),
            "isDeepSleepEnabled" => self.is_deep_sleep_enabled = as_bool()?,
            "powerSaveModeVoltage" => self.power_save_mode_voltage = num!(),
            "powerCheckIntervalSec" => self.power_check_interval_sec = num!(),
            "activeTimeSec" => self.active_time_sec = num!(),
            "deepSleepTimeSec" => self.deep_sleep_time_sec = num!(),
            "isMqttEnabled" => self.is_mqtt_enabled = as_bool()?,
            "mqttName" => self.mqtt_name = value.into(),
            "mqttId" => self.mqtt_id = value.into(),
            "mqttServer" => self.mqtt_server = value.into(),
            "mqttPort" => self.mqtt_port = num!(),
            "mqttUser" => self.mqtt_user = value.into(),
            "mqttPassword" => self.mqtt_password = value.into(),
            "mqttReconnectIntervalSec" => self.mqtt_reconnect_interval_sec = num!(),
            "mqttSendOnMoveEverySec" => self.mqtt_send_on_move_every_sec = num!(),
            "mqttSendOnNonMoveEverySec" => self.mqtt_send_on_non_move_every_sec = num!(),
            _ => {
                return Err(OptionsError::UnknownKey {
                    line,
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn to_file_string(&self) -> String {
        let mut s = String::new();
        let mut kv = |k: &str, v: String| {
            s.push_str(k);
            s.push('=');
            s.push_str(&v);
            s.push('\n');
        };
        kv("gprsAP", self.gprs_ap.clone());
        kv("wlanAP", self.wlan_ap.clone());
        kv("wlanPassword", self.wlan_password.clone());
        kv("isDebugActive", bool_str(self.is_debug_active));
        kv(
            "bme280CheckIntervalSec",
            self.bme280_check_interval_sec.to_string(),
        );
        kv("gsmPower", bool_str(self.gsm_power));
        kv("isGsmEnabled", bool_str(self.is_gsm_enabled));
        kv("isGpsEnabled", bool_str(self.is_gps_enabled));
        kv("gpsCheckIntervalSec", self.gps_check_interval_sec.to_string());
        kv("minMovingDistance", self.min_moving_distance.to_string());
        kv("phoneNumber", self.phone_number.clone());
        kv("smsCheckIntervalSec", self.sms_check_interval_sec.to_string());
        kv("isDeepSleepEnabled", bool_str(self.is_deep_sleep_enabled));
        kv(
            "powerSaveModeVoltage",
            format!("{:.1}", self.power_save_mode_voltage),
        );
        kv(
            "powerCheckIntervalSec",
            self.power_check_interval_sec.to_string(),
        );
        kv("activeTimeSec", self.active_time_sec.to_string());
        kv("deepSleepTimeSec", self.deep_sleep_time_sec.to_string());
        kv("isMqttEnabled", bool_str(self.is_mqtt_enabled));
        kv("mqttName", self.mqtt_name.clone());
        kv("mqttId", self.mqtt_id.clone());
        kv("mqttServer", self.mqtt_server.clone());
        kv("mqttPort", self.mqtt_port.to_string());
        kv("mqttUser", self.mqtt_user.clone());
        kv("mqttPassword", self.mqtt_password.clone());
        kv(
            "mqttReconnectIntervalSec",
            self.mqtt_reconnect_interval_sec.to_string(),
        );
        kv(
            "mqttSendOnMoveEverySec",
            self.mqtt_send_on_move_every_sec.to_string(),
        );
        kv(
            "mqttSendOnNonMoveEverySec",
            self.mqtt_send_on_non_move_every_sec.to_string(),
        );
        s
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn bool_str(v: bool) -> String {
    if v { "1" } else { "0" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_core_keys() {
        let opts = Options::parse(
            "isDeepSleepEnabled=1\n\
             powerSaveModeVoltage=11.5\n\
             powerCheckIntervalSec=120\n\
             activeTimeSec=30\n\
             deepSleepTimeSec=1200\n",
        )
        .unwrap();
        assert!(opts.is_deep_sleep_enabled);
        assert_eq!(opts.power_save_mode_voltage, 11.5);
        assert_eq!(opts.power_check_interval_sec, 120);
        assert_eq!(opts.active_time_sec, 30);
        assert_eq!(opts.deep_sleep_time_sec, 1200);
        // untouched keys keep their defaults
        assert_eq!(opts.mqtt_port, 1883);
    }

    #[test]
    fn unknown_key_rejects_whole_file() {
        let err = Options::parse("activeTimeSec=30\nbogusKey=1\n").unwrap_err();
        assert!(matches!(err, OptionsError::UnknownKey { line: 2, .. }));
    }

    #[test]
    fn missing_separator_rejects_whole_file() {
        let err = Options::parse("activeTimeSec\n").unwrap_err();
        assert!(matches!(err, OptionsError::MissingSeparator { line: 1 }));
    }

    #[test]
    fn bad_number_is_reported_with_key() {
        let err = Options::parse("mqttPort=not-a-port\n").unwrap_err();
        assert!(matches!(err, OptionsError::InvalidValue { .. }));
    }

    #[test]
    fn file_format_round_trips() {
        let mut opts = Options::default();
        opts.wlan_ap = "tracker-net".into();
        opts.power_save_mode_voltage = 11.5;
        opts.is_mqtt_enabled = true;
        let back = Options::parse(&opts.to_file_string()).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn failed_load_keeps_previous_values() {
        let mut opts = Options::default();
        opts.active_time_sec = 42;
        assert!(opts.load("/nonexistent/options.txt").is_err());
        assert_eq!(opts.active_time_sec, 42);
    }
}
