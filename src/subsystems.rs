// GeoTrack — External Collaborator Interfaces
//
// The orchestrator talks to the sensor, the GPS/GSM modem and the broker
// publisher only through these traits. The AT-command engine, the MQTT wire
// protocol and the SMS grammar live behind them.

use crate::data::{DeviceData, EnvReading, GpsFix};
use crate::telemetry::TelemetrySnapshot;

/// Environment sensor (temperature/humidity/pressure).
pub trait EnvSensor {
    fn read(&mut self) -> anyhow::Result<EnvReading>;
}

/// GPS/GSM modem. Power control of the radio rail is explicit so the duty
/// cycle controller can account radio-on time.
pub trait Modem {
    fn set_power(&mut self, on: bool) -> anyhow::Result<()>;
    fn is_powered(&self) -> bool;
    /// Poll for a position fix. `Ok(None)` while no fix is available.
    fn read_fix(&mut self) -> anyhow::Result<Option<GpsFix>>;
    /// Fetch and clear pending SMS command texts.
    fn poll_sms(&mut self) -> anyhow::Result<Vec<String>>;
    /// Execute one SMS command text. Replies go out synchronously, within
    /// the same loop iteration and therefore ahead of the sleep decision.
    fn execute_sms(&mut self, command: &str) -> anyhow::Result<()>;
}

/// Message broker publisher (existing pub/sub client library underneath).
pub trait Publisher {
    fn is_connected(&self) -> bool;
    fn reconnect(&mut self) -> anyhow::Result<()>;
    fn publish(&mut self, data: &DeviceData, telemetry: &TelemetrySnapshot) -> anyhow::Result<()>;
}
