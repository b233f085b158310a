// GeoTrack — MQTT Publisher
//
// Thin adapter over the ESP-IDF MQTT client. One value per topic under
// `<mqttName>/<mqttId>/`, mirroring what the web UI shows. Connection state
// is tracked from the client's event callback; the orchestrator throttles
// reconnect attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

use crate::data::DeviceData;
use crate::options::Options;
use crate::subsystems::Publisher;
use crate::telemetry::TelemetrySnapshot;

pub struct MqttPublisher {
    url: String,
    client_id: String,
    username: String,
    password: String,
    topic_base: String,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

impl MqttPublisher {
    pub fn new(opts: &Options) -> Self {
        Self {
            url: format!("mqtt://{}:{}", opts.mqtt_server, opts.mqtt_port),
            client_id: format!("{}-{}", opts.mqtt_name, opts.mqtt_id),
            username: opts.mqtt_user.clone(),
            password: opts.mqtt_password.clone(),
            topic_base: format!("{}/{}", opts.mqtt_name, opts.mqtt_id),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn send(&mut self, topic: &str, value: String) -> anyhow::Result<()> {
        let topic = format!("{}/{}", self.topic_base, topic);
        if let Some(client) = self.client.as_mut() {
            client.enqueue(&topic, QoS::AtLeastOnce, false, value.as_bytes())?;
        }
        Ok(())
    }
}

impl Publisher for MqttPublisher {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn reconnect(&mut self) -> anyhow::Result<()> {
        log::info!("connecting to broker {}", self.url);
        let conf = MqttClientConfiguration {
            client_id: Some(&self.client_id),
            username: (!self.username.is_empty()).then_some(self.username.as_str()),
            password: (!self.password.is_empty()).then_some(self.password.as_str()),
            ..Default::default()
        };
        let connected = Arc::clone(&self.connected);
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => connected.store(true, Ordering::SeqCst),
                EventPayload::Disconnected => connected.store(false, Ordering::SeqCst),
                _ => {}
            }
        })?;
        self.client = Some(client);
        Ok(())
    }

    fn publish(&mut self, data: &DeviceData, telemetry: &TelemetrySnapshot) -> anyhow::Result<()> {
        self.send("Voltage", format!("{:.2}", telemetry.voltage))?;
        if let Some(env) = &data.env {
            self.send("Temperature", format!("{:.1}", env.temperature_c))?;
            self.send("Humidity", format!("{:.1}", env.humidity_pct))?;
            self.send("Pressure", format!("{:.1}", env.pressure_hpa))?;
        }
        if let Some(fix) = &data.fix {
            self.send("Latitude", format!("{:.6}", fix.latitude_deg))?;
            self.send("Longitude", format!("{:.6}", fix.longitude_deg))?;
            self.send("Altitude", format!("{:.1}", fix.altitude_m))?;
            self.send("Kmph", format!("{:.1}", fix.speed_kmph))?;
            self.send("Satellites", fix.satellites.to_string())?;
        }
        self.send("Moving", if data.is_moving { "1" } else { "0" }.into())?;
        self.send("ActiveTimeSec", telemetry.active_time_sec.to_string())?;
        self.send("PowerOnTimeSec", telemetry.power_on_time_sec.to_string())?;
        self.send("DeepSleepTimeSec", telemetry.deep_sleep_time_sec.to_string())?;
        self.send("mAh", format!("{:.2}", telemetry.power_consumption_mah))?;
        self.send(
            "mAhLowPower",
            format!("{:.2}", telemetry.low_power_consumption_mah),
        )?;
        self.send(
            "SecondsToDeepSleep",
            telemetry.seconds_to_deep_sleep.to_string(),
        )?;
        log::info!("telemetry published to {}", self.topic_base);
        Ok(())
    }
}
