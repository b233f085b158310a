// GeoTrack — Firmware Entry Point
//
// Boot sequence:
//   1. Mount SPIFFS and load the options file (defaults on failure).
//   2. Sample the supply voltage and hand control to the duty cycle
//      controller — if a low-power sleep budget is still running out, the
//      device goes straight back to sleep here and never reaches step 3.
//   3. Bring up I2C/BME280, WiFi and the MQTT publisher (each best-effort).
//   4. Run the single-threaded round-robin orchestrator loop until the
//      active-time budget expires and the controller powers the device down.

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    use geotrack::config::*;
    use geotrack::drivers::bme280::Bme280;
    use geotrack::drivers::mqtt::MqttPublisher;
    use geotrack::drivers::power::SupplyVoltage;
    use geotrack::drivers::rtcmem::RtcSlowMemory;
    use geotrack::drivers::sleep::TimerDeepSleep;
    use geotrack::drivers::spiffs;
    use geotrack::hal::{wait_until, PowerSupply};
    use geotrack::options::Options;
    use geotrack::orchestrator::Orchestrator;
    use geotrack::subsystems::{EnvSensor, Modem, Publisher};

    /// Seconds since boot (the clock the duty cycle measures this wake
    /// cycle against).
    fn uptime_sec() -> u32 {
        unsafe { (esp_idf_sys::esp_timer_get_time() / 1_000_000) as u32 }
    }

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("GeoTrack firmware starting…");

        let peripherals = Peripherals::take()?;

        // ---- Options ------------------------------------------------------
        let mut options = Options::default();
        if let Err(e) = spiffs::mount("/spiffs") {
            log::error!("options storage unavailable: {e:#}");
        } else if let Err(e) = options.load(OPTIONS_FILE) {
            // Not fatal: continue with the in-memory defaults.
            log::warn!("options not loaded ({e}), using defaults");
        }

        // ---- Supply voltage ------------------------------------------------
        let mut supply = SupplyVoltage::new()?;
        // Let the divider settle before the first sample feeds the sleep
        // decision; keep the watchdog fed while polling.
        wait_until(
            || supply.read_voltage().map(|v| v > 0.5).unwrap_or(false),
            || unsafe {
                esp_idf_sys::esp_task_wdt_reset();
            },
            50,
            Duration::from_millis(10),
        );

        // ---- Environment sensor -------------------------------------------
        let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // SDA
            peripherals.pins.gpio7, // SCL
            &i2c_config,
        )?;
        // SAFETY: the I2C peripheral is a singleton obtained from
        // `Peripherals::take()` and lives for the entire programme duration.
        let i2c_bus: &'static Mutex<I2cDriver<'static>> =
            Box::leak(Box::new(Mutex::new(unsafe { core::mem::transmute(i2c) })));

        let env: Option<Box<dyn EnvSensor>> = {
            let mut sensor = Bme280::new(i2c_bus);
            if sensor.is_connected() && sensor.init().is_ok() {
                Some(Box::new(sensor))
            } else {
                log::warn!("BME280 not responding, continuing without it");
                None
            }
        };

        // The SIM808 AT-command engine is an external collaborator; this
        // build runs without a modem fitted.
        let modem: Option<Box<dyn Modem>> = None;

        // ---- WiFi + broker (best-effort) ----------------------------------
        let mut wifi_holder = None;
        let publisher: Option<Box<dyn Publisher>> =
            if options.is_mqtt_enabled && !options.wlan_ap.is_empty() {
                match connect_wifi(peripherals.modem, &options) {
                    Ok(wifi) => {
                        wifi_holder = Some(wifi);
                        Some(Box::new(MqttPublisher::new(&options)))
                    }
                    Err(e) => {
                        log::warn!("WiFi unavailable ({e:#}), continuing offline");
                        None
                    }
                }
            } else {
                None
            };
        let _wifi = wifi_holder; // keep the connection alive

        // ---- Orchestrator --------------------------------------------------
        let mut orchestrator = Orchestrator::new(
            options,
            supply,
            RtcSlowMemory,
            TimerDeepSleep,
            env,
            modem,
            publisher,
        );
        // May not return: a running sleep budget puts the device back to
        // sleep from here.
        orchestrator.begin(uptime_sec());

        log::info!("boot complete — entering round-robin loop");
        loop {
            orchestrator.run_once(uptime_sec());
            thread::sleep(Duration::from_millis(LOOP_PAUSE_MS));
        }
    }

    fn connect_wifi(
        modem: esp_idf_hal::modem::Modem,
        options: &Options,
    ) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(modem, sys_loop.clone(), Some(nvs))?,
            sys_loop,
        )?;
        let auth_method = if options.wlan_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: options.wlan_ap.as_str().try_into().unwrap_or_default(),
            password: options.wlan_password.as_str().try_into().unwrap_or_default(),
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;
        wifi.connect()?;
        wifi.wait_netif_up()?;
        log::info!("WiFi connected to '{}'", options.wlan_ap);
        Ok(wifi)
    }
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    // Firmware binary; on the host only the library and its tests matter.
    eprintln!("geotrack runs on ESP-IDF targets only");
}
