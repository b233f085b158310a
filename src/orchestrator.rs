// GeoTrack — Orchestrator
//
// Single-threaded round-robin poll loop. Each iteration samples the supply,
// gives every subsystem one bounded turn (throttled by the persisted
// last-read stamps so polling cadence survives sleep cycles), then asks the
// duty cycle controller whether to sleep. Nothing runs concurrently with
// anything else; a subsystem that blocks blocks the device.

use crate::data::{distance_m, DeviceData};
use crate::hal::{PowerSupply, RtcMemory, SleepControl};
use crate::options::Options;
use crate::power::PowerMonitor;
use crate::sleep::DutyCycle;
use crate::subsystems::{EnvSensor, Modem, Publisher};
use crate::telemetry::TelemetrySnapshot;

/// Throttle helper on the "seconds since first power-on" timeline. Fires on
/// the first ever call (zero stamp) and whenever more than `interval_sec`
/// has passed since the stamp; firing advances the stamp.
pub fn interval_elapsed(last_sec: &mut u32, interval_sec: u32, now_sec: u32) -> bool {
    if *last_sec == 0 || now_sec.saturating_sub(*last_sec) > interval_sec {
        *last_sec = now_sec;
        return true;
    }
    false
}

pub struct Orchestrator<M: RtcMemory, S: SleepControl, V: PowerSupply> {
    pub opts: Options,
    supply: V,
    duty: DutyCycle<M, S>,
    power: PowerMonitor,
    data: DeviceData,
    env: Option<Box<dyn EnvSensor>>,
    modem: Option<Box<dyn Modem>>,
    publisher: Option<Box<dyn Publisher>>,
    /// Cooperative deep-sleep lock: while held, a due sleep decision is
    /// deferred to a later iteration instead of interrupting work.
    sleep_locked: bool,
    /// SMS polling stamp; per-boot only, not worth persisting.
    last_sms_check_sec: u32,
}

impl<M: RtcMemory, S: SleepControl, V: PowerSupply> Orchestrator<M, S, V> {
    pub fn new(
        opts: Options,
        supply: V,
        mem: M,
        sleeper: S,
        env: Option<Box<dyn EnvSensor>>,
        modem: Option<Box<dyn Modem>>,
        publisher: Option<Box<dyn Publisher>>,
    ) -> Self {
        Self {
            opts,
            supply,
            duty: DutyCycle::new(mem, sleeper),
            power: PowerMonitor::new(),
            data: DeviceData::default(),
            env,
            modem,
            publisher,
            sleep_locked: false,
            last_sms_check_sec: 0,
        }
    }

    pub fn data(&self) -> &DeviceData {
        &self.data
    }

    pub fn duty(&self) -> &DutyCycle<M, S> {
        &self.duty
    }

    /// Held by any external caller doing work a sleep transition must not
    /// interrupt (web UI session, OTA). Checked, not enforced: the
    /// controller itself never blocks on it.
    pub fn set_deep_sleep_lock(&mut self, locked: bool) {
        self.sleep_locked = locked;
    }

    pub fn deep_sleep_locked(&self) -> bool {
        self.sleep_locked
    }

    pub fn telemetry(&self, uptime_sec: u32) -> TelemetrySnapshot {
        TelemetrySnapshot::collect(
            self.duty.rtc(),
            self.power.voltage,
            self.power.is_low_power,
            self.power.is_power_on,
            uptime_sec,
            self.data.seconds_to_deep_sleep,
        )
    }

    /// Boot-time initialization. May not return on hardware: when a sleep
    /// budget is still running out, the duty controller goes straight back
    /// to sleep from here.
    pub fn begin(&mut self, uptime_sec: u32) {
        let opts = self.opts.clone();
        let volts = match self.supply.read_voltage() {
            Ok(v) => {
                self.data.voltage = v;
                v
            }
            Err(e) => {
                // Never substitute 0 V: a broken ADC would read as
                // definitively low power and drive the boot-time
                // continuation check straight back to sleep. The threshold
                // itself keeps the check neutral.
                log::error!("initial voltage sample failed: {e:#}");
                opts.power_save_mode_voltage
            }
        };
        self.duty.begin(&opts, volts, uptime_sec);
        let now = self.duty.lifetime_sec(uptime_sec);
        self.power.begin(volts, opts.power_save_mode_voltage, now);
    }

    /// One round-robin iteration. Returns `true` when a sleep transition was
    /// issued (observable in tests; on hardware the call never comes back).
    pub fn run_once(&mut self, uptime_sec: u32) -> bool {
        let opts = self.opts.clone();
        let now = self.duty.lifetime_sec(uptime_sec);

        // Supply voltage, every iteration; regime time is booked on edges
        // inside the monitor.
        match self.supply.read_voltage() {
            Ok(volts) => {
                self.power
                    .sample(volts, opts.power_save_mode_voltage, now, self.duty.rtc_mut());
                self.data.voltage = volts;
            }
            Err(e) => log::warn!("voltage sample failed: {e:#}"),
        }

        self.poll_modem_power(&opts);
        self.poll_env_sensor(&opts, now);
        self.poll_gps(&opts, now);
        self.poll_sms(&opts, now);
        self.poll_publisher(&opts, now, uptime_sec);

        // Sleep decision last, with the countdown refreshed for display.
        self.data.seconds_to_deep_sleep =
            self.duty
                .seconds_to_deep_sleep(&opts, self.power.voltage, uptime_sec);
        if self.duty.have_to_sleep(&opts, self.power.voltage, uptime_sec) {
            if self.sleep_locked {
                log::debug!("deep sleep due but locked, deferring");
            } else {
                self.duty
                    .sleep(false, &opts, self.power.is_power_on, uptime_sec);
                return true;
            }
        }
        false
    }

    fn poll_modem_power(&mut self, opts: &Options) {
        let Some(modem) = self.modem.as_mut() else {
            self.power.is_power_on = false;
            return;
        };
        let desired = opts.gsm_power && (opts.is_gsm_enabled || opts.is_gps_enabled);
        if modem.is_powered() != desired {
            if let Err(e) = modem.set_power(desired) {
                log::error!("modem power switch failed: {e:#}");
            }
        }
        self.power.is_power_on = modem.is_powered();
    }

    fn poll_env_sensor(&mut self, opts: &Options, now: u32) {
        let Some(env) = self.env.as_mut() else {
            return;
        };
        if !interval_elapsed(
            &mut self.duty.rtc_mut().last_sensor_read_sec,
            opts.bme280_check_interval_sec,
            now,
        ) {
            return;
        }
        match env.read() {
            Ok(reading) => {
                log::debug!(
                    "environment: {:.1} C, {:.0} %, {:.0} hPa",
                    reading.temperature_c,
                    reading.humidity_pct,
                    reading.pressure_hpa
                );
                self.data.env = Some(reading);
            }
            Err(e) => log::warn!("environment sensor read failed: {e:#}"),
        }
    }

    fn poll_gps(&mut self, opts: &Options, now: u32) {
        if !opts.is_gps_enabled {
            return;
        }
        let Some(modem) = self.modem.as_mut() else {
            return;
        };
        if !modem.is_powered()
            || !interval_elapsed(
                &mut self.duty.rtc_mut().last_gps_read_sec,
                opts.gps_check_interval_sec,
                now,
            )
        {
            return;
        }
        match modem.read_fix() {
            Ok(Some(fix)) => {
                if let Some(prev) = self.data.fix {
                    let moved = distance_m(&prev, &fix);
                    self.data.is_moving = moved >= opts.min_moving_distance as f64;
                }
                self.data.fix = Some(fix);
            }
            Ok(None) => log::debug!("no GPS fix yet"),
            Err(e) => log::warn!("GPS read failed: {e:#}"),
        }
    }

    fn poll_sms(&mut self, opts: &Options, now: u32) {
        if !opts.is_gsm_enabled {
            return;
        }
        let Some(modem) = self.modem.as_mut() else {
            return;
        };
        if !modem.is_powered()
            || !interval_elapsed(&mut self.last_sms_check_sec, opts.sms_check_interval_sec, now)
        {
            return;
        }
        let commands = match modem.poll_sms() {
            Ok(c) => c,
            Err(e) => {
                log::warn!("SMS poll failed: {e:#}");
                return;
            }
        };
        // The whole batch runs synchronously within this iteration, before
        // the sleep decision; no lock needed.
        for cmd in &commands {
            log::info!("SMS command: {cmd}");
            if let Err(e) = modem.execute_sms(cmd) {
                log::warn!("SMS command '{cmd}' failed: {e:#}");
            }
        }
    }

    fn poll_publisher(&mut self, opts: &Options, now: u32, uptime_sec: u32) {
        if !opts.is_mqtt_enabled {
            return;
        }

        let connected = self.publisher.as_ref().is_some_and(|p| p.is_connected());
        if !connected
            && interval_elapsed(
                &mut self.duty.rtc_mut().last_mqtt_reconnect_sec,
                opts.mqtt_reconnect_interval_sec,
                now,
            )
        {
            if let Some(publisher) = self.publisher.as_mut() {
                if let Err(e) = publisher.reconnect() {
                    log::warn!("broker reconnect failed: {e:#}");
                }
            }
        }
        if !self.publisher.as_ref().is_some_and(|p| p.is_connected()) {
            return;
        }

        let send_interval = if self.data.is_moving {
            opts.mqtt_send_on_move_every_sec
        } else {
            opts.mqtt_send_on_non_move_every_sec
        };
        if !interval_elapsed(
            &mut self.duty.rtc_mut().last_mqtt_send_sec,
            send_interval,
            now,
        ) {
            return;
        }
        let telemetry = self.telemetry(uptime_sec);
        if let Some(publisher) = self.publisher.as_mut() {
            if let Err(e) = publisher.publish(&self.data, &telemetry) {
                log::warn!("publish failed: {e:#}");
            }
        }
    }
}
