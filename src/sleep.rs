// GeoTrack — Duty Cycle Controller
//
// Owns the persisted clock and decides, once per wake cycle, whether the
// active-time budget is exhausted and the device must go back into deep
// sleep. The hardware cannot sleep arbitrarily long in one call and no clock
// runs while asleep, so a long low-power period is covered by repeated short
// sleep quanta: each wake re-checks the voltage and continues the same
// budget window (tracked by `deep_sleep_start_sec`) instead of restarting it.

use crate::config::STARTUP_GRACE_SEC;
use crate::hal::{RtcMemory, SleepControl};
use crate::options::Options;
use crate::rtc::RtcData;

pub struct DutyCycle<M: RtcMemory, S: SleepControl> {
    mem: M,
    sleeper: S,
    rtc: RtcData,
    /// Uptime stamp of the start of this cycle's active period.
    wake_start_sec: u32,
}

impl<M: RtcMemory, S: SleepControl> DutyCycle<M, S> {
    pub fn new(mem: M, sleeper: S) -> Self {
        Self {
            mem,
            sleeper,
            rtc: RtcData::default(),
            wake_start_sec: 0,
        }
    }

    pub fn rtc(&self) -> &RtcData {
        &self.rtc
    }

    pub fn rtc_mut(&mut self) -> &mut RtcData {
        &mut self.rtc
    }

    /// Seconds awake in the current cycle.
    pub fn active_elapsed_sec(&self, uptime_sec: u32) -> u32 {
        uptime_sec.saturating_sub(self.wake_start_sec)
    }

    /// Seconds since the device first powered on.
    pub fn lifetime_sec(&self, uptime_sec: u32) -> u32 {
        self.rtc.lifetime_sec(uptime_sec)
    }

    fn grace_elapsed(&self, uptime_sec: u32) -> bool {
        self.lifetime_sec(uptime_sec) >= STARTUP_GRACE_SEC
    }

    /// Boot-time entry: restore the persisted clock and, when a low-power
    /// sleep budget is still running out, go right back to sleep without
    /// doing any active work this cycle.
    pub fn begin(&mut self, opts: &Options, volts: f32, uptime_sec: u32) {
        let mut buf = [0u8; crate::config::RTC_RECORD_SIZE];
        self.mem.read(&mut buf);
        let (rtc, valid) = RtcData::from_bytes(&buf);
        if valid {
            self.rtc = rtc;
            log::info!(
                "persisted clock restored (active {} s, sleep {} s)",
                rtc.active_time_sec,
                rtc.deep_sleep_time_sec
            );
        } else {
            // Cold boot or corruption. Losing the accumulators costs at most
            // one cycle's worth of counting; not an error.
            self.rtc = RtcData::default();
            log::warn!("persisted clock invalid, starting from zero");
        }

        if opts.is_deep_sleep_enabled && self.grace_elapsed(uptime_sec) {
            if volts < opts.power_save_mode_voltage {
                let now = self.lifetime_sec(uptime_sec);
                let slept = now.saturating_sub(self.rtc.deep_sleep_start_sec);
                if slept < opts.deep_sleep_time_sec {
                    // Budget window still open: this wake-up exists only to
                    // re-check the voltage. The radio never came up.
                    self.sleep(true, opts, false, uptime_sec);
                }
            }
        }

        self.wake_start_sec = uptime_sec;
    }

    /// Should the device enter deep sleep now? Pure query, safe to evaluate
    /// every loop iteration; callers holding the deep-sleep lock ignore a
    /// `true` until their work completes.
    pub fn have_to_sleep(&self, opts: &Options, volts: f32, uptime_sec: u32) -> bool {
        opts.is_deep_sleep_enabled
            && volts < opts.power_save_mode_voltage
            && self.active_elapsed_sec(uptime_sec) >= opts.active_time_sec
            && self.grace_elapsed(uptime_sec)
    }

    /// Countdown until the sleep transition, for the UI/publisher. `-1`
    /// whenever sleep is not imminent (disabled, voltage fine, or still
    /// inside the startup grace period).
    pub fn seconds_to_deep_sleep(&self, opts: &Options, volts: f32, uptime_sec: u32) -> i64 {
        if opts.is_deep_sleep_enabled
            && volts < opts.power_save_mode_voltage
            && self.grace_elapsed(uptime_sec)
        {
            opts.active_time_sec as i64 - self.active_elapsed_sec(uptime_sec) as i64
        } else {
            -1
        }
    }

    /// Enter deep sleep: book this cycle's active time, persist the record,
    /// and issue the hardware directive for one sleep quantum. On real
    /// hardware this does not return; execution resumes at [`Self::begin`].
    pub fn sleep(&mut self, continuation: bool, opts: &Options, power_on: bool, uptime_sec: u32) {
        let now = self.lifetime_sec(uptime_sec);
        if !continuation {
            // Fresh budget window.
            self.rtc.deep_sleep_start_sec = now;
        }

        let cycle_sec = self.active_elapsed_sec(uptime_sec);
        self.rtc.active_time_sec += cycle_sec;
        if power_on {
            self.rtc.power_on_time_sec += cycle_sec;
        }
        // The quantum is configured, not measured: the clock does not run
        // while asleep.
        self.rtc.deep_sleep_time_sec += opts.power_check_interval_sec;

        self.mem.write(&self.rtc.to_bytes());

        log::info!(
            "entering deep sleep for {} s (continuation: {continuation})",
            opts.power_check_interval_sec
        );
        self.sleeper
            .deep_sleep(opts.power_check_interval_sec as u64 * 1_000_000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RTC_RECORD_SIZE;
    use crate::hal::mock::{MockRtcMemory, MockSleep};

    fn opts() -> Options {
        // Reference scenario: 15.0 V threshold, 600 s sleep budget, 60 s
        // check interval, 10 s active budget.
        Options::default()
    }

    /// A record with enough accumulated lifetime to be past the startup
    /// grace period.
    fn seasoned_record() -> RtcData {
        RtcData {
            active_time_sec: 500,
            deep_sleep_time_sec: 2000,
            ..RtcData::default()
        }
    }

    fn mem_with(rtc: RtcData) -> MockRtcMemory {
        let mut mem = [0u8; RTC_RECORD_SIZE];
        mem.copy_from_slice(&rtc.to_bytes());
        MockRtcMemory::with(mem)
    }

    #[test]
    fn invalid_record_degrades_to_zero() {
        let mut duty = DutyCycle::new(MockRtcMemory::garbage(), MockSleep::default());
        duty.begin(&opts(), 16.0, 0);
        assert_eq!(*duty.rtc(), RtcData::default());
    }

    #[test]
    fn have_to_sleep_threshold() {
        let mut duty = DutyCycle::new(mem_with(seasoned_record()), MockSleep::default());
        // Voltage fine at boot so begin() does not short-circuit into sleep.
        duty.begin(&opts(), 16.0, 0);
        assert!(!duty.have_to_sleep(&opts(), 10.0, 9));
        assert!(duty.have_to_sleep(&opts(), 10.0, 11));
        // Voltage fine: never.
        assert!(!duty.have_to_sleep(&opts(), 16.0, 11));
        // Disabled: never.
        let mut disabled = opts();
        disabled.is_deep_sleep_enabled = false;
        assert!(!duty.have_to_sleep(&disabled, 10.0, 11));
    }

    #[test]
    fn grace_period_blocks_early_sleep() {
        // Zeroed record: lifetime == uptime, below STARTUP_GRACE_SEC.
        let mut duty = DutyCycle::new(MockRtcMemory::garbage(), MockSleep::default());
        duty.begin(&opts(), 10.0, 0);
        assert!(duty.sleeper.requests_us.is_empty());
        assert!(!duty.have_to_sleep(&opts(), 10.0, 11));
        // Past the grace the same condition holds.
        assert!(duty.have_to_sleep(&opts(), 10.0, STARTUP_GRACE_SEC + 11));
    }

    #[test]
    fn countdown_hidden_during_startup_grace() {
        // Cold boot with the voltage already low: sleep cannot fire until
        // the grace elapses, so the panel shows -1 rather than a countdown.
        let mut duty = DutyCycle::new(MockRtcMemory::garbage(), MockSleep::default());
        duty.begin(&opts(), 10.0, 0);
        assert_eq!(duty.seconds_to_deep_sleep(&opts(), 10.0, 4), -1);
        assert_ne!(
            duty.seconds_to_deep_sleep(&opts(), 10.0, STARTUP_GRACE_SEC + 4),
            -1
        );
    }

    #[test]
    fn countdown_published_for_display() {
        let mut duty = DutyCycle::new(mem_with(seasoned_record()), MockSleep::default());
        duty.begin(&opts(), 16.0, 0);
        assert_eq!(duty.seconds_to_deep_sleep(&opts(), 10.0, 4), 6);
        assert_eq!(duty.seconds_to_deep_sleep(&opts(), 10.0, 12), -2);
        assert_eq!(duty.seconds_to_deep_sleep(&opts(), 16.0, 4), -1);
        let mut disabled = opts();
        disabled.is_deep_sleep_enabled = false;
        assert_eq!(duty.seconds_to_deep_sleep(&disabled, 10.0, 4), -1);
    }

    #[test]
    fn sleep_books_time_and_persists() {
        let mut duty = DutyCycle::new(mem_with(seasoned_record()), MockSleep::default());
        duty.begin(&opts(), 16.0, 0);
        let before = *duty.rtc();

        duty.sleep(false, &opts(), true, 11);

        let rtc = duty.rtc();
        assert_eq!(rtc.active_time_sec, before.active_time_sec + 11);
        assert_eq!(rtc.power_on_time_sec, before.power_on_time_sec + 11);
        assert_eq!(
            rtc.deep_sleep_time_sec,
            before.deep_sleep_time_sec + opts().power_check_interval_sec
        );
        assert_eq!(rtc.deep_sleep_start_sec, before.lifetime_sec(11));
        // persisted before the directive, one quantum requested
        assert_eq!(duty.mem.writes, 1);
        assert_eq!(duty.sleeper.requests_us, vec![60_000_000]);
        // round-trips from the persisted bytes
        let (back, valid) = RtcData::from_bytes(&duty.mem.mem);
        assert!(valid);
        assert_eq!(back, *rtc);
    }

    #[test]
    fn sleep_budget_continuation() {
        // First transition starts the window...
        let mut duty = DutyCycle::new(mem_with(seasoned_record()), MockSleep::default());
        duty.begin(&opts(), 10.0, 0);
        // voltage was low at boot but the budget from deep_sleep_start_sec=0
        // elapsed long ago, so no continuation sleep happened
        assert!(duty.sleeper.requests_us.is_empty());
        duty.sleep(false, &opts(), false, 11);
        let window_start = duty.rtc().deep_sleep_start_sec;
        let persisted = duty.mem.mem;

        // ...a wake-up inside the window with the voltage still low goes
        // straight back to sleep without restarting the window.
        let mut duty = DutyCycle::new(MockRtcMemory::with(persisted), MockSleep::default());
        duty.begin(&opts(), 10.0, 1);
        assert_eq!(duty.sleeper.requests_us, vec![60_000_000]);
        assert_eq!(duty.rtc().deep_sleep_start_sec, window_start);
    }

    #[test]
    fn sleep_budget_expiry() {
        // Build a record whose window began a full budget ago.
        let mut rtc = seasoned_record();
        rtc.deep_sleep_start_sec = rtc.lifetime_sec(0);
        rtc.deep_sleep_time_sec += 600; // budget worth of accumulated sleep
        let mut duty = DutyCycle::new(mem_with(rtc), MockSleep::default());
        duty.begin(&opts(), 10.0, 0);
        // now - window start >= 600: proceed to active operation
        assert!(duty.sleeper.requests_us.is_empty());
    }

    #[test]
    fn accumulators_never_decrease_across_cycles() {
        let mut persisted = mem_with(seasoned_record()).mem;
        let mut last = RtcData::default();
        for cycle in 0..5 {
            let mut duty = DutyCycle::new(MockRtcMemory::with(persisted), MockSleep::default());
            duty.begin(&opts(), 16.0, 0);
            duty.sleep(false, &opts(), cycle % 2 == 0, 10 + cycle);
            let rtc = *duty.rtc();
            assert!(rtc.active_time_sec >= last.active_time_sec);
            assert!(rtc.power_on_time_sec >= last.power_on_time_sec);
            assert!(rtc.deep_sleep_time_sec >= last.deep_sleep_time_sec);
            last = rtc;
            persisted = duty.mem.mem;
        }
    }
}
