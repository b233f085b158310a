// GeoTrack — Deep Sleep Directive
//
// Timer-wake deep sleep via raw ESP-IDF calls. Execution does not continue
// past the directive; the device restarts from `main` when the timer fires.

use crate::hal::SleepControl;

pub struct TimerDeepSleep;

impl SleepControl for TimerDeepSleep {
    fn deep_sleep(&mut self, duration_us: u64) {
        log::info!("deep sleep directive: {} us", duration_us);
        unsafe {
            esp_idf_sys::esp_sleep_enable_timer_wakeup(duration_us);
            esp_idf_sys::esp_deep_sleep_start();
        }
    }
}
