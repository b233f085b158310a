// GeoTrack — Hardware Seams
//
// Narrow traits over the pieces of hardware the core logic touches. The
// ESP-IDF implementations live in `drivers/`; tests substitute the in-memory
// mocks below. Handlers receive these capabilities explicitly at
// construction time — there is no process-wide singleton to route through.

use std::time::Duration;

use crate::config::RTC_RECORD_SIZE;

/// Fixed-size memory region that survives deep sleep but not power loss.
pub trait RtcMemory {
    fn read(&mut self, buf: &mut [u8; RTC_RECORD_SIZE]);
    fn write(&mut self, buf: &[u8; RTC_RECORD_SIZE]);
}

/// Supply voltage sensing.
pub trait PowerSupply {
    /// Sample the supply voltage, in volts.
    fn read_voltage(&mut self) -> anyhow::Result<f32>;
}

/// The hardware deep-sleep directive.
pub trait SleepControl {
    /// Power down for `duration_us` microseconds. On real hardware execution
    /// does not continue past this call — the device restarts from boot when
    /// the wake timer fires. Mock implementations return so the transition
    /// can be observed in tests.
    fn deep_sleep(&mut self, duration_us: u64);
}

/// Bounded busy-wait: poll `cond` up to `max_iters` times, pausing `pause`
/// between polls and invoking `tick` each iteration so background duties
/// (watchdog feed) keep running. Returns whether `cond` became true.
///
/// There is no scheduler on this device; every blocking wait must be bounded
/// and must keep yielding like this.
pub fn wait_until(
    mut cond: impl FnMut() -> bool,
    mut tick: impl FnMut(),
    max_iters: u32,
    pause: Duration,
) -> bool {
    for _ in 0..max_iters {
        if cond() {
            return true;
        }
        tick();
        if !pause.is_zero() {
            std::thread::sleep(pause);
        }
    }
    cond()
}

#[cfg(test)]
pub mod mock {
    use super::*;

    /// RTC region backed by a plain array, starting out as garbage the way
    /// freshly powered RTC memory does.
    pub struct MockRtcMemory {
        pub mem: [u8; RTC_RECORD_SIZE],
        pub writes: usize,
    }

    impl MockRtcMemory {
        pub fn garbage() -> Self {
            Self {
                mem: [0xA5; RTC_RECORD_SIZE],
                writes: 0,
            }
        }

        pub fn with(mem: [u8; RTC_RECORD_SIZE]) -> Self {
            Self { mem, writes: 0 }
        }
    }

    impl RtcMemory for MockRtcMemory {
        fn read(&mut self, buf: &mut [u8; RTC_RECORD_SIZE]) {
            *buf = self.mem;
        }
        fn write(&mut self, buf: &[u8; RTC_RECORD_SIZE]) {
            self.mem = *buf;
            self.writes += 1;
        }
    }

    /// Records every sleep request instead of powering down.
    #[derive(Default)]
    pub struct MockSleep {
        pub requests_us: Vec<u64>,
    }

    impl SleepControl for MockSleep {
        fn deep_sleep(&mut self, duration_us: u64) {
            self.requests_us.push(duration_us);
        }
    }

    /// Scripted voltage source.
    pub struct MockSupply(pub f32);

    impl PowerSupply for MockSupply {
        fn read_voltage(&mut self) -> anyhow::Result<f32> {
            Ok(self.0)
        }
    }

    /// Supply whose sensor always fails.
    pub struct BrokenSupply;

    impl PowerSupply for BrokenSupply {
        fn read_voltage(&mut self) -> anyhow::Result<f32> {
            anyhow::bail!("adc read failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_ticks_until_condition() {
        let mut ticks = 0;
        let mut n = 0;
        let ok = wait_until(
            || {
                n += 1;
                n > 3
            },
            || ticks += 1,
            10,
            Duration::ZERO,
        );
        assert!(ok);
        assert_eq!(ticks, 3);
    }

    #[test]
    fn wait_until_gives_up_after_budget() {
        let mut ticks = 0;
        let ok = wait_until(|| false, || ticks += 1, 5, Duration::ZERO);
        assert!(!ok);
        assert_eq!(ticks, 5);
    }
}
