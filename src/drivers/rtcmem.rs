// GeoTrack — RTC Slow Memory Region
//
// Backing store for the persisted clock: a static buffer placed in RTC slow
// memory, which keeps its contents through deep sleep (the wake timer runs
// from the same domain) but comes up as garbage after a cold power-up —
// which is exactly why the record carries a checksum.

use crate::config::RTC_RECORD_SIZE;
use crate::hal::RtcMemory;

#[link_section = ".rtc.data"]
static mut RTC_REGION: [u8; RTC_RECORD_SIZE] = [0; RTC_RECORD_SIZE];

pub struct RtcSlowMemory;

impl RtcMemory for RtcSlowMemory {
    fn read(&mut self, buf: &mut [u8; RTC_RECORD_SIZE]) {
        // SAFETY: the firmware is single-threaded and this is the only
        // accessor of RTC_REGION.
        unsafe { buf.copy_from_slice(&*core::ptr::addr_of!(RTC_REGION)) }
    }

    fn write(&mut self, buf: &[u8; RTC_RECORD_SIZE]) {
        // SAFETY: see read().
        unsafe { (*core::ptr::addr_of_mut!(RTC_REGION)).copy_from_slice(buf) }
    }
}
