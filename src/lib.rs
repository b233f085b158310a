// GeoTrack — GPS/GSM Battery Tracker Firmware
//
// Core logic (duty cycle, persisted clock, power monitor, telemetry,
// orchestration) is hardware-independent and unit-tested on the host; all
// ESP-IDF specifics live in `drivers/` and the binary entry point.

pub mod config;
pub mod data;
pub mod hal;
pub mod options;
pub mod orchestrator;
pub mod power;
pub mod rtc;
pub mod sleep;
pub mod subsystems;
pub mod telemetry;

#[cfg(target_os = "espidf")]
pub mod drivers;
