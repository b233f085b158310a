// GeoTrack — Hardware & System Configuration
// Target: ESP32-C3 module with SIM808-class GPS/GSM modem and BME280

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6; // BME280 data line
pub const PIN_I2C_SCL: i32 = 7; // BME280 clock line
pub const PIN_SUPPLY_ADC: u32 = 2; // Supply voltage sense (ADC, behind divider)

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_BME280: u8 = 0x76;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Supply voltage sensing
// ---------------------------------------------------------------------------
// The supply (a 12 V lead-acid pack in the reference installation) is
// measured through a resistor divider; volts per raw ADC count.
pub const SUPPLY_ADC_FACTOR: f32 = 0.005;

// ---------------------------------------------------------------------------
// Power consumption calibration (milliamps per regime)
// ---------------------------------------------------------------------------
pub const DRAW_ACTIVE_MA: f64 = 70.0; // CPU awake, radio off
pub const DRAW_POWER_ON_MA: f64 = 140.0; // CPU awake, radio rail energized
pub const DRAW_DEEP_SLEEP_MA: f64 = 0.407; // Deep sleep

// ---------------------------------------------------------------------------
// Duty cycle
// ---------------------------------------------------------------------------
// A freshly powered device (zeroed persisted clock) stays awake at least this
// long so it can be configured over the web UI before it may sleep.
pub const STARTUP_GRACE_SEC: u32 = 300;

// ---------------------------------------------------------------------------
// Persisted clock record (RTC memory layout)
// ---------------------------------------------------------------------------
// 10 data fields + CRC, 4 bytes each, little-endian. The layout is
// byte-stable within a firmware version; changing it invalidates old
// checksums and resets the accumulators (accepted, no migration).
pub const RTC_RECORD_FIELDS: usize = 11;
pub const RTC_RECORD_SIZE: usize = RTC_RECORD_FIELDS * 4; // 44 bytes

// ---------------------------------------------------------------------------
// Options storage
// ---------------------------------------------------------------------------
pub const OPTIONS_FILE: &str = "/spiffs/options.txt";

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------
pub const LOOP_PAUSE_MS: u64 = 100; // Round-robin iteration pause
