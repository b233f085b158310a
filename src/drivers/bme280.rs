// GeoTrack — BME280 Environment Sensor Driver
//
// Register-level driver over the shared I2C bus. Compensation uses the
// floating-point formulas from the Bosch datasheet.

use std::sync::Mutex;

use esp_idf_hal::i2c::I2cDriver;

use crate::config::*;
use crate::data::EnvReading;
use crate::subsystems::EnvSensor;

/// Handle to the shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

// BME280 register addresses
const REG_ID: u8 = 0xD0;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_CALIB_00: u8 = 0x88; // dig_T1..dig_P9, 24 bytes
const REG_CALIB_H1: u8 = 0xA1;
const REG_CALIB_26: u8 = 0xE1; // dig_H2..dig_H6, 7 bytes
const REG_DATA: u8 = 0xF7; // 8-byte pressure/temperature/humidity burst
const ID_EXPECTED: u8 = 0x60;

#[derive(Default)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

pub struct Bme280 {
    bus: SharedBus,
    calib: Calibration,
}

impl Bme280 {
    pub fn new(bus: SharedBus) -> Self {
        Self {
            bus,
            calib: Calibration::default(),
        }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let mut bus = self.bus.lock().unwrap();
        let mut buf = [0u8; 1];
        match bus.write_read(I2C_ADDR_BME280, &[REG_ID], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == ID_EXPECTED,
            Err(_) => false,
        }
    }

    /// Read the factory calibration and configure x1 oversampling, normal
    /// mode, 1000 ms standby.
    pub fn init(&mut self) -> anyhow::Result<()> {
        let mut bus = self.bus.lock().unwrap();

        let mut c0 = [0u8; 24];
        bus.write_read(I2C_ADDR_BME280, &[REG_CALIB_00], &mut c0, I2C_TIMEOUT_TICKS)?;
        let mut h1 = [0u8; 1];
        bus.write_read(I2C_ADDR_BME280, &[REG_CALIB_H1], &mut h1, I2C_TIMEOUT_TICKS)?;
        let mut c26 = [0u8; 7];
        bus.write_read(I2C_ADDR_BME280, &[REG_CALIB_26], &mut c26, I2C_TIMEOUT_TICKS)?;

        let u16le = |l: u8, h: u8| u16::from_le_bytes([l, h]);
        self.calib = Calibration {
            t1: u16le(c0[0], c0[1]),
            t2: u16le(c0[2], c0[3]) as i16,
            t3: u16le(c0[4], c0[5]) as i16,
            p1: u16le(c0[6], c0[7]),
            p2: u16le(c0[8], c0[9]) as i16,
            p3: u16le(c0[10], c0[11]) as i16,
            p4: u16le(c0[12], c0[13]) as i16,
            p5: u16le(c0[14], c0[15]) as i16,
            p6: u16le(c0[16], c0[17]) as i16,
            p7: u16le(c0[18], c0[19]) as i16,
            p8: u16le(c0[20], c0[21]) as i16,
            p9: u16le(c0[22], c0[23]) as i16,
            h1: h1[0],
            h2: u16le(c26[0], c26[1]) as i16,
            h3: c26[2],
            // H4/H5 are signed 12-bit values sharing register 0xE5
            h4: ((c26[3] as i8 as i16) << 4) | (c26[4] & 0x0F) as i16,
            h5: ((c26[5] as i8 as i16) << 4) | ((c26[4] >> 4) & 0x0F) as i16,
            h6: c26[6] as i8,
        };

        // humidity x1; temperature x1, pressure x1, normal mode; standby 1 s
        bus.write(I2C_ADDR_BME280, &[REG_CTRL_HUM, 0x01], I2C_TIMEOUT_TICKS)?;
        bus.write(I2C_ADDR_BME280, &[REG_CTRL_MEAS, 0x27], I2C_TIMEOUT_TICKS)?;
        bus.write(I2C_ADDR_BME280, &[REG_CONFIG, 0xA0], I2C_TIMEOUT_TICKS)?;

        log::info!("BME280 initialised (x1 oversampling, normal mode)");
        Ok(())
    }

    fn read_raw(&self) -> anyhow::Result<(i32, i32, i32)> {
        let mut bus = self.bus.lock().unwrap();
        let mut d = [0u8; 8];
        bus.write_read(I2C_ADDR_BME280, &[REG_DATA], &mut d, I2C_TIMEOUT_TICKS)?;
        let press = ((d[0] as i32) << 12) | ((d[1] as i32) << 4) | ((d[2] as i32) >> 4);
        let temp = ((d[3] as i32) << 12) | ((d[4] as i32) << 4) | ((d[5] as i32) >> 4);
        let hum = ((d[6] as i32) << 8) | d[7] as i32;
        Ok((temp, press, hum))
    }
}

impl EnvSensor for Bme280 {
    fn read(&mut self) -> anyhow::Result<EnvReading> {
        let (adc_t, adc_p, adc_h) = self.read_raw()?;
        let c = &self.calib;

        // Temperature, also yields t_fine for the other two channels.
        let var1 = (adc_t as f64 / 16384.0 - c.t1 as f64 / 1024.0) * c.t2 as f64;
        let var2 = (adc_t as f64 / 131072.0 - c.t1 as f64 / 8192.0).powi(2) * c.t3 as f64;
        let t_fine = var1 + var2;
        let temperature = t_fine / 5120.0;

        // Pressure
        let var1 = t_fine / 2.0 - 64000.0;
        let var2 = var1 * var1 * c.p6 as f64 / 32768.0;
        let var2 = var2 + var1 * c.p5 as f64 * 2.0;
        let var2 = var2 / 4.0 + c.p4 as f64 * 65536.0;
        let var1 = (c.p3 as f64 * var1 * var1 / 524288.0 + c.p2 as f64 * var1) / 524288.0;
        let var1 = (1.0 + var1 / 32768.0) * c.p1 as f64;
        let pressure = if var1 == 0.0 {
            0.0
        } else {
            let p = 1048576.0 - adc_p as f64;
            let p = (p - var2 / 4096.0) * 6250.0 / var1;
            let var1 = c.p9 as f64 * p * p / 2147483648.0;
            let var2 = p * c.p8 as f64 / 32768.0;
            p + (var1 + var2 + c.p7 as f64) / 16.0
        };

        // Humidity
        let var_h = t_fine - 76800.0;
        let var_h = (adc_h as f64 - (c.h4 as f64 * 64.0 + c.h5 as f64 / 16384.0 * var_h))
            * (c.h2 as f64 / 65536.0
                * (1.0
                    + c.h6 as f64 / 67108864.0
                        * var_h
                        * (1.0 + c.h3 as f64 / 67108864.0 * var_h)));
        let humidity = (var_h * (1.0 - c.h1 as f64 * var_h / 524288.0)).clamp(0.0, 100.0);

        Ok(EnvReading {
            temperature_c: temperature as f32,
            humidity_pct: humidity as f32,
            pressure_hpa: (pressure / 100.0) as f32,
        })
    }
}
