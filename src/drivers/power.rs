// GeoTrack — Supply Voltage Sensing
//
// One-shot ADC read of the supply rail through the resistor divider, via raw
// ESP-IDF calls. GPIO2 / ADC1_CHANNEL_2 with 11 dB attenuation.

use anyhow::bail;

use crate::config::SUPPLY_ADC_FACTOR;
use crate::hal::PowerSupply;

pub struct SupplyVoltage {
    handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    channel: esp_idf_sys::adc_channel_t,
}

impl SupplyVoltage {
    pub fn new() -> anyhow::Result<Self> {
        unsafe {
            let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            let ret = esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle);
            if ret != esp_idf_sys::ESP_OK {
                bail!("ADC unit init failed ({ret})");
            }

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            let channel = esp_idf_sys::adc_channel_t_ADC_CHANNEL_2; // GPIO2
            let ret = esp_idf_sys::adc_oneshot_config_channel(handle, channel, &chan_cfg);
            if ret != esp_idf_sys::ESP_OK {
                bail!("ADC channel config failed ({ret})");
            }

            Ok(Self { handle, channel })
        }
    }
}

impl PowerSupply for SupplyVoltage {
    fn read_voltage(&mut self) -> anyhow::Result<f32> {
        let mut raw: i32 = 0;
        let ret = unsafe { esp_idf_sys::adc_oneshot_read(self.handle, self.channel, &mut raw) };
        if ret != esp_idf_sys::ESP_OK {
            bail!("ADC read failed ({ret})");
        }
        Ok(raw as f32 * SUPPLY_ADC_FACTOR)
    }
}
