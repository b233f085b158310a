// GeoTrack — ESP-IDF Hardware Bindings

pub mod bme280;
pub mod mqtt;
pub mod power;
pub mod rtcmem;
pub mod sleep;
pub mod spiffs;
