// GeoTrack — SPIFFS Mount
//
// Registers the SPIFFS partition at /spiffs so the options file is reachable
// through std::fs.

use std::ffi::CString;

use anyhow::bail;

pub fn mount(base_path: &str) -> anyhow::Result<()> {
    // Leaked on purpose: ESP-IDF keeps referring to the path for the
    // lifetime of the VFS registration, which is forever here.
    let base = CString::new(base_path)?.into_raw();
    let conf = esp_idf_sys::esp_vfs_spiffs_conf_t {
        base_path: base,
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    let ret = unsafe { esp_idf_sys::esp_vfs_spiffs_register(&conf) };
    if ret != esp_idf_sys::ESP_OK {
        bail!("SPIFFS mount failed ({ret})");
    }
    log::info!("SPIFFS mounted at {base_path}");
    Ok(())
}
