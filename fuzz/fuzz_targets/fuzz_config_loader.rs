#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = remf_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = remf_core::conversions::steps_from_config(&cfg);
            let _ = remf_core::CoreCfg::from(&cfg);
        }
    }
});
