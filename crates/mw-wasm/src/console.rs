//! `log` backend that writes to the browser console.

use log::{Level, LevelFilter, Metadata, Record};

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        #[cfg(target_arch = "wasm32")]
        {
            let msg = wasm_bindgen::JsValue::from_str(&msg);
            match record.level() {
                Level::Error => web_sys::console::error_1(&msg),
                Level::Warn => web_sys::console::warn_1(&msg),
                Level::Info => web_sys::console::info_1(&msg),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&msg),
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        if record.level() <= Level::Warn {
            eprintln!("{msg}");
        }
    }

    fn flush(&self) {}
}

/// Install the console logger once. Later calls only change the level.
pub(crate) fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

pub(crate) fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub(crate) fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("mindweave panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
