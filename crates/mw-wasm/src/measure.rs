//! Label measurement through a host callback, typically wrapping
//! `SVGTextElement.getComputedTextLength()`.

use mw_core::TextMeasurer;
use wasm_bindgen::JsValue;

pub(crate) struct JsMeasurer {
    measure: js_sys::Function,
}

impl JsMeasurer {
    pub(crate) fn new(measure: js_sys::Function) -> Self {
        Self { measure }
    }
}

impl TextMeasurer for JsMeasurer {
    /// A throw or a non-number result reads as unavailable (0).
    fn measure(&self, text: &str) -> f64 {
        match self.measure.call1(&JsValue::NULL, &JsValue::from_str(text)) {
            Ok(value) => value.as_f64().unwrap_or(0.0),
            Err(e) => {
                log::debug!("text measurer threw: {e:?}");
                0.0
            }
        }
    }
}
