//! Vector field sampling for the phase-plane lesson.

use modela_core::params::RawParams;
use modela_core::vector_field::{evaluate_field, FieldRequest, VectorField};
use wasm_bindgen::prelude::*;

/// Builds the field request the way the page does: missing or unusable inputs
/// fall back to the page defaults.
pub(crate) fn field_from_inputs(
    fx: &str,
    fy: &str,
    xmax: Option<f64>,
    ymax: Option<f64>,
    n: Option<f64>,
) -> VectorField {
    let raw = RawParams::new()
        .with("fx_expr", fx)
        .with("fy_expr", fy)
        .with("xmax", xmax)
        .with("ymax", ymax)
        .with("n", n);
    let request = FieldRequest::from_raw(&raw).value;
    evaluate_field(&request)
}

/// Samples `(fx, fy)` on an `n x n` grid over `[-xmax, xmax] x [-ymax, ymax]`.
///
/// Expression failures are reported in the returned object's `message`
/// rather than thrown.
#[wasm_bindgen]
pub fn vector_field(
    fx: &str,
    fy: &str,
    xmax: Option<f64>,
    ymax: Option<f64>,
    n: Option<f64>,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let field = field_from_inputs(fx, fy, xmax, ymax, n);
    serde_wasm_bindgen::to_value(&field)
        .map_err(|err| JsValue::from_str(&format!("Failed to serialize vector field: {err}")))
}
