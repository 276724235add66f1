//! Model simulations for the lesson pages.

use modela_core::models::ModelKind;
use modela_core::params::RawParams;
use modela_core::simulator::{simulate_raw, Scheme, SimulationOutcome, SimulationSettings};
use wasm_bindgen::prelude::*;

/// Parses the model key and runs the lesson. `Ok(None)` means the lesson
/// refused to recompute and the caller should keep its previous output.
pub(crate) fn run_lesson(
    kind: &str,
    raw: &RawParams,
    settings: &SimulationSettings,
) -> Result<Option<SimulationOutcome>, String> {
    let kind: ModelKind = kind.parse().map_err(|err| format!("{err}"))?;
    match simulate_raw(kind, raw, settings) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(insufficient) => {
            log::debug!("{kind}: {insufficient}");
            Ok(None)
        }
    }
}

pub(crate) fn parse_scheme(name: &str) -> Result<Scheme, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "euler" => Ok(Scheme::Euler),
        "rk4" => Ok(Scheme::Rk4),
        "tsit5" => Ok(Scheme::Tsit5),
        other => Err(format!("Unknown scheme '{other}'")),
    }
}

fn to_js(outcome: Option<SimulationOutcome>) -> Result<JsValue, JsValue> {
    match outcome {
        Some(outcome) => serde_wasm_bindgen::to_value(&outcome)
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize outcome: {err}"))),
        None => Ok(JsValue::UNDEFINED),
    }
}

fn from_js(params: JsValue) -> Result<RawParams, JsValue> {
    if params.is_undefined() || params.is_null() {
        return Ok(RawParams::new());
    }
    serde_wasm_bindgen::from_value(params)
        .map_err(|err| JsValue::from_str(&format!("Invalid parameters: {err}")))
}

/// Runs one lesson with the default settings.
///
/// Returns the serialized outcome, or `undefined` when the rate-ratio rumor
/// lesson is missing input.
#[wasm_bindgen]
pub fn simulate(kind: &str, params: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let raw = from_js(params)?;
    let outcome =
        run_lesson(kind, &raw, &SimulationSettings::default()).map_err(|e| JsValue::from_str(&e))?;
    to_js(outcome)
}

/// A lesson runner with a chosen fixed-step scheme for SIR and SEIR.
#[wasm_bindgen]
pub struct WasmLesson {
    settings: SimulationSettings,
}

#[wasm_bindgen]
impl WasmLesson {
    #[wasm_bindgen(constructor)]
    pub fn new(scheme: &str) -> Result<WasmLesson, JsValue> {
        console_error_panic_hook::set_once();
        let scheme = parse_scheme(scheme).map_err(|e| JsValue::from_str(&e))?;
        Ok(WasmLesson {
            settings: SimulationSettings {
                scheme,
                ..SimulationSettings::default()
            },
        })
    }

    pub fn set_tolerances(&mut self, rtol: f64, atol: f64) {
        self.settings.adaptive.rtol = rtol;
        self.settings.adaptive.atol = atol;
    }

    pub fn simulate(&self, kind: &str, params: JsValue) -> Result<JsValue, JsValue> {
        let raw = from_js(params)?;
        let outcome = run_lesson(kind, &raw, &self.settings).map_err(|e| JsValue::from_str(&e))?;
        to_js(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawParams {
        serde_json::from_str(json).expect("valid params")
    }

    #[test]
    fn runs_every_lesson_with_empty_input_except_rate_ratio() {
        let settings = SimulationSettings::default();
        for kind in ModelKind::ALL {
            let outcome =
                run_lesson(kind.key(), &RawParams::new(), &settings).expect("known model");
            if kind == ModelKind::RumorRateRatio {
                assert!(outcome.is_none());
            } else {
                let outcome = outcome.expect("lesson recomputes");
                assert_eq!(outcome.result.model, kind);
                assert!(!outcome.interpretation.is_empty());
            }
        }
    }

    #[test]
    fn unknown_model_is_an_error_string() {
        let err = run_lesson("sirs", &RawParams::new(), &SimulationSettings::default())
            .expect_err("unknown model");
        assert!(err.contains("unknown model 'sirs'"), "{err}");
    }

    #[test]
    fn text_inputs_from_the_page_are_accepted() {
        let outcome = run_lesson(
            "SIR",
            &raw(r#"{"N": "1000", "beta": "0.3", "gamma": 0.1, "I0": 1, "t_max": "100"}"#),
            &SimulationSettings::default(),
        )
        .expect("known model")
        .expect("recomputes");
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.result.times.len(), 100);
        assert!(outcome.interpretation.contains("R₀ ≈ 3.00"));
    }

    #[test]
    fn outcome_serializes_for_the_front_end() {
        let outcome = run_lesson("exponential", &RawParams::new(), &SimulationSettings::default())
            .expect("known model")
            .expect("recomputes");
        let json = serde_json::to_value(&outcome).expect("serializes");
        assert_eq!(json["result"]["model"], "exponential");
        assert_eq!(json["parameters"]["model"], "exponential");
        assert_eq!(json["warnings"][0]["reason"], "missing");
        assert_eq!(json["result"]["times"].as_array().map(Vec::len), Some(15));
    }

    #[test]
    fn schemes_parse() {
        assert_eq!(parse_scheme(""), Ok(Scheme::Euler));
        assert_eq!(parse_scheme("RK4"), Ok(Scheme::Rk4));
        assert_eq!(parse_scheme("tsit5"), Ok(Scheme::Tsit5));
        assert!(parse_scheme("midpoint").is_err());
    }
}
