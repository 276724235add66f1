//! Raw lesson inputs and the two ways of turning them into model parameters.
//!
//! `coerce` reproduces the lessons' forgiving behaviour: anything missing or
//! unparseable is replaced by a documented default and the computation goes on.
//! `validate` is the strict counterpart that reports the first problem instead.
//! The rate-ratio rumor model is the exception to the forgiving path: it
//! refuses to run unless all of its fields are present.

use crate::error::{InsufficientInput, ValidationError};
use crate::models::{InitialState, ModelKind, ModelSpec, SimulationRequest, MAX_POINTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest population used in place of a non-positive one.
pub const MIN_POPULATION: f64 = 1e-6;

/// Fixed display window of the logistic lesson.
pub const LOGISTIC_WINDOW: (f64, f64) = (-15.0, 15.0);

/// A single value as it arrives from an input widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl RawValue {
    /// Numeric reading of the value, if there is a finite one.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
            RawValue::Bool(_) | RawValue::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    fn describe(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Text(text) => text.clone(),
            RawValue::Null => "null".into(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawValue::Null, RawValue::Number)
    }
}

/// Field name to raw value, as pulled from the lesson's inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawParams(BTreeMap<String, RawValue>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<RawValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(RawValue::as_number)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(RawValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Present and not null. Unparseable text still counts as present.
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CoercionReason {
    Missing,
    Unparseable { text: String },
    /// A zero where the lesson treats zero as "not filled in".
    Zero,
    OutOfRange { value: f64 },
}

/// A parameter was replaced and the computation went on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercionWarning {
    pub field: String,
    #[serde(flatten)]
    pub reason: CoercionReason,
    pub substituted: f64,
}

/// A value produced by the forgiving path, with what had to be substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub warnings: Vec<CoercionWarning>,
}

/// What to do with an in-range-but-degenerate value after parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    /// Any finite number.
    Any,
    /// Negative values fall back to the default (rate constants, N, K).
    NonNegative,
    /// Non-positive values fall back to the default.
    Positive,
    /// Non-positive values become `MIN_POPULATION`.
    Population,
    /// Non-positive horizons become 1.
    Horizon,
    /// Negative compartments are clamped to 0.
    Compartment,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    default: f64,
    zero_is_missing: bool,
    bound: Bound,
}

const fn rule(name: &'static str, default: f64, zero_is_missing: bool, bound: Bound) -> FieldRule {
    FieldRule {
        name,
        default,
        zero_is_missing,
        bound,
    }
}

const EXPONENTIAL_FIELDS: &[FieldRule] = &[
    rule("P0", 1.0, false, Bound::Population),
    rule("r", 0.1, false, Bound::Any),
    rule("t_max", 10.0, false, Bound::Horizon),
];

const LOGISTIC_FIELDS: &[FieldRule] = &[
    rule("P0", 900_000.0, false, Bound::Population),
    rule("r", 0.2311, false, Bound::NonNegative),
    rule("K", 1_072_764.0, false, Bound::Positive),
];

const SIR_FIELDS: &[FieldRule] = &[
    rule("N", 1000.0, true, Bound::Positive),
    rule("beta", 0.3, true, Bound::NonNegative),
    rule("gamma", 0.1, true, Bound::NonNegative),
    rule("I0", 1.0, false, Bound::Compartment),
    rule("t_max", 100.0, true, Bound::Horizon),
];

const SEIR_FIELDS: &[FieldRule] = &[
    rule("N", 1000.0, true, Bound::Positive),
    rule("beta", 0.3, true, Bound::NonNegative),
    rule("sigma", 0.2, true, Bound::NonNegative),
    rule("gamma", 0.1, true, Bound::NonNegative),
    rule("E0", 0.0, false, Bound::Compartment),
    rule("I0", 1.0, false, Bound::Compartment),
    rule("t_max", 160.0, true, Bound::Horizon),
];

const RUMOR_FIELDS: &[FieldRule] = &[
    rule("N", 275.0, true, Bound::Positive),
    rule("b", 0.004, true, Bound::NonNegative),
    rule("k", 0.01, true, Bound::NonNegative),
    rule("S0", 266.0, false, Bound::Compartment),
    rule("I0", 1.0, false, Bound::Compartment),
    rule("R0", 8.0, false, Bound::Compartment),
    rule("t_max", 15.0, true, Bound::Horizon),
];

// Defaults here are never used: a missing field stops the computation.
const RUMOR_RATIO_FIELDS: &[FieldRule] = &[
    rule("S0", 0.0, false, Bound::Compartment),
    rule("I0", 0.0, false, Bound::Compartment),
    rule("R0", 0.0, false, Bound::Compartment),
    rule("beta", 0.0, false, Bound::NonNegative),
    rule("gamma", 0.0, false, Bound::NonNegative),
    rule("t_max", 1.0, false, Bound::Horizon),
];

fn fields_for(kind: ModelKind) -> &'static [FieldRule] {
    match kind {
        ModelKind::Exponential => EXPONENTIAL_FIELDS,
        ModelKind::Logistic => LOGISTIC_FIELDS,
        ModelKind::Sir => SIR_FIELDS,
        ModelKind::Seir => SEIR_FIELDS,
        ModelKind::RumorMassAction => RUMOR_FIELDS,
        ModelKind::RumorRateRatio => RUMOR_RATIO_FIELDS,
    }
}

/// Field names a lesson reads, in order.
pub fn field_names(kind: ModelKind) -> Vec<&'static str> {
    fields_for(kind).iter().map(|f| f.name).collect()
}

/// Typed parameters of one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelParameters {
    Exponential {
        p0: f64,
        r: f64,
        t_max: f64,
    },
    Logistic {
        p0: f64,
        r: f64,
        k: f64,
    },
    Sir {
        n: f64,
        beta: f64,
        gamma: f64,
        i0: f64,
        t_max: f64,
    },
    Seir {
        n: f64,
        beta: f64,
        sigma: f64,
        gamma: f64,
        e0: f64,
        i0: f64,
        t_max: f64,
    },
    #[serde(rename = "rumor")]
    RumorMassAction {
        n: f64,
        b: f64,
        k: f64,
        s0: f64,
        i0: f64,
        r0: f64,
        t_max: f64,
    },
    #[serde(rename = "rumor_ratio")]
    RumorRateRatio {
        s0: f64,
        i0: f64,
        r0: f64,
        beta: f64,
        gamma: f64,
        t_max: f64,
    },
}

/// Output grid resolution of each lesson.
pub const EXPONENTIAL_POINTS: usize = 15;
pub const LOGISTIC_POINTS: usize = 12;
pub const RUMOR_POINTS: usize = 500;
pub const RUMOR_RATIO_POINTS: usize = 300;

impl ModelParameters {
    fn from_values(kind: ModelKind, v: &[f64]) -> Self {
        match kind {
            ModelKind::Exponential => ModelParameters::Exponential {
                p0: v[0],
                r: v[1],
                t_max: v[2],
            },
            ModelKind::Logistic => ModelParameters::Logistic {
                p0: v[0],
                r: v[1],
                k: v[2],
            },
            ModelKind::Sir => ModelParameters::Sir {
                n: v[0],
                beta: v[1],
                gamma: v[2],
                i0: v[3],
                t_max: v[4],
            },
            ModelKind::Seir => ModelParameters::Seir {
                n: v[0],
                beta: v[1],
                sigma: v[2],
                gamma: v[3],
                e0: v[4],
                i0: v[5],
                t_max: v[6],
            },
            ModelKind::RumorMassAction => ModelParameters::RumorMassAction {
                n: v[0],
                b: v[1],
                k: v[2],
                s0: v[3],
                i0: v[4],
                r0: v[5],
                t_max: v[6],
            },
            ModelKind::RumorRateRatio => ModelParameters::RumorRateRatio {
                s0: v[0],
                i0: v[1],
                r0: v[2],
                beta: v[3],
                gamma: v[4],
                t_max: v[5],
            },
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParameters::Exponential { .. } => ModelKind::Exponential,
            ModelParameters::Logistic { .. } => ModelKind::Logistic,
            ModelParameters::Sir { .. } => ModelKind::Sir,
            ModelParameters::Seir { .. } => ModelKind::Seir,
            ModelParameters::RumorMassAction { .. } => ModelKind::RumorMassAction,
            ModelParameters::RumorRateRatio { .. } => ModelKind::RumorRateRatio,
        }
    }

    /// The lesson's simulation request for these parameters.
    ///
    /// Parameters coming out of `coerce` or `validate` always satisfy the
    /// request invariants, so the request is assembled directly.
    pub fn request(&self) -> SimulationRequest {
        let grid = |t_max: f64| epidemic_points(t_max).min(MAX_POINTS);
        let (model, initial, t_start, t_max, num_points) = match *self {
            ModelParameters::Exponential { p0, r, t_max } => (
                ModelSpec::Exponential { r },
                InitialState::Scalar(p0),
                0.0,
                t_max,
                EXPONENTIAL_POINTS,
            ),
            ModelParameters::Logistic { p0, r, k } => (
                ModelSpec::Logistic { r, k },
                InitialState::Scalar(p0),
                LOGISTIC_WINDOW.0,
                LOGISTIC_WINDOW.1,
                LOGISTIC_POINTS,
            ),
            ModelParameters::Sir {
                n,
                beta,
                gamma,
                i0,
                t_max,
            } => (
                ModelSpec::Sir { beta, gamma },
                InitialState::Compartments(vec![(n - i0).max(0.0), i0, 0.0]),
                0.0,
                t_max,
                grid(t_max),
            ),
            ModelParameters::Seir {
                n,
                beta,
                sigma,
                gamma,
                e0,
                i0,
                t_max,
            } => (
                ModelSpec::Seir { beta, sigma, gamma },
                InitialState::Compartments(vec![(n - e0 - i0).max(0.0), e0, i0, 0.0]),
                0.0,
                t_max,
                grid(t_max),
            ),
            ModelParameters::RumorMassAction {
                b,
                k,
                s0,
                i0,
                r0,
                t_max,
                ..
            } => (
                ModelSpec::RumorMassAction { b, k },
                InitialState::Compartments(vec![s0, i0, r0]),
                0.0,
                t_max,
                RUMOR_POINTS,
            ),
            ModelParameters::RumorRateRatio {
                s0,
                i0,
                r0,
                beta,
                gamma,
                t_max,
            } => (
                ModelSpec::RumorRateRatio { beta, gamma },
                InitialState::Compartments(vec![s0, i0, r0]),
                0.0,
                t_max,
                RUMOR_RATIO_POINTS,
            ),
        };
        SimulationRequest {
            model,
            initial,
            t_start,
            t_max,
            num_points,
        }
    }
}

/// One sample per whole day of the horizon, at least two.
fn epidemic_points(t_max: f64) -> usize {
    (t_max as usize).max(2)
}

fn coerce_field(
    rule: &FieldRule,
    raw: Option<&RawValue>,
    warnings: &mut Vec<CoercionWarning>,
) -> f64 {
    let mut warn = |reason: CoercionReason, substituted: f64| {
        log::debug!(
            "coercing field {} ({:?}) to {}",
            rule.name,
            reason,
            substituted
        );
        warnings.push(CoercionWarning {
            field: rule.name.to_string(),
            reason,
            substituted,
        });
        substituted
    };

    let parsed = match raw {
        None | Some(RawValue::Null) => return warn(CoercionReason::Missing, rule.default),
        Some(value) => match value.as_number() {
            Some(number) => number,
            None => {
                return warn(
                    CoercionReason::Unparseable {
                        text: value.describe(),
                    },
                    rule.default,
                )
            }
        },
    };

    if rule.zero_is_missing && parsed == 0.0 {
        return warn(CoercionReason::Zero, rule.default);
    }

    let out_of_range = CoercionReason::OutOfRange { value: parsed };
    match rule.bound {
        Bound::Any => parsed,
        Bound::NonNegative if parsed < 0.0 => warn(out_of_range, rule.default),
        Bound::Positive if parsed <= 0.0 => warn(out_of_range, rule.default),
        Bound::Population if parsed <= 0.0 => warn(out_of_range, MIN_POPULATION),
        Bound::Horizon if parsed <= 0.0 => warn(out_of_range, 1.0),
        Bound::Compartment if parsed < 0.0 => warn(out_of_range, 0.0),
        _ => parsed,
    }
}

/// Forgiving conversion: substitutes defaults and never fails, except for the
/// rate-ratio rumor lesson, which needs every field.
pub fn coerce(
    kind: ModelKind,
    raw: &RawParams,
) -> Result<Coerced<ModelParameters>, InsufficientInput> {
    let rules = fields_for(kind);

    if kind == ModelKind::RumorRateRatio {
        let missing: Vec<String> = rules
            .iter()
            .filter(|rule| raw.number(rule.name).is_none())
            .map(|rule| rule.name.to_string())
            .collect();
        if !missing.is_empty() {
            log::debug!("{kind}: not recomputing, missing {missing:?}");
            return Err(InsufficientInput { missing });
        }
    }

    let mut warnings = Vec::new();
    let values: Vec<f64> = rules
        .iter()
        .map(|rule| coerce_field(rule, raw.get(rule.name), &mut warnings))
        .collect();
    let params = ModelParameters::from_values(kind, &values);
    check_population_split(&params, &mut warnings);
    check_grid_size(&params, &mut warnings);

    Ok(Coerced {
        value: params,
        warnings,
    })
}

// Seeded compartments larger than N leave no susceptibles; the request clamps
// S0 at zero, which is worth telling the caller about.
fn check_population_split(params: &ModelParameters, warnings: &mut Vec<CoercionWarning>) {
    let (n, seeded) = match *params {
        ModelParameters::Sir { n, i0, .. } => (n, i0),
        ModelParameters::Seir { n, e0, i0, .. } => (n, e0 + i0),
        _ => return,
    };
    if seeded > n {
        log::debug!("initial compartments exceed N={n}; S0 clamped to 0");
        warnings.push(CoercionWarning {
            field: "S0".into(),
            reason: CoercionReason::OutOfRange { value: n - seeded },
            substituted: 0.0,
        });
    }
}

// Very long horizons would ask for more daily samples than a chart can hold;
// the request caps the grid and the step grows instead.
fn check_grid_size(params: &ModelParameters, warnings: &mut Vec<CoercionWarning>) {
    let t_max = match *params {
        ModelParameters::Sir { t_max, .. } | ModelParameters::Seir { t_max, .. } => t_max,
        _ => return,
    };
    let wanted = epidemic_points(t_max);
    if wanted > MAX_POINTS {
        log::debug!("t_max={t_max} asks for {wanted} samples; capped at {MAX_POINTS}");
        warnings.push(CoercionWarning {
            field: "num_points".into(),
            reason: CoercionReason::OutOfRange {
                value: wanted as f64,
            },
            substituted: MAX_POINTS as f64,
        });
    }
}

/// Strict conversion: every field must be present, numeric and in range.
pub fn validate(kind: ModelKind, raw: &RawParams) -> Result<ModelParameters, ValidationError> {
    let rules = fields_for(kind);
    let mut values = Vec::with_capacity(rules.len());

    for rule in rules {
        let value = match raw.get(rule.name) {
            None | Some(RawValue::Null) => {
                return Err(ValidationError::Missing {
                    field: rule.name.to_string(),
                })
            }
            Some(value) => value.as_number().ok_or_else(|| ValidationError::NotANumber {
                field: rule.name.to_string(),
                text: value.describe(),
            })?,
        };

        let violated = match rule.bound {
            Bound::Any => None,
            Bound::NonNegative | Bound::Compartment => (value < 0.0).then_some("must be >= 0"),
            Bound::Positive | Bound::Population | Bound::Horizon => {
                (value <= 0.0).then_some("must be > 0")
            }
        };
        if let Some(constraint) = violated {
            return Err(ValidationError::OutOfRange {
                field: rule.name.to_string(),
                value,
                constraint,
            });
        }
        values.push(value);
    }

    let params = ModelParameters::from_values(kind, &values);
    match params {
        ModelParameters::Sir { n, i0, .. } if i0 > n => Err(ValidationError::Inconsistent(
            format!("I0 = {i0} exceeds N = {n}"),
        )),
        ModelParameters::Seir { n, e0, i0, .. } if e0 + i0 > n => Err(
            ValidationError::Inconsistent(format!("E0 + I0 = {} exceeds N = {n}", e0 + i0)),
        ),
        _ => Ok(params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(
        result: Result<T, ValidationError>,
        needle: &str,
    ) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn raw_values_parse_numbers_and_numeric_text() {
        assert_eq!(RawValue::from(2.5).as_number(), Some(2.5));
        assert_eq!(RawValue::from(" 0.04 ").as_number(), Some(0.04));
        assert_eq!(RawValue::from("abc").as_number(), None);
        assert_eq!(RawValue::from("inf").as_number(), None);
        assert_eq!(RawValue::Null.as_number(), None);
        assert_eq!(RawValue::Bool(true).as_number(), None);
    }

    #[test]
    fn raw_params_deserialize_from_loose_json() {
        let raw: RawParams =
            serde_json::from_str(r#"{"P0": 200, "r": "0.04", "t_max": null, "flag": true}"#)
                .expect("deserializes");
        assert_eq!(raw.number("P0"), Some(200.0));
        assert_eq!(raw.number("r"), Some(0.04));
        assert!(!raw.is_present("t_max"));
        assert_eq!(raw.get("flag"), Some(&RawValue::Bool(true)));
    }

    #[test]
    fn exponential_defaults_follow_the_lesson() {
        let raw = RawParams::new().with("P0", "lots").with("t_max", -5.0);
        let coerced = coerce(ModelKind::Exponential, &raw).expect("never fails");
        assert_eq!(
            coerced.value,
            ModelParameters::Exponential {
                p0: 1.0,
                r: 0.1,
                t_max: 1.0
            }
        );
        let fields: Vec<&str> = coerced.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(fields, vec!["P0", "r", "t_max"]);
        assert_eq!(
            coerced.warnings[0].reason,
            CoercionReason::Unparseable {
                text: "lots".into()
            }
        );
    }

    #[test]
    fn non_positive_population_becomes_epsilon() {
        let raw = RawParams::new()
            .with("P0", 0.0)
            .with("r", -0.2)
            .with("t_max", 50.0);
        let coerced = coerce(ModelKind::Exponential, &raw).expect("never fails");
        assert_eq!(
            coerced.value,
            ModelParameters::Exponential {
                p0: MIN_POPULATION,
                r: -0.2,
                t_max: 50.0
            }
        );
        assert_eq!(coerced.warnings.len(), 1);
    }

    #[test]
    fn epidemic_zeros_count_as_missing_but_compartments_do_not() {
        let raw = RawParams::new()
            .with("N", 0.0)
            .with("beta", 0.0)
            .with("gamma", 0.25)
            .with("I0", 0.0)
            .with("t_max", 0.0);
        let coerced = coerce(ModelKind::Sir, &raw).expect("never fails");
        assert_eq!(
            coerced.value,
            ModelParameters::Sir {
                n: 1000.0,
                beta: 0.3,
                gamma: 0.25,
                i0: 0.0,
                t_max: 100.0
            }
        );
        assert!(coerced
            .warnings
            .iter()
            .all(|w| w.reason == CoercionReason::Zero));
    }

    #[test]
    fn negative_rates_fall_back_to_defaults() {
        let raw = RawParams::new().with("sigma", -1.0).with("E0", -3.0);
        let coerced = coerce(ModelKind::Seir, &raw).expect("never fails");
        match coerced.value {
            ModelParameters::Seir { sigma, e0, .. } => {
                assert_eq!(sigma, 0.2);
                assert_eq!(e0, 0.0);
            }
            other => panic!("unexpected parameters {other:?}"),
        }
    }

    #[test]
    fn overfull_seed_is_reported_and_clamped() {
        let raw = RawParams::new().with("N", 10.0).with("I0", 25.0);
        let coerced = coerce(ModelKind::Sir, &raw).expect("never fails");
        assert!(coerced.warnings.iter().any(|w| w.field == "S0"));
        let request = coerced.value.request();
        assert_eq!(request.initial.to_vec()[0], 0.0);
    }

    #[test]
    fn rate_ratio_rumor_fails_closed() {
        let complete = RawParams::new()
            .with("S0", 99.0)
            .with("I0", 1.0)
            .with("R0", 0.0)
            .with("beta", 0.002)
            .with("gamma", 0.05)
            .with("t_max", 60.0);
        let coerced = coerce(ModelKind::RumorRateRatio, &complete).expect("all fields present");
        assert!(coerced.warnings.is_empty());

        let partial = complete.clone().with("gamma", RawValue::Null);
        let err = coerce(ModelKind::RumorRateRatio, &partial).expect_err("gamma is null");
        assert_eq!(err.missing, vec!["gamma".to_string()]);

        let mut unparseable = complete.clone();
        unparseable.set("S0", "");
        assert!(coerce(ModelKind::RumorRateRatio, &unparseable).is_err());
    }

    #[test]
    fn strict_validation_reports_first_problem() {
        let raw = RawParams::new().with("P0", 200.0).with("r", 0.04);
        assert_err_contains(
            validate(ModelKind::Exponential, &raw),
            "missing required field 't_max'",
        );

        let raw = raw.with("t_max", "soon");
        assert_err_contains(validate(ModelKind::Exponential, &raw), "not a number");

        let raw = raw.with("t_max", -5.0);
        assert_err_contains(validate(ModelKind::Exponential, &raw), "must be > 0");

        let raw = raw.with("t_max", 100.0);
        assert_eq!(
            validate(ModelKind::Exponential, &raw),
            Ok(ModelParameters::Exponential {
                p0: 200.0,
                r: 0.04,
                t_max: 100.0
            })
        );
    }

    #[test]
    fn strict_validation_checks_population_split() {
        let raw = RawParams::new()
            .with("N", 100.0)
            .with("beta", 0.3)
            .with("sigma", 0.2)
            .with("gamma", 0.1)
            .with("E0", 60.0)
            .with("I0", 50.0)
            .with("t_max", 10.0);
        assert_err_contains(validate(ModelKind::Seir, &raw), "exceeds N");
    }

    #[test]
    fn requests_use_the_lesson_grids() {
        let sir = coerce(ModelKind::Sir, &RawParams::new())
            .expect("never fails")
            .value
            .request();
        assert_eq!(sir.num_points, 100);
        assert_eq!(sir.initial.to_vec(), vec![999.0, 1.0, 0.0]);
        assert!(sir.validate().is_ok());

        let logistic = coerce(ModelKind::Logistic, &RawParams::new())
            .expect("never fails")
            .value
            .request();
        assert_eq!((logistic.t_start, logistic.t_max), LOGISTIC_WINDOW);
        assert_eq!(logistic.num_points, LOGISTIC_POINTS);

        let short = coerce(ModelKind::Sir, &RawParams::new().with("t_max", -5.0))
            .expect("never fails")
            .value
            .request();
        assert_eq!(short.t_max, 1.0);
        assert_eq!(short.num_points, 2);
    }

    #[test]
    fn huge_horizons_cap_the_epidemic_grid() {
        let raw = RawParams::new().with("t_max", 1e13);
        let coerced = coerce(ModelKind::Sir, &raw).expect("never fails");
        let capped = coerced
            .warnings
            .iter()
            .find(|w| w.field == "num_points")
            .expect("grid cap is reported");
        assert_eq!(capped.substituted, MAX_POINTS as f64);
        let request = coerced.value.request();
        assert_eq!(request.num_points, MAX_POINTS);
        assert_eq!(request.t_max, 1e13);
        assert!(request.validate().is_ok());

        let seir = coerce(ModelKind::Seir, &RawParams::new()).expect("never fails");
        assert!(seir.warnings.iter().all(|w| w.field != "num_points"));
    }

    #[test]
    fn field_names_match_the_lessons() {
        assert_eq!(
            field_names(ModelKind::RumorMassAction),
            vec!["N", "b", "k", "S0", "I0", "R0", "t_max"]
        );
        assert_eq!(
            field_names(ModelKind::RumorRateRatio),
            vec!["S0", "I0", "R0", "beta", "gamma", "t_max"]
        );
    }
}
