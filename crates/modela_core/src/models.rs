//! Model descriptions, simulation requests and results.

use crate::error::ValidationError;
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Exponential,
    Logistic,
    Sir,
    Seir,
    #[serde(rename = "rumor")]
    RumorMassAction,
    #[serde(rename = "rumor_ratio")]
    RumorRateRatio,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::Exponential,
        ModelKind::Logistic,
        ModelKind::Sir,
        ModelKind::Seir,
        ModelKind::RumorMassAction,
        ModelKind::RumorRateRatio,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ModelKind::Exponential => "exponential",
            ModelKind::Logistic => "logistic",
            ModelKind::Sir => "sir",
            ModelKind::Seir => "seir",
            ModelKind::RumorMassAction => "rumor",
            ModelKind::RumorRateRatio => "rumor_ratio",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModel(pub String);

impl fmt::Display for UnknownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model '{}'", self.0)
    }
}

impl std::error::Error for UnknownModel {}

impl FromStr for ModelKind {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

/// Compartmental structure plus the rate constants it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelSpec {
    Exponential { r: f64 },
    Logistic { r: f64, k: f64 },
    Sir { beta: f64, gamma: f64 },
    Seir { beta: f64, sigma: f64, gamma: f64 },
    #[serde(rename = "rumor")]
    RumorMassAction { b: f64, k: f64 },
    #[serde(rename = "rumor_ratio")]
    RumorRateRatio { beta: f64, gamma: f64 },
}

impl ModelSpec {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelSpec::Exponential { .. } => ModelKind::Exponential,
            ModelSpec::Logistic { .. } => ModelKind::Logistic,
            ModelSpec::Sir { .. } => ModelKind::Sir,
            ModelSpec::Seir { .. } => ModelKind::Seir,
            ModelSpec::RumorMassAction { .. } => ModelKind::RumorMassAction,
            ModelSpec::RumorRateRatio { .. } => ModelKind::RumorRateRatio,
        }
    }

    /// Names of the state components, in state-vector order.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            ModelSpec::Exponential { .. } | ModelSpec::Logistic { .. } => &["P"],
            ModelSpec::Sir { .. } => &["S", "I", "R"],
            ModelSpec::Seir { .. } => &["S", "E", "I", "R"],
            ModelSpec::RumorMassAction { .. } | ModelSpec::RumorRateRatio { .. } => {
                &["S", "I", "R"]
            }
        }
    }

    pub fn dimension(&self) -> usize {
        self.labels().len()
    }

    /// Index of the compartment whose peak the summary reports.
    pub fn peak_index(&self) -> usize {
        match self {
            ModelSpec::Exponential { .. } | ModelSpec::Logistic { .. } => 0,
            ModelSpec::Seir { .. } => 2,
            _ => 1,
        }
    }

    /// Reproduction number of the model, when it has one.
    /// Rumor models are mass-action without a 1/N factor, so the threshold
    /// quantity scales with the population.
    pub fn reproduction_number(&self, population: f64) -> Option<f64> {
        let ratio = |num: f64, den: f64| {
            let value = num / den;
            (den != 0.0 && value.is_finite()).then_some(value)
        };
        match *self {
            ModelSpec::Sir { beta, gamma } | ModelSpec::Seir { beta, gamma, .. } => {
                ratio(beta, gamma)
            }
            ModelSpec::RumorMassAction { b, k } => ratio(b * population, k),
            ModelSpec::RumorRateRatio { beta, gamma } => ratio(beta * population, gamma),
            ModelSpec::Exponential { .. } | ModelSpec::Logistic { .. } => None,
        }
    }

    /// The right-hand side of the model as a dynamical system.
    pub fn system(&self, population: f64) -> ModelSystem {
        match *self {
            ModelSpec::Exponential { r } => ModelSystem::Exponential { r },
            ModelSpec::Logistic { r, k } => ModelSystem::Logistic { r, k },
            ModelSpec::Sir { beta, gamma } => ModelSystem::Sir {
                beta,
                gamma,
                n: population,
            },
            ModelSpec::Seir { beta, sigma, gamma } => ModelSystem::Seir {
                beta,
                sigma,
                gamma,
                n: population,
            },
            ModelSpec::RumorMassAction { b, k } => ModelSystem::Rumor {
                spread: b,
                stifle: k,
            },
            ModelSpec::RumorRateRatio { beta, gamma } => ModelSystem::Rumor {
                spread: beta,
                stifle: gamma,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitialState {
    Scalar(f64),
    Compartments(Vec<f64>),
}

impl InitialState {
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            InitialState::Scalar(p0) => vec![*p0],
            InitialState::Compartments(values) => values.clone(),
        }
    }

    /// Sum over compartments (the population for closed models).
    pub fn total(&self) -> f64 {
        match self {
            InitialState::Scalar(p0) => *p0,
            InitialState::Compartments(values) => values.iter().sum(),
        }
    }
}

/// Largest output grid a request may ask for.
pub const MAX_POINTS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub model: ModelSpec,
    pub initial: InitialState,
    #[serde(default)]
    pub t_start: f64,
    pub t_max: f64,
    pub num_points: usize,
}

impl SimulationRequest {
    /// Builds a request, checking the structural invariants.
    pub fn new(
        model: ModelSpec,
        initial: InitialState,
        t_max: f64,
        num_points: usize,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            model,
            initial,
            t_start: 0.0,
            t_max,
            num_points,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn with_start(mut self, t_start: f64) -> Result<Self, ValidationError> {
        self.t_start = t_start;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.t_start.is_finite() || !self.t_max.is_finite() {
            return Err(ValidationError::Inconsistent(
                "time horizon must be finite".into(),
            ));
        }
        if self.t_max <= self.t_start {
            return Err(ValidationError::OutOfRange {
                field: "t_max".into(),
                value: self.t_max,
                constraint: "must exceed the start time",
            });
        }
        if self.num_points < 2 {
            return Err(ValidationError::OutOfRange {
                field: "num_points".into(),
                value: self.num_points as f64,
                constraint: "at least 2",
            });
        }
        if self.num_points > MAX_POINTS {
            return Err(ValidationError::OutOfRange {
                field: "num_points".into(),
                value: self.num_points as f64,
                constraint: "at most 100000",
            });
        }
        let state = self.initial.to_vec();
        let expected = self.model.dimension();
        let scalar_model = matches!(
            self.model,
            ModelSpec::Exponential { .. } | ModelSpec::Logistic { .. }
        );
        let scalar_state = matches!(self.initial, InitialState::Scalar(_));
        if state.len() != expected || scalar_model != scalar_state {
            return Err(ValidationError::Inconsistent(format!(
                "{} expects {} initial value(s), got {}",
                self.model.kind(),
                expected,
                state.len()
            )));
        }
        for (label, value) in self.model.labels().iter().zip(&state) {
            if !value.is_finite() || *value < 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: (*label).to_string(),
                    value: *value,
                    constraint: "compartments must be finite and non-negative",
                });
            }
        }
        Ok(())
    }
}

/// Derived statistics of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub peak_compartment_index: usize,
    pub peak_value: f64,
    pub peak_time: f64,
    pub r_effective: Option<f64>,
    /// Time at which a logistic curve crosses K/2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflection_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub model: ModelKind,
    pub labels: Vec<String>,
    pub times: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub summary: Summary,
}

impl SimulationResult {
    /// Time series of one compartment.
    pub fn series(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|s| s[index]).collect()
    }

    pub fn series_by_label(&self, label: &str) -> Option<Vec<f64>> {
        let index = self.labels.iter().position(|l| l == label)?;
        Some(self.series(index))
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Vector fields of the supported models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelSystem {
    Exponential { r: f64 },
    Logistic { r: f64, k: f64 },
    Sir { beta: f64, gamma: f64, n: f64 },
    Seir { beta: f64, sigma: f64, gamma: f64, n: f64 },
    Rumor { spread: f64, stifle: f64 },
}

/// Mass-action transmission `beta S I / N`; an empty population transmits
/// nothing.
fn incidence(beta: f64, susceptible: f64, infectious: f64, n: f64) -> f64 {
    if n > 0.0 {
        beta * susceptible * infectious / n
    } else {
        0.0
    }
}

impl DynamicalSystem<f64> for ModelSystem {
    fn dimension(&self) -> usize {
        match self {
            ModelSystem::Exponential { .. } | ModelSystem::Logistic { .. } => 1,
            ModelSystem::Sir { .. } | ModelSystem::Rumor { .. } => 3,
            ModelSystem::Seir { .. } => 4,
        }
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        match *self {
            ModelSystem::Exponential { r } => out[0] = r * x[0],
            ModelSystem::Logistic { r, k } => out[0] = r * x[0] * (1.0 - x[0] / k),
            ModelSystem::Sir { beta, gamma, n } => {
                let incidence = incidence(beta, x[0], x[1], n);
                out[0] = -incidence;
                out[1] = incidence - gamma * x[1];
                out[2] = gamma * x[1];
            }
            ModelSystem::Seir {
                beta,
                sigma,
                gamma,
                n,
            } => {
                let incidence = incidence(beta, x[0], x[2], n);
                out[0] = -incidence;
                out[1] = incidence - sigma * x[1];
                out[2] = sigma * x[1] - gamma * x[2];
                out[3] = gamma * x[2];
            }
            ModelSystem::Rumor { spread, stifle } => {
                let contacts = spread * x[0] * x[1];
                out[0] = -contacts;
                out[1] = contacts - stifle * x[1];
                out[2] = stifle * x[1];
            }
        }
    }
}
