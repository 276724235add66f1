//! Turns a simulation request into trajectories and summary statistics.
//!
//! Growth models use their closed forms. SIR and SEIR advance with fixed
//! steps (explicit Euler unless configured otherwise), and the rumor models
//! use the adaptive Tsit5 integrator on a fine output grid. The simulator
//! never fails: a request that breaks its invariants is repaired first.

use crate::error::InsufficientInput;
use crate::interpret;
use crate::models::{
    InitialState, ModelKind, ModelSpec, SimulationRequest, SimulationResult, Summary, MAX_POINTS,
};
use crate::params::{coerce, CoercionWarning, ModelParameters, RawParams};
use crate::solvers::{integrate_on_grid, linspace, AdaptiveSettings, Euler, Tsit5, RK4};
use crate::stability::{equilibria_for, Equilibrium};
use crate::traits::{DynamicalSystem, Steppable};
use serde::{Deserialize, Serialize};

/// Fixed-step scheme used for SIR and SEIR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    Euler,
    Rk4,
    Tsit5,
}

impl Scheme {
    fn build(self, dim: usize) -> FixedStepper {
        match self {
            Scheme::Euler => FixedStepper::Euler(Euler::new(dim)),
            Scheme::Rk4 => FixedStepper::Rk4(RK4::new(dim)),
            Scheme::Tsit5 => FixedStepper::Tsit5(Tsit5::new(dim)),
        }
    }
}

enum FixedStepper {
    Euler(Euler<f64>),
    Rk4(RK4<f64>),
    Tsit5(Tsit5<f64>),
}

impl FixedStepper {
    fn step(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        dt: f64,
    ) {
        match self {
            FixedStepper::Euler(s) => s.step(system, t, state, dt),
            FixedStepper::Rk4(s) => s.step(system, t, state, dt),
            FixedStepper::Tsit5(s) => s.step(system, t, state, dt),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default)]
    pub adaptive: AdaptiveSettings,
}

/// Everything a lesson renders after one recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub parameters: ModelParameters,
    pub result: SimulationResult,
    pub interpretation: String,
    pub equilibria: Vec<Equilibrium>,
    pub warnings: Vec<CoercionWarning>,
}

/// Integrates `request` and summarizes the trajectory.
pub fn simulate(request: &SimulationRequest, settings: &SimulationSettings) -> SimulationResult {
    let request = repaired(request);
    let times = linspace(request.t_start, request.t_max, request.num_points);
    let initial = request.initial.to_vec();
    let population = request.initial.total();

    let states: Vec<Vec<f64>> = match request.model {
        ModelSpec::Exponential { r } => times
            .iter()
            .map(|t| vec![initial[0] * (r * t).exp()])
            .collect(),
        ModelSpec::Logistic { r, k } => {
            let a = (k - initial[0]) / initial[0];
            times
                .iter()
                .map(|t| vec![k / (1.0 + a * (-r * t).exp())])
                .collect()
        }
        ModelSpec::Sir { .. } | ModelSpec::Seir { .. } => {
            let system = request.model.system(population);
            let dt = (request.t_max - request.t_start) / request.num_points as f64;
            fixed_step(
                &system,
                &initial,
                request.t_start,
                dt,
                request.num_points,
                settings.scheme,
            )
        }
        ModelSpec::RumorMassAction { .. } | ModelSpec::RumorRateRatio { .. } => {
            let system = request.model.system(population);
            match integrate_on_grid(&system, &initial, &times, &settings.adaptive) {
                Ok(states) => states,
                Err(err) => {
                    log::warn!(
                        "{}: integration failed ({err}); holding initial state",
                        request.model.kind()
                    );
                    vec![initial.clone(); times.len()]
                }
            }
        }
    };

    let summary = summarize(&request, &times, &states, population);
    SimulationResult {
        model: request.model.kind(),
        labels: request.model.labels().iter().map(|l| l.to_string()).collect(),
        times,
        states,
        summary,
    }
}

/// Coerces raw lesson input, simulates it and describes the result.
///
/// Only the rate-ratio rumor lesson can refuse, when some of its fields are
/// missing; the caller should then leave its current chart in place.
pub fn simulate_raw(
    kind: ModelKind,
    raw: &RawParams,
    settings: &SimulationSettings,
) -> Result<SimulationOutcome, InsufficientInput> {
    let coerced = coerce(kind, raw)?;
    let mut outcome = run(&coerced.value, settings);
    outcome.warnings = coerced.warnings;
    Ok(outcome)
}

/// Simulates already-typed lesson parameters.
pub fn run(parameters: &ModelParameters, settings: &SimulationSettings) -> SimulationOutcome {
    let request = parameters.request();
    let result = simulate(&request, settings);
    let interpretation = interpret::describe(parameters, &result);
    log::debug!(
        "{}: {} samples, peak {:.3} at t={:.3}",
        result.model,
        result.len(),
        result.summary.peak_value,
        result.summary.peak_time
    );
    SimulationOutcome {
        parameters: *parameters,
        equilibria: equilibria_for(&request),
        result,
        interpretation,
        warnings: Vec::new(),
    }
}

fn fixed_step(
    system: &impl DynamicalSystem<f64>,
    initial: &[f64],
    t_start: f64,
    dt: f64,
    num_points: usize,
    scheme: Scheme,
) -> Vec<Vec<f64>> {
    let mut stepper = scheme.build(initial.len());
    let mut state = initial.to_vec();
    let mut t = t_start;
    let mut states = Vec::with_capacity(num_points);
    states.push(state.clone());
    for _ in 1..num_points {
        stepper.step(system, &mut t, &mut state, dt);
        states.push(state.clone());
    }
    states
}

/// A copy of `request` that satisfies the request invariants.
fn repaired(request: &SimulationRequest) -> SimulationRequest {
    let Err(err) = request.validate() else {
        return request.clone();
    };
    log::warn!("repairing simulation request: {err}");

    let t_start = if request.t_start.is_finite() {
        request.t_start
    } else {
        0.0
    };
    let t_max = if request.t_max.is_finite() && request.t_max > t_start {
        request.t_max
    } else {
        t_start + 1.0
    };
    let clean = |v: f64| if v.is_finite() && v >= 0.0 { v } else { 0.0 };
    let mut values: Vec<f64> = request.initial.to_vec().into_iter().map(clean).collect();
    let initial = match request.model {
        ModelSpec::Exponential { .. } | ModelSpec::Logistic { .. } => {
            let p0 = values.first().copied().unwrap_or(0.0);
            InitialState::Scalar(if p0 > 0.0 { p0 } else { crate::params::MIN_POPULATION })
        }
        _ => {
            values.resize(request.model.dimension(), 0.0);
            InitialState::Compartments(values)
        }
    };

    SimulationRequest {
        model: request.model,
        initial,
        t_start,
        t_max,
        num_points: request.num_points.clamp(2, MAX_POINTS),
    }
}

fn summarize(
    request: &SimulationRequest,
    times: &[f64],
    states: &[Vec<f64>],
    population: f64,
) -> Summary {
    let index = request.model.peak_index();
    let mut best: Option<(usize, f64)> = None;
    for (k, state) in states.iter().enumerate() {
        let v = state[index];
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((k, v));
        }
    }
    let (peak_at, peak_value) = best.unwrap_or((0, f64::NAN));

    let inflection_time = match request.model {
        ModelSpec::Logistic { r, k } => {
            let p0 = request.initial.total();
            let a = (k - p0) / p0;
            (a > 0.0 && r > 0.0).then(|| a.ln() / r)
        }
        _ => None,
    };

    Summary {
        peak_compartment_index: index,
        peak_value,
        peak_time: times.get(peak_at).copied().unwrap_or(request.t_start),
        r_effective: request.model.reproduction_number(population),
        inflection_time,
    }
}
