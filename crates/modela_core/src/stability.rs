//! Linear stability of the models' equilibria.

use crate::models::{ModelSpec, SimulationRequest};
use crate::traits::DynamicalSystem;
use anyhow::{bail, Result};
use nalgebra::{Complex, DMatrix};
use serde::{Deserialize, Serialize};

/// Eigenvalue real parts within this distance of zero count as neutral.
const NEUTRAL_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    Stable,
    Unstable,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub label: String,
    pub state: Vec<f64>,
    pub eigenvalues: Vec<ComplexNumber>,
    pub stability: Stability,
}

/// Row-major Jacobian of `system` at `state`, by central differences.
pub fn jacobian(system: &impl DynamicalSystem<f64>, state: &[f64]) -> Result<Vec<f64>> {
    let dim = system.dimension();
    if dim == 0 {
        bail!("System has zero dimension.");
    }
    if state.len() != dim {
        bail!(
            "State dimension mismatch. Expected {}, got {}.",
            dim,
            state.len()
        );
    }

    let mut jac = vec![0.0; dim * dim];
    let mut probe = state.to_vec();
    let mut forward = vec![0.0; dim];
    let mut backward = vec![0.0; dim];

    for j in 0..dim {
        let h = 1e-6 * state[j].abs().max(1.0);
        probe[j] = state[j] + h;
        system.apply(0.0, &probe, &mut forward);
        probe[j] = state[j] - h;
        system.apply(0.0, &probe, &mut backward);
        probe[j] = state[j];
        for i in 0..dim {
            jac[i * dim + j] = (forward[i] - backward[i]) / (2.0 * h);
        }
    }
    Ok(jac)
}

pub fn classify(eigenvalues: &[Complex<f64>]) -> Stability {
    if eigenvalues.iter().any(|l| l.re > NEUTRAL_TOLERANCE) {
        Stability::Unstable
    } else if eigenvalues.iter().all(|l| l.re < -NEUTRAL_TOLERANCE) {
        Stability::Stable
    } else {
        Stability::Neutral
    }
}

/// Linearizes `system` at `state` and classifies the equilibrium.
pub fn analyze_equilibrium(
    system: &impl DynamicalSystem<f64>,
    label: &str,
    state: &[f64],
) -> Result<Equilibrium> {
    let dim = system.dimension();
    let jac = jacobian(system, state)?;
    if jac.iter().any(|v| !v.is_finite()) {
        bail!("Jacobian at {label} is not finite.");
    }
    let matrix = DMatrix::from_row_slice(dim, dim, &jac);
    let eigenvalues: Vec<Complex<f64>> = matrix.complex_eigenvalues().iter().copied().collect();
    Ok(Equilibrium {
        label: label.to_string(),
        state: state.to_vec(),
        stability: classify(&eigenvalues),
        eigenvalues: eigenvalues.into_iter().map(ComplexNumber::from).collect(),
    })
}

/// Equilibria worth showing next to a simulation of `request`.
///
/// Growth models report their fixed points; closed models report the
/// disease-free state with the whole population susceptible.
pub fn equilibria_for(request: &SimulationRequest) -> Vec<Equilibrium> {
    let population = request.initial.total();
    let system = request.model.system(population);

    let candidates: Vec<(&str, Vec<f64>)> = match request.model {
        ModelSpec::Exponential { .. } => vec![("P = 0", vec![0.0])],
        ModelSpec::Logistic { k, .. } => vec![("P = 0", vec![0.0]), ("P = K", vec![k])],
        ModelSpec::Sir { .. }
        | ModelSpec::RumorMassAction { .. }
        | ModelSpec::RumorRateRatio { .. } => vec![("disease-free", vec![population, 0.0, 0.0])],
        ModelSpec::Seir { .. } => vec![("disease-free", vec![population, 0.0, 0.0, 0.0])],
    };

    candidates
        .into_iter()
        .filter_map(
            |(label, state)| match analyze_equilibrium(&system, label, &state) {
                Ok(eq) => Some(eq),
                Err(err) => {
                    log::warn!("skipping equilibrium {label}: {err}");
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InitialState, ModelSystem};

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn jacobian_of_logistic_matches_derivative() {
        let system = ModelSystem::Logistic { r: 0.5, k: 100.0 };
        for p in [0.0, 25.0, 50.0, 100.0] {
            let jac = jacobian(&system, &[p]).expect("jacobian should compute");
            let expected = 0.5 * (1.0 - 2.0 * p / 100.0);
            assert!((jac[0] - expected).abs() < 1e-6, "p={p}");
        }
    }

    #[test]
    fn jacobian_rejects_dimension_mismatch() {
        let system = ModelSystem::Logistic { r: 0.5, k: 100.0 };
        assert_err_contains(jacobian(&system, &[1.0, 2.0]), "dimension mismatch");
    }

    #[test]
    fn logistic_equilibria_are_unstable_then_stable() {
        let request = SimulationRequest::new(
            ModelSpec::Logistic {
                r: 0.2311,
                k: 1_072_764.0,
            },
            InitialState::Scalar(900_000.0),
            15.0,
            12,
        )
        .expect("valid request");
        let equilibria = equilibria_for(&request);
        assert_eq!(equilibria.len(), 2);
        assert_eq!(equilibria[0].stability, Stability::Unstable);
        assert_eq!(equilibria[1].stability, Stability::Stable);
        assert!((equilibria[1].eigenvalues[0].re + 0.2311).abs() < 1e-5);
    }

    #[test]
    fn sir_disease_free_state_is_unstable_above_threshold() {
        let initial = InitialState::Compartments(vec![999.0, 1.0, 0.0]);
        let above = SimulationRequest::new(
            ModelSpec::Sir {
                beta: 0.3,
                gamma: 0.1,
            },
            initial.clone(),
            100.0,
            100,
        )
        .expect("valid request");
        let eq = &equilibria_for(&above)[0];
        assert_eq!(eq.stability, Stability::Unstable);
        assert_eq!(eq.state, vec![1000.0, 0.0, 0.0]);
        let growth = eq
            .eigenvalues
            .iter()
            .map(|l| l.re)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((growth - 0.2).abs() < 1e-6);

        // Conservation leaves zero eigenvalues, so below threshold is neutral.
        let below = SimulationRequest::new(
            ModelSpec::Sir {
                beta: 0.05,
                gamma: 0.1,
            },
            initial,
            100.0,
            100,
        )
        .expect("valid request");
        assert_eq!(equilibria_for(&below)[0].stability, Stability::Neutral);
    }

    #[test]
    fn exponential_origin_follows_sign_of_rate() {
        for (r, expected) in [
            (0.04, Stability::Unstable),
            (-0.04, Stability::Stable),
            (0.0, Stability::Neutral),
        ] {
            let request = SimulationRequest::new(
                ModelSpec::Exponential { r },
                InitialState::Scalar(200.0),
                100.0,
                15,
            )
            .expect("valid request");
            assert_eq!(equilibria_for(&request)[0].stability, expected, "r={r}");
        }
    }
}
