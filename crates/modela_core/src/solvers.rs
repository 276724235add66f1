use crate::traits::{DynamicalSystem, Scalar, Steppable};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Explicit (forward) Euler solver.
/// Every derivative is taken from the state at the start of the step, so all
/// components advance simultaneously.
pub struct Euler<T: Scalar> {
    deriv: Vec<T>,
}

impl<T: Scalar> Euler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            deriv: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Euler<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        system.apply(*t, state, &mut self.deriv);
        for (x, dx) in state.iter_mut().zip(&self.deriv) {
            *x = *x + *dx * dt;
        }
        *t = *t + dt;
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::lit(0.5);
        let sixth = T::lit(1.0 / 6.0);
        let two = T::lit(2.0);

        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

// Tsitouras 5(4) tableau.
const C2: f64 = 0.161;
const C3: f64 = 0.327;
const C4: f64 = 0.9;
const C5: f64 = 0.9800255409045097;

const A21: f64 = 0.161;
const A31: f64 = -0.008480655492356989;
const A32: f64 = 0.335480655492357;
const A41: f64 = 2.898;
const A42: f64 = -6.359447987781783;
const A43: f64 = 4.361447987781783;
const A51: f64 = 5.325864858437957;
const A52: f64 = -11.748883564062828;
const A53: f64 = 7.495539342889693;
const A54: f64 = -0.09249506636030195;
const A61: f64 = 5.86145544294642;
const A62: f64 = -12.92096931784711;
const A63: f64 = 8.159367898576159;
const A64: f64 = -0.071584973281401;
const A65: f64 = -0.02826857949054663;

const B: [f64; 6] = [
    0.09646076681806523,
    0.01,
    0.4798896504144996,
    1.379008574103742,
    -3.290069515436099,
    2.324710524099774,
];

// Difference between the 5th and embedded 4th order weights (7th stage is FSAL).
const BTILDE: [f64; 7] = [
    -0.00178001105222577714,
    -0.0008164344596567469,
    0.007880878010261995,
    -0.1447110071732629,
    0.5823571654525552,
    -0.45808210592918697,
    0.015151515151515152,
];

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    k: [Vec<T>; 7],
    tmp: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![T::zero(); dim]),
            tmp: vec![T::zero(); dim],
        }
    }

    /// Evaluates the six stages at (t0, state) and writes the 5th order
    /// solution into `out`.
    fn stages(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t0: T,
        state: &[T],
        dt: T,
        out: &mut [T],
    ) {
        let n = state.len();
        let lit = T::lit;

        system.apply(t0, state, &mut self.k[0]);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (lit(A21) * self.k[0][i]);
        }
        system.apply(t0 + lit(C2) * dt, &self.tmp, &mut self.k[1]);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (lit(A31) * self.k[0][i] + lit(A32) * self.k[1][i]);
        }
        system.apply(t0 + lit(C3) * dt, &self.tmp, &mut self.k[2]);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (lit(A41) * self.k[0][i] + lit(A42) * self.k[1][i] + lit(A43) * self.k[2][i]);
        }
        system.apply(t0 + lit(C4) * dt, &self.tmp, &mut self.k[3]);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (lit(A51) * self.k[0][i]
                    + lit(A52) * self.k[1][i]
                    + lit(A53) * self.k[2][i]
                    + lit(A54) * self.k[3][i]);
        }
        system.apply(t0 + lit(C5) * dt, &self.tmp, &mut self.k[4]);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (lit(A61) * self.k[0][i]
                    + lit(A62) * self.k[1][i]
                    + lit(A63) * self.k[2][i]
                    + lit(A64) * self.k[3][i]
                    + lit(A65) * self.k[4][i]);
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k[5]);

        for i in 0..n {
            let mut acc = T::zero();
            for (s, b) in B.iter().enumerate() {
                acc = acc + lit(*b) * self.k[s][i];
            }
            out[i] = state[i] + dt * acc;
        }
    }

    /// Local error estimate for the step that produced `next` from `state`.
    /// Evaluates the FSAL stage at (t0 + dt, next).
    fn error_estimate(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t_next: T,
        next: &[T],
        dt: T,
        out: &mut [T],
    ) {
        system.apply(t_next, next, &mut self.k[6]);
        for i in 0..next.len() {
            let mut acc = T::zero();
            for (s, b) in BTILDE.iter().enumerate() {
                acc = acc + T::lit(*b) * self.k[s][i];
            }
            out[i] = dt * acc;
        }
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let mut next = vec![T::zero(); state.len()];
        self.stages(system, *t, state, dt, &mut next);
        state.copy_from_slice(&next);
        *t = *t + dt;
    }
}

/// Settings for the adaptive Tsit5 integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    pub rtol: f64,
    pub atol: f64,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_steps: usize,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            initial_step: 1e-2,
            min_step: 1e-12,
            max_steps: 100_000,
        }
    }
}

/// Integrates `system` from `initial` at `times[0]` and returns the state at
/// every entry of `times`, using error-controlled Tsit5 steps.
///
/// Steps are clipped so the integrator lands exactly on each output time.
/// A step that would need to shrink below `min_step` is accepted as is.
/// Running out of `max_steps` holds the last state for the remaining outputs.
pub fn integrate_on_grid(
    system: &impl DynamicalSystem<f64>,
    initial: &[f64],
    times: &[f64],
    settings: &AdaptiveSettings,
) -> Result<Vec<Vec<f64>>> {
    let dim = system.dimension();
    if initial.len() != dim {
        bail!(
            "Initial state dimension mismatch. Expected {}, got {}.",
            dim,
            initial.len()
        );
    }
    if times.is_empty() {
        bail!("Output grid must contain at least one time.");
    }
    if times.windows(2).any(|w| !(w[1] > w[0])) {
        bail!("Output grid must be strictly increasing.");
    }
    if !(settings.rtol > 0.0 && settings.atol > 0.0) {
        bail!("Tolerances must be positive.");
    }
    if !(settings.initial_step > 0.0) {
        bail!("initial_step must be positive.");
    }

    let mut solver = Tsit5::<f64>::new(dim);
    let mut state = initial.to_vec();
    let mut next = vec![0.0; dim];
    let mut err = vec![0.0; dim];
    let mut t = times[0];
    let mut dt = settings.initial_step;
    let mut steps = 0usize;
    let mut exhausted = false;

    let mut output = Vec::with_capacity(times.len());
    output.push(state.clone());

    for &target in &times[1..] {
        while !exhausted && t < target {
            if steps >= settings.max_steps {
                log::warn!(
                    "adaptive integrator hit max_steps={} at t={t}; holding state",
                    settings.max_steps
                );
                exhausted = true;
                break;
            }
            let remaining = target - t;
            let clipped = remaining <= dt;
            let h = if clipped { remaining } else { dt };

            solver.stages(system, t, &state, h, &mut next);
            solver.error_estimate(system, t + h, &next, h, &mut err);
            steps += 1;

            let norm = error_norm(&state, &next, &err, settings);
            let forced = h <= settings.min_step;
            if norm <= 1.0 || forced {
                if forced && norm > 1.0 {
                    log::warn!("adaptive integrator forced a step of {h:e} at t={t}");
                }
                state.copy_from_slice(&next);
                t = if clipped { target } else { t + h };
            }

            let factor = if norm == 0.0 {
                5.0
            } else if norm.is_finite() {
                (0.9 * norm.powf(-0.2)).clamp(0.2, 5.0)
            } else {
                0.2
            };
            // A clipped step says nothing about how large the next one may be.
            if !(clipped && norm <= 1.0) {
                dt = (h * factor).max(settings.min_step);
            }
        }
        output.push(state.clone());
    }

    Ok(output)
}

fn error_norm(state: &[f64], next: &[f64], err: &[f64], settings: &AdaptiveSettings) -> f64 {
    if state.is_empty() {
        return 0.0;
    }
    let sum: f64 = state
        .iter()
        .zip(next)
        .zip(err)
        .map(|((y0, y1), e)| {
            let scale = settings.atol + settings.rtol * y0.abs().max(y1.abs());
            (e / scale).powi(2)
        })
        .sum();
    (sum / state.len() as f64).sqrt()
}

/// Evenly spaced grid of `count` points on [start, end], endpoints included.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i + 1 == count { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
