//! Sampling of a user-typed planar vector field on a square grid.

use crate::equation_engine::{parse, Expr, Scope};
use crate::params::{Coerced, CoercionReason, CoercionWarning, RawParams};
use crate::solvers::linspace;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const GRID_NAMES: [&str; 4] = ["X", "Y", "x", "y"];
const DEFAULT_FX: &str = "np.sin(X)";
const DEFAULT_FY: &str = "np.sin(Y)";
const DEFAULT_EXTENT: f64 = 5.0;
const DEFAULT_RESOLUTION: usize = 15;
const MAX_RESOLUTION: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRequest {
    pub fx: String,
    pub fy: String,
    pub xmax: f64,
    pub ymax: f64,
    pub n: usize,
}

impl Default for FieldRequest {
    fn default() -> Self {
        Self {
            fx: DEFAULT_FX.into(),
            fy: DEFAULT_FY.into(),
            xmax: DEFAULT_EXTENT,
            ymax: DEFAULT_EXTENT,
            n: DEFAULT_RESOLUTION,
        }
    }
}

impl FieldRequest {
    /// Reads `fx_expr, fy_expr, xmax, ymax, n`, substituting defaults.
    pub fn from_raw(raw: &RawParams) -> Coerced<FieldRequest> {
        let defaults = FieldRequest::default();
        let mut warnings = Vec::new();
        let mut note = |field: &str, reason: CoercionReason, substituted: f64| {
            log::debug!("coercing field {field} ({reason:?}) to {substituted}");
            warnings.push(CoercionWarning {
                field: field.to_string(),
                reason,
                substituted,
            });
        };

        let mut expression = |field: &str, default: String| match raw.text(field) {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => {
                note(field, CoercionReason::Missing, f64::NAN);
                default
            }
        };
        let fx = expression("fx_expr", defaults.fx);
        let fy = expression("fy_expr", defaults.fy);

        let mut extent = |field: &str| match raw.number(field) {
            Some(value) if value > 0.0 => value,
            Some(value) => {
                note(field, CoercionReason::OutOfRange { value }, DEFAULT_EXTENT);
                DEFAULT_EXTENT
            }
            None => {
                note(field, CoercionReason::Missing, DEFAULT_EXTENT);
                DEFAULT_EXTENT
            }
        };
        let xmax = extent("xmax");
        let ymax = extent("ymax");

        let n = match raw.number("n") {
            Some(value) if (2.0..=MAX_RESOLUTION as f64).contains(&value) => value as usize,
            Some(value) => {
                let clamped = value.clamp(2.0, MAX_RESOLUTION as f64);
                note("n", CoercionReason::OutOfRange { value }, clamped);
                clamped as usize
            }
            None => {
                note("n", CoercionReason::Missing, DEFAULT_RESOLUTION as f64);
                DEFAULT_RESOLUTION
            }
        };

        Coerced {
            value: FieldRequest {
                fx,
                fy,
                xmax,
                ymax,
                n,
            },
            warnings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    pub x: f64,
    pub y: f64,
    pub fx: f64,
    pub fy: f64,
}

impl VectorSample {
    pub fn magnitude(&self) -> f64 {
        self.fx.hypot(self.fy)
    }
}

/// Samples in row-major order: row `i` holds `y = ys[i]`, column `j` holds
/// `x = xs[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorField {
    pub n: usize,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub samples: Vec<VectorSample>,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub message: String,
    pub error: Option<String>,
}

impl VectorField {
    pub fn sample(&self, row: usize, col: usize) -> Option<&VectorSample> {
        (row < self.n && col < self.n)
            .then(|| self.samples.get(row * self.n + col))
            .flatten()
    }
}

fn compile(source: &str) -> Result<Expr> {
    let expr = parse(source)?;
    expr.check_names(&GRID_NAMES)?;
    Ok(expr)
}

fn components(request: &FieldRequest, xs: &[f64], ys: &[f64]) -> Result<Vec<(f64, f64)>> {
    let fx = compile(&request.fx)?;
    let fy = compile(&request.fy)?;

    let mut scope = Scope::new();
    let mut values = Vec::with_capacity(xs.len() * ys.len());
    for &y in ys {
        for &x in xs {
            scope.bind("X", x);
            scope.bind("x", x);
            scope.bind("Y", y);
            scope.bind("y", y);
            let u = fx.eval(&scope)?;
            let v = fy.eval(&scope)?;
            if !u.is_finite() || !v.is_finite() {
                bail!("non-finite value at ({x:.3}, {y:.3})");
            }
            values.push((u, v));
        }
    }
    Ok(values)
}

/// Evaluates both components on the grid.
///
/// A failing expression never propagates: the field comes back with zero
/// vectors everywhere and the failure in `message` and `error`.
pub fn evaluate_field(request: &FieldRequest) -> VectorField {
    let n = request.n.clamp(2, MAX_RESOLUTION);
    let xs = linspace(-request.xmax, request.xmax, n);
    let ys = linspace(-request.ymax, request.ymax, n);

    let (values, error) = match components(request, &xs, &ys) {
        Ok(values) => (values, None),
        Err(err) => {
            log::warn!("vector field ({}, {}): {err}", request.fx, request.fy);
            (vec![(0.0, 0.0); n * n], Some(err.to_string()))
        }
    };

    let samples: Vec<VectorSample> = ys
        .iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .zip(values)
        .map(|((x, y), (fx, fy))| VectorSample { x, y, fx, fy })
        .collect();

    let (min_magnitude, max_magnitude) = samples
        .iter()
        .map(VectorSample::magnitude)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| {
            (lo.min(m), hi.max(m))
        });

    let message = match &error {
        Some(detail) => format!("Expression error: {detail}"),
        None => format!("Field magnitude: min = {min_magnitude:.2}, max = {max_magnitude:.2}"),
    };

    VectorField {
        n,
        xs,
        ys,
        samples,
        min_magnitude,
        max_magnitude,
        message,
        error,
    }
}
