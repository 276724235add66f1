//! The `modela_core` crate is the computational engine behind the Modela
//! lessons on population growth, epidemics and rumor spreading.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (ODE right-hand sides), `Steppable` (fixed-step solvers).
//! - **Solvers**: Euler, RK4 and Tsit5 steppers plus an error-controlled Tsit5 driver that samples a fixed output grid.
//! - **Models and parameters**: the lesson models, the forgiving and strict parameter paths, and simulation requests.
//! - **Simulator**: trajectories, summaries, stability of equilibria and the plain-language interpretation.
//! - **Equation engine**: a restricted expression language used by the vector field lesson.
//! - **Projection**: a mean-reverting exchange-rate projection.
pub mod equation_engine;
pub mod error;
pub mod interpret;
pub mod models;
pub mod params;
pub mod projection;
pub mod simulator;
pub mod solvers;
pub mod stability;
pub mod traits;
pub mod vector_field;
