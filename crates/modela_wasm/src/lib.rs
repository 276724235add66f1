//! WASM bridge exposing the lesson simulators to the browser front-end.
//!
//! Exported functions convert JS values with `serde-wasm-bindgen`, call into
//! `modela_core` and hand back plain JS objects. Each export delegates to a
//! pure helper returning `Result<_, String>` so the logic is testable natively.

mod field;
mod lesson;
mod quote;

pub use field::vector_field;
pub use lesson::{simulate, WasmLesson};
pub use quote::project_exchange_rate;

use wasm_bindgen::prelude::*;

/// Version of the bridge, as reported by Cargo.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
