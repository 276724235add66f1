//! Exchange-rate projection for the currency lesson.

use js_sys::Float64Array;
use modela_core::projection::{project_seeded, ExchangeQuote, ProjectionSettings, QuoteSeries};
use wasm_bindgen::prelude::*;

pub(crate) fn projected_path(
    buy: f64,
    sell: f64,
    series: &str,
    seed: u64,
) -> Result<Vec<f64>, String> {
    if !buy.is_finite() || !sell.is_finite() {
        return Err("Quote must be finite.".to_string());
    }
    let series: QuoteSeries = series.parse().map_err(|err| format!("{err}"))?;
    let projection = project_seeded(
        ExchangeQuote { buy, sell },
        series,
        &ProjectionSettings::default(),
        seed,
    );
    Ok(projection.path)
}

/// Projects `series` (`buy`, `sell` or `spread`) of the quote over the next
/// two weeks. The same seed gives the same path.
#[wasm_bindgen]
pub fn project_exchange_rate(
    buy: f64,
    sell: f64,
    series: &str,
    seed: u32,
) -> Result<Float64Array, JsValue> {
    console_error_panic_hook::set_once();
    let path =
        projected_path(buy, sell, series, u64::from(seed)).map_err(|e| JsValue::from_str(&e))?;
    Ok(Float64Array::from(path.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_starts_at_selected_series() {
        let path = projected_path(3.712, 3.7195, "spread", 11).expect("valid quote");
        assert_eq!(path.len(), 15);
        assert_eq!(path[0], 0.0075);
        assert_eq!(path, projected_path(3.712, 3.7195, "Spread", 11).expect("valid quote"));
    }

    #[test]
    fn rejects_unknown_series_and_bad_quotes() {
        assert!(projected_path(3.7, 3.8, "mid", 1).is_err());
        assert!(projected_path(f64::NAN, 3.8, "buy", 1).is_err());
    }
}
