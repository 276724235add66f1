//! Plain-language reading of a simulation, shown under each lesson's chart.

use crate::models::SimulationResult;
use crate::params::ModelParameters;

pub fn describe(parameters: &ModelParameters, result: &SimulationResult) -> String {
    let summary = &result.summary;
    let last = result
        .states
        .last()
        .and_then(|s| s.first())
        .copied()
        .unwrap_or(f64::NAN);

    match *parameters {
        ModelParameters::Exponential { p0, r, t_max } => {
            let trend = if r > 0.0 {
                "grows"
            } else if r < 0.0 {
                "decays"
            } else {
                "stays constant"
            };
            format!(
                "Starting from P0 = {p0:.2}, the population {trend} at rate r = {r:.4} \
                 and reaches P({t_max:.2}) ≈ {last:.2}."
            )
        }
        ModelParameters::Logistic { p0, r, k } => {
            let inflection = match summary.inflection_time {
                Some(t) => format!(
                    "Growth is fastest at P = K/2 = {:.0}, reached around t ≈ {t:.2}.",
                    k / 2.0
                ),
                None => "The population starts at or past K/2, so growth only slows down.".into(),
            };
            format!(
                "With r = {r:.4} the population starting at P0 = {p0:.0} approaches the \
                 carrying capacity K = {k:.0}. P = 0 is an unstable equilibrium and P = K \
                 a stable one. {inflection}"
            )
        }
        ModelParameters::Sir { .. } | ModelParameters::Seir { .. } => {
            let reproduction = match summary.r_effective {
                Some(r0) => format!("the basic reproduction number is R₀ ≈ {r0:.2}"),
                None => "the basic reproduction number is undefined (γ = 0)".into(),
            };
            let mut text = format!(
                "With the current parameters {reproduction}. Infected individuals peak at \
                 about {} people around day {:.0}.",
                summary.peak_value.trunc() as i64,
                summary.peak_time
            );
            if matches!(parameters, ModelParameters::Seir { .. }) {
                text.push_str(
                    " The exposed phase (E) delays the outbreak and gives a later, softer \
                     peak than the SIR model.",
                );
            } else {
                text.push_str(
                    " As recoveries accumulate the susceptible pool shrinks and the \
                     outbreak settles.",
                );
            }
            text
        }
        ModelParameters::RumorMassAction {
            n,
            b,
            k,
            s0,
            i0,
            r0,
            ..
        } => format!(
            "A group of {} people is simulated: {} have not heard the rumor, {} are \
             spreading it and {} already ignore it. The rumor spreads at b = {b} and \
             spreaders lose interest at k = {k}. Spreaders peak around day {:.1} with \
             about {} people, after which stiflers take over.",
            n.trunc() as i64,
            s0.trunc() as i64,
            i0.trunc() as i64,
            r0.trunc() as i64,
            summary.peak_time,
            summary.peak_value.trunc() as i64,
        ),
        ModelParameters::RumorRateRatio { .. } => {
            format!("Peak infected: {:.2}", summary.peak_value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelKind, Summary};

    fn result_with(model: ModelKind, states: Vec<Vec<f64>>, summary: Summary) -> SimulationResult {
        SimulationResult {
            model,
            labels: Vec::new(),
            times: (0..states.len()).map(|t| t as f64).collect(),
            states,
            summary,
        }
    }

    fn summary(peak_value: f64, peak_time: f64, r_effective: Option<f64>) -> Summary {
        Summary {
            peak_compartment_index: 1,
            peak_value,
            peak_time,
            r_effective,
            inflection_time: None,
        }
    }

    #[test]
    fn sir_text_reports_r0_and_integer_peak() {
        let params = ModelParameters::Sir {
            n: 1000.0,
            beta: 0.3,
            gamma: 0.1,
            i0: 1.0,
            t_max: 100.0,
        };
        let result = result_with(
            ModelKind::Sir,
            vec![vec![999.0, 1.0, 0.0]],
            summary(301.7, 37.0, Some(3.0)),
        );
        let text = describe(&params, &result);
        assert!(text.contains("R₀ ≈ 3.00"), "{text}");
        assert!(text.contains("about 301 people around day 37"), "{text}");
        assert!(!text.contains("exposed"));
    }

    #[test]
    fn seir_text_mentions_the_exposed_phase() {
        let params = ModelParameters::Seir {
            n: 1000.0,
            beta: 0.3,
            sigma: 0.2,
            gamma: 0.1,
            e0: 0.0,
            i0: 1.0,
            t_max: 160.0,
        };
        let result = result_with(
            ModelKind::Seir,
            vec![vec![999.0, 0.0, 1.0, 0.0]],
            summary(180.2, 71.0, None),
        );
        let text = describe(&params, &result);
        assert!(text.contains("undefined"));
        assert!(text.contains("exposed phase (E)"));
    }

    #[test]
    fn growth_texts_follow_the_sign_of_r() {
        let decaying = ModelParameters::Exponential {
            p0: 100.0,
            r: -0.5,
            t_max: 10.0,
        };
        let result = result_with(
            ModelKind::Exponential,
            vec![vec![100.0], vec![0.67]],
            summary(100.0, 0.0, None),
        );
        let text = describe(&decaying, &result);
        assert!(text.contains("decays"));
        assert!(text.ends_with("P(10.00) ≈ 0.67."), "{text}");
    }

    #[test]
    fn rumor_texts() {
        let mass_action = ModelParameters::RumorMassAction {
            n: 275.0,
            b: 0.004,
            k: 0.01,
            s0: 266.0,
            i0: 1.0,
            r0: 8.0,
            t_max: 15.0,
        };
        let result = result_with(
            ModelKind::RumorMassAction,
            vec![vec![266.0, 1.0, 8.0]],
            summary(252.9, 5.23, Some(110.0)),
        );
        let text = describe(&mass_action, &result);
        assert!(text.starts_with("A group of 275 people"));
        assert!(text.contains("day 5.2 with about 252 people"), "{text}");

        let ratio = ModelParameters::RumorRateRatio {
            s0: 99.0,
            i0: 1.0,
            r0: 0.0,
            beta: 0.002,
            gamma: 0.05,
            t_max: 60.0,
        };
        assert_eq!(describe(&ratio, &result), "Peak infected: 252.90");
    }
}
