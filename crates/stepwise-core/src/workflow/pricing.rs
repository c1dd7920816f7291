//! Cost accounting for model calls.
//!
//! Rates are USD per 1000 tokens. User overrides from `config.toml` are
//! checked first, then the built-in table; an unrecognized model falls back
//! to the default rates and never errors.

use stepwise_types::config::ModelPricing;
use stepwise_types::llm::Usage;
use stepwise_types::workflow::ModelName;

/// Rates applied to models absent from every table.
pub const DEFAULT_PROMPT_RATE: f64 = 0.001;
pub const DEFAULT_COMPLETION_RATE: f64 = 0.002;

/// (prompt, completion) rate per 1000 tokens for a built-in model.
fn builtin_rates(model: ModelName) -> (f64, f64) {
    match model {
        ModelName::KimiK2Instruct => (0.001, 0.002),
        ModelName::KimiK2p5 => (0.002, 0.004),
    }
}

/// Pricing lookup with optional user overrides.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    overrides: Vec<ModelPricing>,
}

impl RateTable {
    pub fn new(overrides: Vec<ModelPricing>) -> Self {
        Self { overrides }
    }

    /// (prompt, completion) rate for `model`.
    ///
    /// Override patterns are matched as prefixes of the model identifier, so
    /// `"kimi-k2"` covers every Kimi K2 variant.
    pub fn rates(&self, model: ModelName) -> (f64, f64) {
        self.overrides
            .iter()
            .find(|p| model.as_str().starts_with(&p.model_pattern))
            .map(|p| (p.prompt_rate_per_1k, p.completion_rate_per_1k))
            .unwrap_or_else(|| builtin_rates(model))
    }

    /// Rates for a raw model identifier, falling back to the defaults.
    pub fn rates_for_id(&self, model: &str) -> (f64, f64) {
        if let Some(p) = self.overrides.iter().find(|p| model.starts_with(&p.model_pattern)) {
            return (p.prompt_rate_per_1k, p.completion_rate_per_1k);
        }
        model
            .parse::<ModelName>()
            .map(builtin_rates)
            .unwrap_or((DEFAULT_PROMPT_RATE, DEFAULT_COMPLETION_RATE))
    }

    /// Cost in USD of one call.
    pub fn cost(&self, model: ModelName, usage: Usage) -> f64 {
        let (prompt_rate, completion_rate) = self.rates(model);
        compute_cost(usage, prompt_rate, completion_rate)
    }
}

/// Cost in USD given token counts and per-1000 rates.
pub fn compute_cost(usage: Usage, prompt_rate: f64, completion_rate: f64) -> f64 {
    let prompt_cost = (f64::from(usage.prompt_tokens) / 1000.0) * prompt_rate;
    let completion_cost = (f64::from(usage.completion_tokens) / 1000.0) * completion_rate;
    prompt_cost + completion_cost
}

/// Format a cost as a human-readable estimate.
///
/// - Costs below $0.01 use 6 decimal places: `~$0.000350`
/// - Costs $0.01 and above use 4 decimal places: `~$0.1200`
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("~${cost:.6}")
    } else {
        format!("~${cost:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> Usage {
        Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    #[test]
    fn builtin_rates_per_model() {
        let table = RateTable::default();
        let instruct = table.cost(ModelName::KimiK2Instruct, usage(1000, 1000));
        assert!((instruct - 0.003).abs() < 1e-12, "got {instruct}");
        let k2p5 = table.cost(ModelName::KimiK2p5, usage(1000, 1000));
        assert!((k2p5 - 0.006).abs() < 1e-12, "got {k2p5}");
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(RateTable::default().cost(ModelName::KimiK2p5, Usage::default()), 0.0);
    }

    #[test]
    fn unknown_identifier_uses_default_rates() {
        let table = RateTable::default();
        assert_eq!(
            table.rates_for_id("mystery-model"),
            (DEFAULT_PROMPT_RATE, DEFAULT_COMPLETION_RATE)
        );
        assert_eq!(table.rates_for_id("kimi-k2p5"), (0.002, 0.004));
    }

    #[test]
    fn override_matches_by_prefix_before_builtin() {
        let table = RateTable::new(vec![ModelPricing {
            model_pattern: "kimi-k2p".to_string(),
            prompt_rate_per_1k: 0.01,
            completion_rate_per_1k: 0.02,
        }]);
        assert_eq!(table.rates(ModelName::KimiK2p5), (0.01, 0.02));
        assert_eq!(table.rates(ModelName::KimiK2Instruct), (0.001, 0.002));
    }

    #[test]
    fn format_cost_precision() {
        assert_eq!(format_cost(0.00035), "~$0.000350");
        assert_eq!(format_cost(0.12), "~$0.1200");
    }
}
