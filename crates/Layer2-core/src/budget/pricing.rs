//! Model price table (USD per 1K tokens)

/// 표에 없는 모델의 단가 (gpt-4-turbo 수준)
pub const DEFAULT_RATE_PER_1K: f64 = 0.01;

const MODEL_RATES: &[(&str, f64)] = &[
    ("gpt-4", 0.03),
    ("gpt-4-turbo", 0.01),
    ("gpt-3.5-turbo", 0.0015),
    ("text-embedding-ada-002", 0.0001),
];

/// Map a model name onto its price-table entry.
///
/// Dated snapshots (`gpt-4-turbo-2024-04-09`, `gpt-4-0613`) resolve to the
/// longest table prefix followed by `-<digit>`.
pub fn normalize_model(model: &str) -> Option<&'static str> {
    if let Some((name, _)) = MODEL_RATES.iter().find(|(name, _)| *name == model) {
        return Some(*name);
    }

    MODEL_RATES
        .iter()
        .filter(|(name, _)| {
            model
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .max_by_key(|(name, _)| name.len())
        .map(|(name, _)| *name)
}

pub fn rate_per_1k(model: &str) -> f64 {
    normalize_model(model)
        .and_then(|name| MODEL_RATES.iter().find(|(n, _)| *n == name))
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_RATE_PER_1K)
}

pub fn calculate_cost(tokens: u64, model: &str) -> f64 {
    tokens as f64 / 1000.0 * rate_per_1k(model)
}
