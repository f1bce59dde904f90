use serde::{Deserialize, Serialize};

/// One pairwise hypothesis test (e.g. a mutation compared against a target gene).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTest {
    pub group_a_label: String,
    pub group_b_label: String,
    /// Raw p-value from the underlying test, expected in [0, 1]
    pub p_value: f64,
    /// Signed mean difference (group A minus group B)
    pub effect_size: f64,
}

impl HypothesisTest {
    pub fn new(
        group_a_label: impl Into<String>,
        group_b_label: impl Into<String>,
        p_value: f64,
        effect_size: f64,
    ) -> Self {
        Self {
            group_a_label: group_a_label.into(),
            group_b_label: group_b_label.into(),
            p_value,
            effect_size,
        }
    }

    /// `"A vs B"` label used in logs and reports
    pub fn pair_label(&self) -> String {
        format!("{} vs {}", self.group_a_label, self.group_b_label)
    }
}

/// Hypothesized sign of a biological effect.
///
/// For synthetic lethality the hypothesis is `Negative`: mutant cell lines
/// show a lower (more essential) dependency score than wild-type lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectDirection {
    #[default]
    Negative,
    Positive,
}

impl EffectDirection {
    /// Whether `effect_size` points strictly in this direction. Zero never matches.
    pub fn matches(&self, effect_size: f64) -> bool {
        match self {
            EffectDirection::Negative => effect_size < 0.0,
            EffectDirection::Positive => effect_size > 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectDirection::Negative => "negative",
            EffectDirection::Positive => "positive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "negative" | "neg" | "-" => Some(EffectDirection::Negative),
            "positive" | "pos" | "+" => Some(EffectDirection::Positive),
            _ => None,
        }
    }
}
