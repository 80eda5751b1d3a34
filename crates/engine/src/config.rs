use serde::Deserialize;

use crate::error::EngineError;

/// Calibration thresholds for comparison and validation.
///
/// All knobs default to the values the field registry and rules were
/// calibrated against; a TOML file can override them per deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Average pairwise similarity above which differing text values still
    /// count as consistent.
    #[serde(default = "default_text_similarity")]
    pub text_similarity_threshold: f64,
    /// Shipper/consignee name similarity below which a relationship issue
    /// is raised.
    #[serde(default = "default_entity_similarity")]
    pub entity_similarity_threshold: f64,
    /// Upper bound on the duty/invoice ratio considered plausible.
    #[serde(default = "default_max_duty_ratio")]
    pub max_duty_ratio: f64,
    /// Consistency score at or above which the shipment is ready to process.
    #[serde(default = "default_ready_score")]
    pub ready_score: f64,
    /// Consistency score at or above which only flagged items need review.
    #[serde(default = "default_review_score")]
    pub review_score: f64,
}

fn default_text_similarity() -> f64 {
    0.8
}

fn default_entity_similarity() -> f64 {
    0.8
}

fn default_max_duty_ratio() -> f64 {
    0.5
}

fn default_ready_score() -> f64 {
    0.9
}

fn default_review_score() -> f64 {
    0.7
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_similarity_threshold: default_text_similarity(),
            entity_similarity_threshold: default_entity_similarity(),
            max_duty_ratio: default_max_duty_ratio(),
            ready_score: default_ready_score(),
            review_score: default_review_score(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, v) in [
            ("text_similarity_threshold", self.text_similarity_threshold),
            ("entity_similarity_threshold", self.entity_similarity_threshold),
            ("ready_score", self.ready_score),
            ("review_score", self.review_score),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(EngineError::ConfigValidation(format!(
                    "{name} must be within [0, 1], got {v}"
                )));
            }
        }

        if self.max_duty_ratio <= 0.0 {
            return Err(EngineError::ConfigValidation(format!(
                "max_duty_ratio must be positive, got {}",
                self.max_duty_ratio
            )));
        }

        if self.review_score > self.ready_score {
            return Err(EngineError::ConfigValidation(format!(
                "review_score ({}) must not exceed ready_score ({})",
                self.review_score, self.ready_score
            )));
        }

        Ok(())
    }
}
