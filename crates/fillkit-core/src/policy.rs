use fillkit_match::{check_unit, PolicyError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Handling of matches below the confidence threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BelowThreshold {
    /// Leave the field alone.
    Skip,
    /// Queue the field for explicit confirmation.
    #[default]
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Confirm,
    Skip,
}

/// Confidence gate between a match and filling it in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillPolicy {
    threshold: f64,
    below: BelowThreshold,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            below: BelowThreshold::Confirm,
        }
    }
}

impl FillPolicy {
    pub fn new(threshold: f64, below: BelowThreshold) -> Result<Self, PolicyError> {
        let threshold = check_unit("confidence_threshold", threshold)?;
        Ok(Self { threshold, below })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn below_threshold(&self) -> BelowThreshold {
        self.below
    }

    pub fn decide(&self, confidence: f64) -> Decision {
        if confidence >= self.threshold {
            return Decision::Apply;
        }
        match self.below {
            BelowThreshold::Confirm => Decision::Confirm,
            BelowThreshold::Skip => Decision::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let policy = FillPolicy::default();
        assert_eq!(policy.decide(0.8), Decision::Apply);
        assert_eq!(policy.decide(0.79), Decision::Confirm);
        let skipping = FillPolicy::new(0.5, BelowThreshold::Skip).expect("policy");
        assert_eq!(skipping.decide(0.49), Decision::Skip);
        assert_eq!(skipping.decide(0.95), Decision::Apply);
    }

    #[test]
    fn invalid_thresholds_fail_fast() {
        for bad in [f64::NAN, -0.1, 1.01, f64::INFINITY] {
            assert!(matches!(
                FillPolicy::new(bad, BelowThreshold::Confirm),
                Err(PolicyError::OutOfRange { name: "confidence_threshold", .. })
            ));
        }
        assert!(FillPolicy::new(0.0, BelowThreshold::Skip).is_ok());
        assert!(FillPolicy::new(1.0, BelowThreshold::Skip).is_ok());
    }
}
