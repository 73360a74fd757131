//! Per-stage temperature management.

use madspark_contracts::{validate_temperature, ValidationError};

/// A named temperature preset (GLOSSARY "Temperature preset").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperaturePreset {
    Conservative,
    Balanced,
    Creative,
    Wild,
}

impl TemperaturePreset {
    pub fn value(self) -> f64 {
        match self {
            TemperaturePreset::Conservative => 0.5,
            TemperaturePreset::Balanced => 0.7,
            TemperaturePreset::Creative => 0.9,
            TemperaturePreset::Wild => 1.2,
        }
    }
}

/// Per-stage temperature overrides, defaulting to a preset's single value
/// unless a specific stage was given its own override.
#[derive(Debug, Clone)]
pub struct TemperatureManager {
    base: f64,
    idea: f64,
    evaluation: f64,
    advocacy: f64,
    skepticism: f64,
}

impl TemperatureManager {
    pub fn from_preset(preset: TemperaturePreset) -> Self {
        let value = preset.value();
        Self {
            base: value,
            idea: value,
            evaluation: value,
            advocacy: value,
            skepticism: value,
        }
    }

    pub fn with_idea(mut self, temperature: f64) -> Result<Self, ValidationError> {
        validate_temperature(temperature)?;
        self.idea = temperature;
        Ok(self)
    }

    pub fn with_evaluation(mut self, temperature: f64) -> Result<Self, ValidationError> {
        validate_temperature(temperature)?;
        self.evaluation = temperature;
        Ok(self)
    }

    pub fn with_advocacy(mut self, temperature: f64) -> Result<Self, ValidationError> {
        validate_temperature(temperature)?;
        self.advocacy = temperature;
        Ok(self)
    }

    pub fn with_skepticism(mut self, temperature: f64) -> Result<Self, ValidationError> {
        validate_temperature(temperature)?;
        self.skepticism = temperature;
        Ok(self)
    }

    pub fn idea(&self) -> f64 {
        self.idea
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }

    pub fn advocacy(&self) -> f64 {
        self.advocacy
    }

    pub fn skepticism(&self) -> f64 {
        self.skepticism
    }

    /// Temperature for pipeline stages with no per-stage override
    /// (Improver, Multi-Dim Eval, Logical Inference) — the preset's base
    /// value, unaffected by `with_idea`/etc.
    pub fn unoverridden_stage(&self) -> f64 {
        self.base
    }

    /// Validates every stage temperature this manager carries, including
    /// ones a caller never overrode.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_temperature(self.base)?;
        validate_temperature(self.idea)?;
        validate_temperature(self.evaluation)?;
        validate_temperature(self.advocacy)?;
        validate_temperature(self.skepticism)?;
        Ok(())
    }
}

impl Default for TemperatureManager {
    fn default() -> Self {
        Self::from_preset(TemperaturePreset::Balanced)
    }
}
