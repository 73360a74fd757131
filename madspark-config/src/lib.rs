//! Environment-variable configuration (§6) and per-stage temperature
//! presets for the MadSpark pipeline.

pub mod env;
pub mod temperature;

pub use env::{ModelTier, PipelineSettings, ProviderHint, RunMode};
pub use temperature::{TemperatureManager, TemperaturePreset};
