//! Configuration for the smoke system.

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmokeError};

/// Smoke simulation settings.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// Voxel edge length.
    pub voxel_size: f32,

    /// Half size of the floor along X.
    pub half_extent_x: f32,

    /// Height of the grid above the floor.
    pub extent_y: f32,

    /// Half size of the floor along Z.
    pub half_extent_z: f32,

    /// Growth rate passed to the growth kernel.
    pub growth_speed: f32,

    /// Seconds between clear-all dispatches.
    pub dissipation_interval: f32,

    /// Whether a new grow request is honored while smoke is on screen.
    pub allow_multiple_smokes: bool,

    /// Radius of the probe sphere used when baking occupancy.
    pub probe_radius: f32,

    /// Stop carving at the end of the shot segment instead of the far wall.
    pub clamp_to_segment: bool,

    /// Offset from the floor anchor to the initial smoke source.
    pub source_offset: Vec3,

    /// Raymarch compositing settings.
    pub raymarch: RaymarchSettings,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.5,
            half_extent_x: 5.0,
            extent_y: 8.0,
            half_extent_z: 5.0,
            growth_speed: 10.0,
            dissipation_interval: 2.0,
            allow_multiple_smokes: false,
            probe_radius: 0.1,
            clamp_to_segment: false,
            source_offset: Vec3::new(0.0, 1.0, 0.0),
            raymarch: RaymarchSettings::default(),
        }
    }
}

impl SmokeConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded smoke config from {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        positive("voxel_size", self.voxel_size)?;
        positive("half_extent_x", self.half_extent_x)?;
        positive("extent_y", self.extent_y)?;
        positive("half_extent_z", self.half_extent_z)?;
        positive("dissipation_interval", self.dissipation_interval)?;
        if !(self.growth_speed.is_finite() && self.growth_speed >= 0.0) {
            return Err(SmokeError::invalid(format!(
                "growth_speed must be finite and non-negative, got {}",
                self.growth_speed
            )));
        }
        if !(self.probe_radius.is_finite() && self.probe_radius >= 0.0) {
            return Err(SmokeError::invalid(format!(
                "probe_radius must be finite and non-negative, got {}",
                self.probe_radius
            )));
        }
        if !self.source_offset.is_finite() {
            return Err(SmokeError::invalid("source_offset must be finite"));
        }
        self.raymarch.validate()
    }
}

/// Settings for the raymarch compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaymarchSettings {
    /// Smoke color (RGBA).
    pub smoke_color: Vec4,

    /// March step length in world units.
    pub step_size: f32,

    /// Maximum number of march steps per pixel.
    pub max_steps: u32,

    /// Scale applied to sampled density.
    pub density_falloff: f32,
}

impl Default for RaymarchSettings {
    fn default() -> Self {
        Self {
            smoke_color: Vec4::new(0.5, 0.5, 0.5, 1.0),
            step_size: 0.1,
            max_steps: 128,
            density_falloff: 0.5,
        }
    }
}

impl RaymarchSettings {
    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        positive("raymarch.step_size", self.step_size)?;
        if self.max_steps == 0 {
            return Err(SmokeError::invalid("raymarch.max_steps must be at least 1"));
        }
        if !self.density_falloff.is_finite() {
            return Err(SmokeError::invalid("raymarch.density_falloff must be finite"));
        }
        if !self.smoke_color.is_finite() {
            return Err(SmokeError::invalid("raymarch.smoke_color must be finite"));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SmokeError::invalid(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}
