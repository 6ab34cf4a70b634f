//! # Editor configuration
//!
//! All tunables of the editor in one serializable structure, loaded from TOML.
//! Every section and key is optional and falls back to its default.

use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Rgb;
use crate::lighting::{DirectionalLight, Lighting};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Placement of newly added objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Initial uniform scale
    pub scale: f32,
    /// Translation components are random integers in `[-range, range]`
    pub translation_range: i32,
    /// Initial Y rotation velocity is drawn from `[min, max)` radians per frame
    pub rotation_speed_min: f32,
    pub rotation_speed_max: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            scale: 0.1,
            translation_range: 8,
            rotation_speed_min: 0.01,
            rotation_speed_max: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: Rgb,
    pub directional_enabled: bool,
    pub directional_color: Rgb,
    pub directional_direction: [f32; 3],
}

impl LightingConfig {
    pub fn to_lighting(&self) -> Lighting {
        Lighting {
            ambient: self.ambient,
            directional: self.directional_enabled.then(|| {
                DirectionalLight::new(
                    self.directional_color,
                    Vector3::from(self.directional_direction),
                )
            }),
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        let lighting = Lighting::default();
        let sun = lighting.directional.unwrap_or(DirectionalLight::new(
            [0.0; 3],
            Vector3::new(0.0, 0.0, -1.0),
        ));
        Self {
            ambient: lighting.ambient,
            directional_enabled: lighting.directional.is_some(),
            directional_color: sun.color,
            directional_direction: sun.direction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub clear_color: Rgb,
    pub target_fps: u32,
    /// Rescale loaded meshes so their largest extent is `model_extent`
    pub normalize_models: bool,
    pub model_extent: f32,
    /// Color of models that have no texture coordinates
    pub model_color: Rgb,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [1.0, 1.0, 1.0],
            target_fps: 30,
            normalize_models: true,
            model_extent: 2.0,
            model_color: [0.7, 0.7, 0.7],
        }
    }
}

/// Step sizes for keyboard and mouse-wheel nudges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub translate_step: f32,
    pub scale_step: f32,
    pub rotate_step: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            translate_step: 0.5,
            scale_step: 0.01,
            rotate_step: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `<name>.obj` models and their `<name>.png` textures
    pub models_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("assets"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub spawn: SpawnConfig,
    pub lighting: LightingConfig,
    pub render: RenderConfig,
    pub input: InputConfig,
    pub assets: AssetConfig,
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_string()));

        if !(self.spawn.scale.is_finite() && self.spawn.scale > 0.0) {
            return invalid("spawn.scale must be positive");
        }
        if self.spawn.translation_range < 0 {
            return invalid("spawn.translation_range must not be negative");
        }
        if !(self.spawn.rotation_speed_min < self.spawn.rotation_speed_max) {
            return invalid("spawn.rotation_speed_min must be below rotation_speed_max");
        }
        if self.render.target_fps == 0 {
            return invalid("render.target_fps must be positive");
        }
        if !(self.render.model_extent > 0.0) {
            return invalid("render.model_extent must be positive");
        }
        let steps = [
            self.input.translate_step,
            self.input.scale_step,
            self.input.rotate_step,
        ];
        if steps.iter().any(|step| !(*step > 0.0)) {
            return invalid("input steps must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spawn.scale, 0.1);
        assert_eq!(config.spawn.translation_range, 8);
        assert_eq!(config.lighting.to_lighting(), Lighting::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            [spawn]
            scale = 0.25

            [lighting]
            directional_enabled = false

            [assets]
            models_dir = "models"
            "#,
        )
        .unwrap();

        assert_eq!(config.spawn.scale, 0.25);
        assert_eq!(config.spawn.rotation_speed_max, 0.1);
        assert!(config.lighting.to_lighting().directional.is_none());
        assert_eq!(config.assets.models_dir, PathBuf::from("models"));
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EditorConfig::from_toml_str("[spawn]\nscale = 0.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml_str("[spawn]\nrotation_speed_min = 0.5\nrotation_speed_max = 0.1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml_str("[render]\ntarget_fps = \"fast\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            EditorConfig::load(Path::new("/nonexistent/canvas3d.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
