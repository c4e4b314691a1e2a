use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Lantern".to_string(), width: 1280, height: 720, vsync: true, fullscreen: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "ShadowConfig::default_cascade_count")]
    pub cascade_count: u32,
    #[serde(default = "ShadowConfig::default_shadow_size")]
    pub shadow_size: u32,
    #[serde(default = "ShadowConfig::default_blur_kernel_size")]
    pub blur_kernel_size: u32,
    #[serde(default = "ShadowConfig::default_depth_bias")]
    pub depth_bias: f32,
}

impl ShadowConfig {
    const fn default_cascade_count() -> u32 {
        4
    }

    const fn default_shadow_size() -> u32 {
        1024
    }

    const fn default_blur_kernel_size() -> u32 {
        5
    }

    fn default_depth_bias() -> f32 {
        0.002
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            cascade_count: Self::default_cascade_count(),
            shadow_size: Self::default_shadow_size(),
            blur_kernel_size: Self::default_blur_kernel_size(),
            depth_bias: Self::default_depth_bias(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "LightingConfig::default_point_light_count")]
    pub point_light_count: u32,
    #[serde(default = "LightingConfig::default_light_radius")]
    pub light_radius: f32,
    #[serde(default = "LightingConfig::default_seed")]
    pub seed: u64,
}

impl LightingConfig {
    const fn default_point_light_count() -> u32 {
        128
    }

    fn default_light_radius() -> f32 {
        9.0
    }

    const fn default_seed() -> u64 {
        0x4c414e54
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            point_light_count: Self::default_point_light_count(),
            light_radius: Self::default_light_radius(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("config load error: {err:?}; falling back to defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.shadow.cascade_count, 4);
        assert!(cfg.shadow.shadow_size.is_power_of_two());
        assert_eq!(cfg.shadow.blur_kernel_size % 2, 1);
    }

    #[test]
    fn partial_config_fills_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{\"shadow\": {{\"cascade_count\": 6}}}}").expect("write");
        let cfg = AppConfig::load(file.path()).expect("load");
        assert_eq!(cfg.shadow.cascade_count, 6);
        assert_eq!(cfg.shadow.shadow_size, ShadowConfig::default_shadow_size());
        assert_eq!(cfg.window.width, 1280);
    }

    #[test]
    fn malformed_config_falls_back() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        let cfg = AppConfig::load_or_default(file.path());
        assert_eq!(cfg.shadow.cascade_count, 4);
    }
}
