use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "m3georef.yaml";

/// Viewer tuning knobs, loaded from `m3georef.yaml` next to the binary when
/// present. Missing fields fall back to their defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Quantile of finite samples used for the initial low display level.
    pub low_quantile: f32,
    /// Quantile of finite samples used for the initial high display level.
    pub high_quantile: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub marker_radius: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            low_quantile: 0.05,
            high_quantile: 0.95,
            min_zoom: 0.2,
            max_zoom: 50.0,
            marker_radius: 5.0,
        }
    }
}

impl ViewerConfig {
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    fn load() -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(CONFIG_PATH)?;
        Ok(serde_yml::from_str(&text)?)
    }
}
