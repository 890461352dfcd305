use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use eyre::WrapErr;
use pointmap_core::{
    map::{ContainerId, TileLayerOptions, ViewOptions},
    resource::bundle::ResourceBundle,
};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../assets/default_config.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub container: String,
    pub listen: SocketAddr,
    pub view: ViewOptions,
    /// `null` disables the base tile layer.
    pub tiles: Option<TileLayerOptions>,
    pub bundle: ResourceBundle,
    /// Load assets from this directory instead of over HTTP.
    pub asset_dir: Option<PathBuf>,
}

impl ViewerConfig {
    pub fn embedded() -> eyre::Result<Self> {
        serde_json::from_str(DEFAULT_CONFIG).wrap_err("embedded default config is invalid")
    }

    /// Load the embedded defaults, overridden key by key with the top-level
    /// keys of the file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let Some(path) = path else {
            return Self::embedded();
        };

        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        Self::from_overrides(&text)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_overrides(text: &str) -> eyre::Result<Self> {
        let mut merged: serde_json::Value = serde_json::from_str(DEFAULT_CONFIG)?;
        let overrides: serde_json::Value = serde_json::from_str(text)?;

        let serde_json::Value::Object(overrides) = overrides else {
            eyre::bail!("config must be a JSON object");
        };
        if let serde_json::Value::Object(merged) = &mut merged {
            merged.extend(overrides);
        }

        Ok(serde_json::from_value(merged)?)
    }

    pub fn container_id(&self) -> ContainerId {
        ContainerId::new(&self.container)
    }
}

#[cfg(test)]
mod tests {
    use pointmap_core::resource::reference::ResourceKind;

    use super::*;

    #[test]
    fn embedded_defaults_match_the_leaflet_bundle() {
        let config = ViewerConfig::embedded().unwrap();

        assert_eq!(config.container, "map");
        assert_eq!(config.view, ViewOptions::default());
        assert_eq!(config.tiles, Some(TileLayerOptions::default()));
        assert_eq!(config.bundle.id(), ResourceBundle::leaflet().id());
        assert_eq!(config.bundle.resources(), ResourceBundle::leaflet().resources());
        assert!(config.asset_dir.is_none());
    }

    #[test]
    fn overrides_replace_top_level_keys() {
        let config = ViewerConfig::from_overrides(
            r#"{"container":"osint-map","tiles":null,"view":{"center":[55.75,37.61],"zoom":9}}"#,
        )
        .unwrap();

        assert_eq!(config.container_id(), ContainerId::new("osint-map"));
        assert!(config.tiles.is_none());
        assert_eq!(config.view.zoom, 9);
        assert_eq!(config.bundle.resources()[0].kind(), ResourceKind::Stylesheet);
    }

    #[test]
    fn non_object_config_is_rejected() {
        assert!(ViewerConfig::from_overrides("[1, 2]").is_err());
    }
}
