use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use serde::de::DeserializeOwned;
use std::path::Path;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Builds the layered configuration
///
/// Priority, lowest to highest: embedded defaults, user config, repository
/// config (or only the file passed with `--config`), `BATCHCONV_*`
/// environment variables, CLI overrides. CLI lists are appended to the
/// configured ones rather than replacing them.
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    pub fn new(custom_config: Option<&str>, overrides: Option<serde_json::Value>) -> Self {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            tracing::debug!("Loading custom config: {}", custom_path);
            figment = merge_file(figment, Path::new(custom_path));
        } else {
            let user_config = Self::user_config_dir();
            for name in ["config.toml", "config.json", "config.yaml", "config.yml"] {
                figment = merge_file(figment, &Path::new(&user_config).join(name));
            }
            for name in ["batchconv.toml", "batchconv.json", "batchconv.yaml", "batchconv.yml"] {
                figment = merge_file(figment, Path::new(name));
            }
        }

        // BATCHCONV_PARALLEL__STRATEGY=static -> parallel.strategy
        figment = figment.merge(Env::prefixed("BATCHCONV_").split("__"));

        // Scalars replace, lists such as `exclude` extend the file's list
        if let Some(overrides) = overrides {
            figment = figment.admerge(Serialized::defaults(overrides));
        }

        Self { figment }
    }

    /// Extract the merged configuration into a typed structure
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        self.figment
            .extract()
            .context("Failed to load configuration")
    }

    fn user_config_dir() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/batchconv"),
            Err(_) => "~/.config/batchconv".to_string(),
        }
    }
}

/// Merge a config file, choosing the provider from its extension
fn merge_file(figment: Figment, path: &Path) -> Figment {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" => figment.merge(Json::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
