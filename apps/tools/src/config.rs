use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use storage::STORAGE_KEY;

pub const DEFAULT_CONFIG_FILE: &str = "gigfund.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub storage_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            storage_key: STORAGE_KEY.into(),
        }
    }
}

/// Defaults, then the config file, then environment variables. Command-line
/// flags are applied on top by the caller.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("ignoring unparsable config file");
        return;
    };
    if let Some(v) = file_cfg.get("data_dir") {
        settings.data_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("storage_key") {
        settings.storage_key = v.clone();
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("GIGFUND_DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }
    if let Some(v) = var("APP__DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }

    if let Some(v) = var("GIGFUND_STORAGE_KEY") {
        settings.storage_key = v;
    }
    if let Some(v) = var("APP__STORAGE_KEY") {
        settings.storage_key = v;
    }
}
