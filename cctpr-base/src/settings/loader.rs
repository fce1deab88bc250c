//! Load a settings object from the config locations.

use std::{
    env,
    fmt::Debug,
    path::{Path, PathBuf},
};

use config::{Config, Environment, File};
use eyre::{eyre, Context, Result};
use serde::de::DeserializeOwned;

/// Directory holding the default config files.
pub const DEFAULT_CONFIG_DIR: &str = "./config";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "CCTPR";

/// Deserialize a settings object from the configs.
pub fn load_settings<T>() -> Result<T>
where
    T: DeserializeOwned + Debug,
{
    load_settings_from(Path::new(DEFAULT_CONFIG_DIR), ENV_PREFIX)
}

/// Deserialize a settings object from the json files in `config_dir`, the
/// files listed in `CONFIG_FILES` and the environment variables starting with
/// `env_prefix`, later sources taking precedence.
pub fn load_settings_from<T>(config_dir: &Path, env_prefix: &str) -> Result<T>
where
    T: DeserializeOwned + Debug,
{
    let mut config_sources = vec![];
    let mut builder = Config::builder();

    let mut default_files = config_dir
        .read_dir()
        .with_context(|| format!("Failed to open config directory {config_dir:?}"))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to list config directory")?;
    // Later files override earlier ones, so make the order deterministic
    default_files.sort();
    for path in default_files {
        if path.is_file() && path.extension() == Some("json".as_ref()) {
            config_sources.push(format!("{path:?}"));
            builder = builder.add_source(File::from(path));
        }
    }

    let config_file_paths: Vec<String> = env::var("CONFIG_FILES")
        .map(|s| s.split(',').map(|s| s.trim().to_owned()).collect())
        .unwrap_or_default();

    for path in config_file_paths.iter().filter(|path| !path.is_empty()) {
        let p = PathBuf::from(path);
        if p.is_file() {
            if p.extension() == Some("json".as_ref()) {
                builder = builder.add_source(File::from(p));
                config_sources.push(path.clone());
            } else {
                return Err(eyre!(
                    "Provided config path via CONFIG_FILES is of an unsupported type ({p:?})"
                ));
            }
        } else if !p.exists() {
            return Err(eyre!(
                "Provided config path via CONFIG_FILES does not exist ({p:?})"
            ));
        } else {
            return Err(eyre!(
                "Provided config path via CONFIG_FILES is not a file ({p:?})"
            ));
        }
    }

    let config_deserializer = builder
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("_")
                .try_parsing(true),
        )
        .build()
        .context("Failed to load config sources")?;

    Config::try_deserialize::<T>(config_deserializer).or_else(|err| {
        let mut err = Err(err).context("Config deserialization error");
        for cfg_path in &config_sources {
            err = err.with_context(|| format!("Config loaded: {cfg_path}"));
        }
        err
    })
}
