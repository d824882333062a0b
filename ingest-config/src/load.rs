use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Supported extensions for base and environment configuration files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

const LIST_SEPARATOR: &str = ",";

/// Trait implemented by configuration structures that can be loaded.
pub trait Config {
    /// Keys whose values are parsed as comma-separated lists when read from the environment.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

#[derive(Debug, Clone, Copy)]
enum ConfigFileKind {
    Base,
    Environment(Environment),
}

impl ConfigFileKind {
    fn stem(&self) -> Cow<'static, str> {
        match self {
            ConfigFileKind::Base => Cow::Borrowed("base"),
            ConfigFileKind::Environment(env) => Cow::Owned(env.to_string()),
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::Base => f.write_str("base configuration"),
            ConfigFileKind::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// A configuration file existed but could not be parsed.
    #[error("failed to load {kind_description} from `{path}`: {source}")]
    ConfigurationFileLoad {
        kind_description: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    /// The merged sources could not be built into a configuration.
    #[error("failed to build configuration: {0}")]
    Builder(#[source] config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads hierarchical configuration for the current environment.
///
/// Reads `configuration/base.(yaml|yml|json)` and `configuration/{environment}.(yaml|yml|json)`
/// from the working directory, then applies `APP_`-prefixed environment variables. Nested keys
/// use double underscores (`APP_GATEWAY__PORT`). Files that don't exist are skipped, so a
/// configuration type with defaults for every field loads without any file.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load()?;

    load_config_from_dir(&base_path.join(CONFIGURATION_DIR), environment)
}

/// Loads configuration from `directory` for `environment`, applying environment variables.
pub fn load_config_from_dir<T>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    load(directory, environment, None)
}

fn load<T>(
    directory: &Path,
    environment: Environment,
    variables: Option<config::Map<String, String>>,
) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let mut builder = config::Config::builder();

    for kind in [ConfigFileKind::Base, ConfigFileKind::Environment(environment)] {
        if let Some(path) = find_configuration_file(directory, kind) {
            builder = builder.add_source(config::File::from(path.clone()));
            validate_configuration_source(&builder, kind, &path)?;
        }
    }

    let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .source(variables);

    if !T::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source.list_separator(LIST_SEPARATOR);

        for key in T::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

/// Returns the first existing file for `kind` among the supported extensions.
fn find_configuration_file(directory: &Path, kind: ConfigFileKind) -> Option<PathBuf> {
    let stem = kind.stem();

    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
}

fn validate_configuration_source(
    builder: &ConfigBuilder<DefaultState>,
    kind: ConfigFileKind,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            kind_description: kind.to_string(),
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::shared::{IngestConfig, PersistenceConfig};

    fn config_dir(test_name: &str) -> PathBuf {
        let directory = std::env::temp_dir().join(format!(
            "ingest-config-{test_name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&directory);
        fs::create_dir_all(&directory).unwrap();
        directory
    }

    fn variables(entries: &[(&str, &str)]) -> config::Map<String, String> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_directory_yields_defaults() {
        let directory = std::env::temp_dir().join("ingest-config-does-not-exist");

        let config: IngestConfig = load(&directory, Environment::Dev, Some(variables(&[]))).unwrap();

        assert_eq!(config.pipeline.agg_cache_size, 25_000);
        assert_eq!(config.gateway.port, 50_000);
        assert!(matches!(
            config.persistence,
            PersistenceConfig::Postgres {
                connection: None,
                ..
            }
        ));
    }

    #[test]
    fn test_environment_file_overrides_base_and_variables_override_files() {
        let directory = config_dir("layering");
        fs::write(
            directory.join("base.yaml"),
            "pipeline:\n  workers: 2\n  savers: 2\n  agg_cache_size: 10\ngateway:\n  port: 6000\n",
        )
        .unwrap();
        fs::write(
            directory.join("prod.json"),
            r#"{"pipeline": {"workers": 8}, "persistence": {"kind": "noop"}}"#,
        )
        .unwrap();

        let config: IngestConfig = load(
            &directory,
            Environment::Prod,
            Some(variables(&[
                ("APP_GATEWAY__PORT", "7000"),
                ("APP_EXTRACTION__SKIP_LABELS", "DATE,TIME"),
            ])),
        )
        .unwrap();

        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.savers, 2);
        assert_eq!(config.pipeline.agg_cache_size, 10);
        assert_eq!(config.gateway.port, 7000);
        assert!(matches!(config.persistence, PersistenceConfig::Noop));
        assert_eq!(config.extraction.skip_labels, vec!["DATE", "TIME"]);

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let directory = config_dir("malformed");
        fs::write(directory.join("base.yaml"), "pipeline: [unclosed").unwrap();

        let err = load::<IngestConfig>(&directory, Environment::Dev, Some(variables(&[])))
            .unwrap_err();

        assert!(matches!(err, LoadConfigError::ConfigurationFileLoad { .. }));

        fs::remove_dir_all(directory).unwrap();
    }
}
