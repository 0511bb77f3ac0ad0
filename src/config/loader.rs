//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line settings that take precedence over the file on every load,
/// including reloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub port: Option<u16>,
    pub static_root: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(root) = &self.static_root {
            config.static_files.root = Some(root.clone());
        }
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    load_effective_config(Some(path), &Overrides::default())
}

/// The configuration the gateway runs with: the file (or defaults when
/// `path` is `None`) with `overrides` applied, validated as a whole.
///
/// Startup and every reload path go through here so overrides survive reloads.
pub fn load_effective_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = parse_config("[[routes]\npath = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(content: &str) -> Self {
            let path = std::env::temp_dir().join(format!("spa-gateway-{}.toml", uuid::Uuid::new_v4()));
            fs::write(&path, content).unwrap();
            Self(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = TempFile::new(
            r#"
            [listener]
            port = 9000

            [static_files]
            root = "/srv/from-file"
        "#,
        );
        let overrides = Overrides {
            port: Some(8088),
            static_root: Some(PathBuf::from("/srv/dist")),
        };

        let config = load_effective_config(Some(&file.0), &overrides).unwrap();
        assert_eq!(config.listener.port, 8088);
        assert_eq!(config.static_files.root, Some(PathBuf::from("/srv/dist")));

        let plain = load_config(&file.0).unwrap();
        assert_eq!(plain.listener.port, 9000);
    }

    #[test]
    fn override_can_repair_invalid_file_value() {
        let file = TempFile::new("[listener]\nport = 0\n");
        assert!(load_config(&file.0).is_err());

        let overrides = Overrides {
            port: Some(8080),
            ..Overrides::default()
        };
        let config = load_effective_config(Some(&file.0), &overrides).unwrap();
        assert_eq!(config.listener.port, 8080);
    }

    #[test]
    fn no_file_means_defaults_plus_overrides() {
        let overrides = Overrides {
            static_root: Some(PathBuf::from("./dist")),
            ..Overrides::default()
        };
        let config = load_effective_config(None, &overrides).unwrap();
        assert_eq!(config.listener, GatewayConfig::default().listener);
        assert_eq!(config.static_files.root, Some(PathBuf::from("./dist")));
    }

    #[test]
    fn validation_errors_are_joined() {
        let doc = r#"
            [[routes]]
            path = "/api/"
            upstream = "nowhere"

            [[routes]]
            path = "/api/"
        "#;

        let err = parse_config(doc).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("declared more than once"));
        assert!(message.contains("unknown upstream 'nowhere'"));
    }
}
