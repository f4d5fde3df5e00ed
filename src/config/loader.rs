//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HookAction, PortValue, PostFilterConfig, PreFilterConfig};

    const SAMPLE: &str = r#"
default_vhost = "example.org"

[listener]
port = 80
bind = ["192.168.1.100", "127.0.0.1"]

[filters]
pre = { kind = "collapse-slashes" }
post = { kind = "append-server", token = "edge" }

[[vhost]]
pattern = "example.com"
host = "127.0.0.1"
port = "8080"

[[vhost]]
pattern = "www.example.com"

  [[vhost.rule]]
  pattern = "^/(.*)"
  replacement = "http://example.com/$1"

[[vhost]]
pattern = "example.org"
port = 9090

  [[vhost.function]]
  pattern = "/private"
  action = { kind = "allow", addresses = ["1.2.3.4", "2.3.4.5"] }

  [[vhost.function]]
  pattern = "^/$"
  action = { kind = "respond", content_type = "text/html", body = "<p>index</p>" }
"#;

    #[test]
    fn parses_full_sample() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.listener.port, 80);
        assert_eq!(config.listener.bind.len(), 2);
        assert_eq!(config.default_vhost.as_deref(), Some("example.org"));
        assert_eq!(config.filters.pre, Some(PreFilterConfig::CollapseSlashes));
        assert_eq!(
            config.filters.post,
            Some(PostFilterConfig::AppendServer { token: "edge".into() })
        );

        let patterns: Vec<_> = config.vhosts.iter().map(|v| v.pattern.as_str()).collect();
        assert_eq!(patterns, ["example.com", "www.example.com", "example.org"]);

        assert_eq!(config.vhosts[0].port, Some(PortValue::Text("8080".into())));
        assert_eq!(config.vhosts[1].port, None);
        assert_eq!(config.vhosts[1].rules[0].replacement, "http://example.com/$1");
        assert_eq!(config.vhosts[2].port, Some(PortValue::Number(9090)));

        let functions = &config.vhosts[2].functions;
        assert_eq!(functions.len(), 2);
        assert!(matches!(&functions[0].action, HookAction::Allow { addresses } if addresses.len() == 2));
        assert!(matches!(&functions[1].action, HookAction::Respond { status: 200, .. }));
    }

    #[test]
    fn reports_validation_failures() {
        let err = parse_config("[listener]\nbind = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("no bind addresses"));
    }

    #[test]
    fn reports_parse_failures() {
        let err = parse_config("[[vhost]]\nport = 80\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bundled_example_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("rewrites.example.toml");
        let config = load_config(&path).unwrap();
        let routes =
            crate::routing::RouteTable::compile(&config.vhosts, config.default_vhost.as_deref())
                .unwrap();

        assert_eq!(routes.vhosts().len(), 3);
        assert_eq!(routes.resolve("unknown.test").unwrap().key(), "example\\.org");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/vhost-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
