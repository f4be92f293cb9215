//! Post-load config sanity checks, run once before `Dispatch` starts.

use super::types::Config;
use crate::error::ConfigError;

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.name.is_empty() {
        return Err(ConfigError::Invalid("server.name must not be empty".into()));
    }
    if config.server.sid.len() != 3 {
        return Err(ConfigError::Invalid("server.sid must be exactly 3 characters".into()));
    }
    if config.listen.is_empty() && config.tls_listen.is_empty() {
        return Err(ConfigError::Invalid("at least one listener is required".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for class in &config.classes {
        if !seen.insert(class.name.clone()) {
            return Err(ConfigError::Invalid(format!("duplicate class name {:?}", class.name)));
        }
    }

    for link in &config.links {
        if link.multi_connect && link.sid.is_none() {
            return Err(ConfigError::Invalid(format!(
                "link {:?} enables multi_connect but has no sid configured",
                link.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::listen::ListenConfig;
    use crate::config::types::{LimitsConfig, LoggingConfig, ServerConfig};

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                name: "irc.example.org".into(),
                sid: "1AB".into(),
                description: "test".into(),
                network_name: None,
                admin_location: None,
                admin_email: None,
            },
            listen: vec![ListenConfig {
                address: "0.0.0.0:6667".parse().unwrap(),
                class: "default".into(),
                server_port: false,
            }],
            tls_listen: vec![],
            classes: vec![],
            links: vec![],
            opers: vec![],
            security: Default::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
            registration_timeout: 60,
            ping_timeout: 120,
        }
    }

    #[test]
    fn accepts_minimal_valid_config() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn rejects_short_sid() {
        let mut c = base_config();
        c.server.sid = "1A".into();
        assert!(validate(&c).is_err());
    }

    #[test]
    fn rejects_no_listeners() {
        let mut c = base_config();
        c.listen.clear();
        assert!(validate(&c).is_err());
    }
}
