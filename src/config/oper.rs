//! Operator block configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct OperBlock {
    pub name: String,
    /// Plaintext or `$argon2...` hash; see `crate::security::verify_oper_password`.
    pub password: String,
    pub hostmask: Option<String>,
    #[serde(default)]
    pub require_tls: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_block() {
        let toml = r#"
            name = "root"
            password = "hunter2"
        "#;
        let block: OperBlock = toml::from_str(toml).unwrap();
        assert_eq!(block.name, "root");
        assert!(!block.require_tls);
    }
}
