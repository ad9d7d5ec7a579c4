use serde::Deserialize;

use crate::error::Error;

/// Options accepted by the plugin (JSON, camelCase) and by
/// [`crate::transform_source`]. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Textual marker written in front of a name or expression.
    pub marker: String,
    /// Identifier prefix the marker is rewritten into before parsing.
    pub prefix: String,
    /// Dotted path of the function that receives the diagnostics.
    pub logger: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker: "#p".to_string(),
            prefix: "__debug_".to_string(),
            logger: "console.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.marker.trim().is_empty() {
            return Err(Error::InvalidConfig("marker must not be empty".into()));
        }
        if !is_ident(&self.prefix) {
            return Err(Error::InvalidConfig(format!(
                "prefix {:?} is not a valid identifier",
                self.prefix
            )));
        }
        if !self.logger.split('.').all(is_ident) {
            return Err(Error::InvalidConfig(format!(
                "logger {:?} is not a dotted identifier path",
                self.logger
            )));
        }
        Ok(())
    }

    /// Text every diagnostic message starts with, e.g. `"#p "`.
    pub fn message_prefix(&self) -> String {
        format!("{} ", self.marker)
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}
