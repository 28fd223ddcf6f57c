use std::path::{Path, PathBuf};

use awp_core::{KeyObject, PinCredential, RsaCrtKey, StaticProfile};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

/// Default configuration file, looked up in the working directory
pub(crate) const DEFAULT_CONFIG: &str = "awp.toml";

/// Personalization run configuration
#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct Config {
    /// File layout and PIN policies
    #[serde(default = "StaticProfile::oberthur_default")]
    pub(crate) profile: StaticProfile,
    /// Token label, overriding the profile label
    #[serde(default)]
    pub(crate) label: Option<String>,
    /// PINs to provision
    #[serde(default)]
    pub(crate) pins: Vec<PinConfig>,
    /// Keys to create
    #[serde(default)]
    pub(crate) keys: Vec<KeyConfig>,
}

/// A PIN to provision
#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct PinConfig {
    #[serde(flatten)]
    pub(crate) credential: PinCredential,
    /// PIN value
    pub(crate) value: String,
    /// PUK value
    #[serde(default)]
    pub(crate) puk: Option<String>,
}

/// A key to create, then either import or generate on the card
#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct KeyConfig {
    #[serde(flatten)]
    pub(crate) object: KeyObject,
    /// Key material to import; the card generates the key when absent
    #[serde(default)]
    pub(crate) import: Option<RsaCrtKey>,
}

impl Config {
    /// Load `path`, or [`DEFAULT_CONFIG`], with the label overridable by `AWP_LABEL`
    pub(crate) fn load(path: Option<&Path>) -> eyre::Result<Self> {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG), Path::to_path_buf);
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed("AWP_").only(&["label"])),
        )
    }

    fn from_figment(figment: Figment) -> eyre::Result<Self> {
        Ok(figment.extract()?)
    }

    /// Profile with the configured label applied
    pub(crate) fn profile(&self) -> StaticProfile {
        let mut profile = self.profile.clone();
        if let Some(label) = &self.label {
            profile.label = Some(label.clone());
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awp_core::Profile;
    use awp_core::profile::names;

    fn parse(toml: &str) -> Config {
        Config::from_figment(Figment::new().merge(Toml::string(toml))).unwrap()
    }

    #[test]
    fn test_defaults_to_stock_profile() {
        let config = parse("");
        assert_eq!(config.profile, StaticProfile::oberthur_default());
        assert!(config.pins.is_empty());
        assert!(config.keys.is_empty());
    }

    #[test]
    fn test_load_pins_and_keys() {
        let config = parse(
            r#"
            label = "Staff card"

            [[pins]]
            label = "User PIN"
            flags = ["local", "initialized"]
            value = "1234"

            [[keys]]
            id = "45"
            type = "private-rsa"
            modulus_bits = 1024
            path = "3F00501190023001"
            key_reference = 1
            "#,
        );

        assert_eq!(config.pins.len(), 1);
        assert!(config.pins[0].credential.is_local());
        assert_eq!(config.pins[0].value, "1234");
        assert_eq!(config.pins[0].puk, None);
        assert_eq!(config.keys[0].object.modulus_bits, 1024);
        assert_eq!(config.keys[0].object.key_reference, 1);
        assert!(config.keys[0].import.is_none());

        let profile = config.profile();
        assert_eq!(profile.label(), Some("Staff card"));
        assert!(profile.file(names::TEMPLATE_PRIVATE_KEY).is_some());
    }
}
