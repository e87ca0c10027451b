//! Aggregate configuration for one codec instance. Every policy knob
//! scattered across `name`, `record`, and `message` is collected here
//! so an embedder has a single `serde`-deserializable value to load
//! from a config file or environment.

use serde::Deserialize;

use crate::limits::Limits;
use crate::message::IllegalRecordPolicy;
use crate::name::{ConflictingFeatures, NameCodecFeatures};
use crate::record::UnderflowPolicy;

/// The plain, field-by-field form of [`NameCodecFeatures`] that
/// `serde` can deserialize directly; [`Config::name_features`]
/// validates it into the real type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize)]
#[serde(default)]
pub struct NameFeaturesConfig {
    pub compression: bool,
    pub punycode: bool,
    pub mdns_utf8: bool,
    pub read_trailing_dot: bool,
    pub write_trailing_dot: bool,
    pub case_conversion: bool,
}

impl From<NameCodecFeatures> for NameFeaturesConfig {
    fn from(f: NameCodecFeatures) -> Self {
        NameFeaturesConfig {
            compression: f.compression,
            punycode: f.punycode,
            mdns_utf8: f.mdns_utf8,
            read_trailing_dot: f.read_trailing_dot,
            write_trailing_dot: f.write_trailing_dot,
            case_conversion: f.case_conversion,
        }
    }
}

fn default_name_features() -> NameFeaturesConfig {
    NameCodecFeatures::default().into()
}

/// Everything the message encoder/decoder needs to know about how to
/// behave, gathered into one deserializable value. Construct it from a
/// config file, environment, or directly; `Config::default()` matches
/// the documented out-of-the-box behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    #[serde(rename = "name_features")]
    name_features_raw: NameFeaturesConfig,
    pub illegal_record_policy: IllegalRecordPolicy,
    pub underflow_policy: UnderflowPolicy,
    pub mdns: bool,
    pub mdns_unicast_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            limits: Limits::default(),
            name_features_raw: default_name_features(),
            illegal_record_policy: IllegalRecordPolicy::default(),
            underflow_policy: UnderflowPolicy::default(),
            mdns: false,
            mdns_unicast_response: false,
        }
    }
}

impl Config {
    /// Validates the deserialized name-feature flags, rejecting the
    /// `PUNYCODE`/`MDNS_UTF_8` conflict at the point of use rather than
    /// silently picking one.
    ///
    /// # Errors
    ///
    /// If `punycode` and `mdns_utf8` are both set.
    pub fn name_features(&self) -> Result<NameCodecFeatures, ConflictingFeatures> {
        let raw = self.name_features_raw;
        NameCodecFeatures::new(
            raw.compression,
            raw.punycode,
            raw.mdns_utf8,
            raw.read_trailing_dot,
            raw.write_trailing_dot,
            raw.case_conversion,
        )
    }

    /// Convenience preset matching [`NameCodecFeatures::mdns`] and
    /// enabling the mDNS message-level behaviours (multiple questions,
    /// unicast-response bit, permissive SOA rejection).
    pub fn mdns() -> Self {
        Config {
            name_features_raw: NameCodecFeatures::mdns().into(),
            mdns: true,
            mdns_unicast_response: true,
            ..Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_valid_name_features() {
        let config = Config::default();
        assert!(config.name_features().is_ok());
    }

    #[test]
    fn mdns_preset_enables_utf8_and_message_flags() {
        let config = Config::mdns();
        assert!(config.mdns);
        assert!(config.mdns_unicast_response);
        let features = config.name_features().unwrap();
        assert!(features.mdns_utf8);
    }

    #[test]
    fn conflicting_name_features_are_rejected_at_use() {
        let mut config = Config::default();
        config.name_features_raw.punycode = true;
        config.name_features_raw.mdns_utf8 = true;
        assert!(config.name_features().is_err());
    }
}
