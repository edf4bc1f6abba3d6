//! Configuration file management.
//!
//! Every section is optional; a missing file behaves like an empty one.
//! The file is read once at startup and never written back except by
//! `soilsense config init`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use soilsense_core::uuid::{DEVICE_NAME, SOIL_SERVICE, SOIL_SNAPSHOT};
use soilsense_core::{
    AcquisitionConfig, AreaUnit, BleOptions, DEFAULT_NOTIFY_TIMEOUT, DosageTable, FallbackPolicy,
    RuleBook, ThresholdTable, Vocabulary,
};
use uuid::Uuid;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule table replacing the built-in one (TOML or JSON)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,

    /// Default unit for `--area`
    pub area_unit: AreaUnit,

    /// Sensor identity and acquisition budget
    pub device: DeviceConfig,

    /// Banding thresholds
    pub thresholds: ThresholdTable,

    /// Allowed season and weather names
    pub vocabulary: Vocabulary,

    /// Fertilizer rates in kg/ha
    pub dosage: DosageTable,
}

/// Sensor identity, acquisition budget and link timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Advertised device name
    pub name: String,
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    /// How long to wait for a notification
    pub notify_timeout_ms: u64,
    /// What to do when it does not arrive
    pub fallback: FallbackPolicy,
    pub scan_secs: u64,
    pub connect_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let ble = BleOptions::default();
        Self {
            name: DEVICE_NAME.to_string(),
            service_uuid: SOIL_SERVICE,
            characteristic_uuid: SOIL_SNAPSHOT,
            notify_timeout_ms: DEFAULT_NOTIFY_TIMEOUT.as_millis() as u64,
            fallback: FallbackPolicy::default(),
            scan_secs: ble.scan_duration.as_secs(),
            connect_timeout_secs: ble.connect_timeout.as_secs(),
            discovery_timeout_secs: ble.discovery_timeout.as_secs(),
            read_timeout_secs: ble.read_timeout.as_secs(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("soilsense")
            .join("config.toml")
    }

    /// Resolve an explicit path or fall back to the default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(Self::default_path, Path::to_path_buf)
    }

    /// Load and validate the configuration.
    ///
    /// A missing file at the default location yields the defaults; a
    /// missing file given explicitly is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit);
        if !path.exists() {
            if explicit.is_some() {
                bail!("Config file not found: {}", path.display());
            }
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.acquisition_config().validate()?;
        self.ble_options().validate()?;
        self.thresholds.validate()?;
        self.dosage.validate()?;
        if self.vocabulary.seasons.is_empty() || self.vocabulary.weathers.is_empty() {
            bail!("vocabulary must list at least one season and one weather");
        }
        Ok(())
    }

    /// Acquisition settings for the snapshot client.
    pub fn acquisition_config(&self) -> AcquisitionConfig {
        let fallback = self.device.fallback;
        AcquisitionConfig::new()
            .device_name(self.device.name.clone())
            .service_uuid(self.device.service_uuid)
            .characteristic_uuid(self.device.characteristic_uuid)
            .notify_timeout(Duration::from_millis(self.device.notify_timeout_ms))
            .fallback(fallback)
    }

    /// Link timeouts for the BLE transport.
    pub fn ble_options(&self) -> BleOptions {
        BleOptions::new()
            .scan_duration(Duration::from_secs(self.device.scan_secs))
            .connect_timeout(Duration::from_secs(self.device.connect_timeout_secs))
            .discovery_timeout(Duration::from_secs(self.device.discovery_timeout_secs))
            .read_timeout(Duration::from_secs(self.device.read_timeout_secs))
    }

    /// The rule table: `override_path`, else the configured file, else the
    /// built-in table. Always validated against the vocabulary.
    pub fn rule_book(&self, override_path: Option<&Path>) -> Result<RuleBook> {
        let book = match override_path.or(self.rules.as_deref()) {
            Some(path) => load_rule_book(path)?,
            None => RuleBook::builtin(),
        };
        book.validate(&self.vocabulary)?;
        Ok(book)
    }
}

/// Load a rule table from TOML, or JSON when the extension says so.
pub fn load_rule_book(path: &Path) -> Result<RuleBook> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule table: {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(RuleBook::from_json_str(&content)?)
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse rule table: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [device]
            notify_timeout_ms = 3000
            fallback = "fail_on_timeout"

            [thresholds.moisture]
            low = 25.0
            medium = 45.0
            high = 65.0
            "#,
        )
        .unwrap();

        let acquisition = config.acquisition_config();
        assert_eq!(acquisition.notify_timeout, Duration::from_millis(3000));
        assert_eq!(acquisition.fallback, FallbackPolicy::FailOnTimeout);
        assert_eq!(acquisition.device_name, DEVICE_NAME);
        assert_eq!(config.thresholds.moisture.low, 25.0);
        assert_eq!(config.thresholds.nitrogen, ThresholdTable::default().nitrogen);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[thresholds.nitrogen]\nlow = 50.0\nmedium = 10.0\nhigh = 60.0\n",
        )
        .unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Nitrogen"));
    }

    #[test]
    fn test_load_rejects_zero_link_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[device]\nread_timeout_secs = 0\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("read_timeout"));

        fs::write(&path, "[device]\nconnect_timeout_secs = 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.device.notify_timeout_ms = 1500;
        config.area_unit = AreaUnit::Hectare;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rule_book_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            r#"
            [default]
            crops = ["Millet"]

            [[rules]]
            id = "barley"
            crops = ["Barley"]

            [rules.conditions]
            moistureMin = 20.0
            season = ["rabi"]
            "#,
        )
        .unwrap();

        let book = Config::default().rule_book(Some(&path)).unwrap();
        assert_eq!(book.rules.len(), 1);
        assert_eq!(book.rules[0].conditions.moisture_min, Some(20.0));
    }

    #[test]
    fn test_rule_book_rejects_misspelled_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            r#"
            [default]
            crops = ["Millet"]

            [[rules]]
            id = "jute"
            crops = ["Jute"]

            [rules.conditions]
            pMIn = 20.0
            "#,
        )
        .unwrap();

        let err = Config::default().rule_book(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("pMIn"));
    }

    #[test]
    fn test_rule_book_checks_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            r#"{"rules": [{"id": "x", "crops": ["Oats"], "conditions": {"season": ["monsoon"]}}],
                "default": {"crops": ["Millet"]}}"#,
        )
        .unwrap();

        assert!(Config::default().rule_book(Some(&path)).is_err());
    }

    #[test]
    fn test_builtin_rule_book_by_default() {
        let book = Config::default().rule_book(None).unwrap();
        assert_eq!(book, RuleBook::builtin());
    }
}
