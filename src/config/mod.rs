//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog data file settings
    pub catalog: CatalogSettings,
    /// Detection settings
    pub detection: DetectionSettings,
    /// Payment callback listener settings
    pub payment: PaymentSettings,
    /// History journal settings
    pub history: HistorySettings,
    /// Invoice output settings
    pub invoice: InvoiceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogSettings::default(),
            detection: DetectionSettings::default(),
            payment: PaymentSettings::default(),
            history: HistorySettings::default(),
            invoice: InvoiceSettings::default(),
        }
    }
}

/// Catalog data file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Menu JSON file; relative paths resolve against the data directory
    pub data_file: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("food_catalog.json"),
        }
    }
}

/// Detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Confidence threshold for a detection to count
    pub default_confidence: f32,
    /// Lowest threshold the operator may set
    pub min_confidence: f32,
    /// Highest threshold the operator may set
    pub max_confidence: f32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            default_confidence: 0.5,
            min_confidence: 0.1,
            max_confidence: 1.0,
        }
    }
}

impl DetectionSettings {
    /// The configured threshold clamped into the permitted band.
    pub fn effective_confidence(&self) -> f32 {
        self.default_confidence
            .clamp(self.min_confidence, self.max_confidence)
    }
}

/// Payment callback listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Serve the confirmation page and accept phone callbacks
    pub listener_enabled: bool,
    /// TCP port for the listener
    pub listener_port: u16,
    /// Optional HTML file served as the success page
    pub success_page: Option<PathBuf>,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            listener_enabled: true,
            listener_port: 8765,
            success_page: None,
        }
    }
}

/// History journal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Journal file name under the data directory
    pub file_name: String,
    /// Oldest records beyond this count are dropped
    pub max_records: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            file_name: "detection_history.json".to_string(),
            max_records: 100,
        }
    }
}

/// Invoice output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSettings {
    /// Directory override; the user's Downloads folder when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self { output_dir: None }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Check catalog defaults
        assert_eq!(config.catalog.data_file, PathBuf::from("food_catalog.json"));

        // Check detection defaults
        assert!((config.detection.default_confidence - 0.5).abs() < 0.01);
        assert!((config.detection.min_confidence - 0.1).abs() < 0.01);
        assert!((config.detection.max_confidence - 1.0).abs() < 0.01);

        // Check payment defaults
        assert!(config.payment.listener_enabled);
        assert_eq!(config.payment.listener_port, 8765);
        assert!(config.payment.success_page.is_none());

        // Check history defaults
        assert_eq!(config.history.file_name, "detection_history.json");
        assert_eq!(config.history.max_records, 100);

        // Check invoice defaults
        assert!(config.invoice.output_dir.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.catalog.data_file, parsed.catalog.data_file);
        assert_eq!(config.payment.listener_port, parsed.payment.listener_port);
        assert_eq!(config.history.max_records, parsed.history.max_records);
        assert_eq!(config.invoice.output_dir, parsed.invoice.output_dir);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.catalog.data_file = PathBuf::from("/srv/till/menu.json");
        config.detection.default_confidence = 0.7;
        config.payment.listener_port = 9000;
        config.invoice.output_dir = Some(PathBuf::from("/srv/till/invoices"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.catalog.data_file, PathBuf::from("/srv/till/menu.json"));
        assert!((parsed.detection.default_confidence - 0.7).abs() < 0.01);
        assert_eq!(parsed.payment.listener_port, 9000);
        assert_eq!(
            parsed.invoice.output_dir,
            Some(PathBuf::from("/srv/till/invoices"))
        );
    }

    #[test]
    fn test_effective_confidence_clamps() {
        let mut settings = DetectionSettings::default();
        assert!((settings.effective_confidence() - 0.5).abs() < 0.01);

        settings.default_confidence = 0.05;
        assert!((settings.effective_confidence() - 0.1).abs() < 0.01);

        settings.default_confidence = 1.5;
        assert!((settings.effective_confidence() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.history.file_name, loaded.history.file_name);
        assert_eq!(config.payment.listener_port, loaded.payment.listener_port);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
