//! Food Catalog
//!
//! Menu metadata keyed by canonical food key: display name, price,
//! calories and macros. Loaded once at startup from a JSON data file and
//! immutable afterwards.

pub mod normalize;

pub use normalize::normalize_label;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while loading the catalog data file
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Customer-facing name
    #[serde(default)]
    pub name_vi: String,
    /// Unit price in whole currency units
    #[serde(default)]
    pub price: u32,
    /// Calories per serving (kcal)
    #[serde(default)]
    pub calories: u32,
    /// Protein per serving (grams)
    #[serde(default)]
    pub protein: f32,
    /// Carbohydrates per serving (grams)
    #[serde(default)]
    pub carbs: f32,
    /// Fat per serving (grams)
    #[serde(default)]
    pub fat: f32,
    /// Short description for the detail panel
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// Zero-valued entry for labels the catalog does not know. Detected
    /// items must never vanish from the cart just because the menu data
    /// is behind the model.
    pub fn fallback(label: &str) -> Self {
        Self {
            name_vi: label.to_string(),
            price: 0,
            calories: 0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            description: format!("Phát hiện: {}", label),
        }
    }
}

/// The full menu, keyed by canonical food key
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: HashMap<String, CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load the catalog from a JSON file (one object, key -> entry).
    /// A missing file yields an empty catalog; a malformed file is an
    /// error for the caller to surface.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            warn!("Catalog file {:?} not found, starting with an empty catalog", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, CatalogEntry> = serde_json::from_str(&content)?;
        info!("Loaded {} catalog entries from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    /// Resolve a raw detector label to (canonical key, entry), falling
    /// back to a zero-valued entry when the label is unknown.
    pub fn resolve(&self, label: &str) -> (String, CatalogEntry) {
        let key = normalize::normalize_label(label, self);
        match self.entries.get(&key) {
            Some(entry) => (key, entry.clone()),
            None => {
                let entry = CatalogEntry::fallback(&key);
                (key, entry)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Entries sorted by key, for stable listing output
    pub fn iter_sorted(&self) -> Vec<(&String, &CatalogEntry)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_catalog_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{
                "Pho_bo": {{
                    "name_vi": "Phở bò",
                    "price": 45000,
                    "calories": 350,
                    "protein": 25.0,
                    "carbs": 40.0,
                    "fat": 8.0,
                    "description": "Phở bò truyền thống"
                }},
                "Banh_mi": {{"name_vi": "Bánh mì", "price": 20000}}
            }}"#
        )
        .unwrap();

        let catalog = Catalog::load(temp_file.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let pho = catalog.get("Pho_bo").unwrap();
        assert_eq!(pho.name_vi, "Phở bò");
        assert_eq!(pho.price, 45000);
        assert_eq!(pho.calories, 350);
        assert!((pho.protein - 25.0).abs() < 0.01);

        // Absent fields default to zero/empty.
        let banh_mi = catalog.get("Banh_mi").unwrap();
        assert_eq!(banh_mi.calories, 0);
        assert!(banh_mi.description.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let catalog = Catalog::load(Path::new("/nonexistent/food_catalog.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "not json at all").unwrap();

        let result = Catalog::load(temp_file.path());
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_resolve_known_label() {
        let mut entries = HashMap::new();
        entries.insert(
            "Banh_canh".to_string(),
            CatalogEntry {
                name_vi: "Bánh canh".to_string(),
                price: 35000,
                calories: 400,
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
                description: String::new(),
            },
        );
        let catalog = Catalog::new(entries);

        let (key, entry) = catalog.resolve("Banh-canh");
        assert_eq!(key, "Banh_canh");
        assert_eq!(entry.name_vi, "Bánh canh");
        assert_eq!(entry.price, 35000);
    }

    #[test]
    fn test_resolve_unknown_label_falls_back() {
        let catalog = Catalog::new(HashMap::new());

        let (key, entry) = catalog.resolve("Mystery-Dish");
        assert_eq!(key, "Mystery-Dish");
        assert_eq!(entry.name_vi, "Mystery-Dish");
        assert_eq!(entry.price, 0);
        assert_eq!(entry.calories, 0);
        assert_eq!(entry.description, "Phát hiện: Mystery-Dish");
    }

    #[test]
    fn test_iter_sorted_is_stable() {
        let mut entries = HashMap::new();
        entries.insert("Xoi".to_string(), CatalogEntry::fallback("Xoi"));
        entries.insert("Banh_mi".to_string(), CatalogEntry::fallback("Banh_mi"));
        entries.insert("Pho_bo".to_string(), CatalogEntry::fallback("Pho_bo"));
        let catalog = Catalog::new(entries);

        let keys: Vec<&str> = catalog.iter_sorted().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Banh_mi", "Pho_bo", "Xoi"]);
    }
}
