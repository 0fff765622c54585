// ⚙️ Configuration - where the sources live and how edge cases are handled
// JSON file; every section has defaults so a partial file is enough

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::density::UndefinedDensityPolicy;
use crate::export::DEFAULT_JS_VARIABLE;
use crate::join::DuplicateKeyPolicy;
use crate::loader::{CsvSource, SourceKind};

// ============================================================================
// SOURCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub key_column: String,
    pub value_column: String,
}

impl SourceConfig {
    fn new(path: &str, key_column: &str, value_column: &str) -> Self {
        SourceConfig {
            path: PathBuf::from(path),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }

    pub fn csv_source(&self, kind: SourceKind) -> CsvSource {
        CsvSource::new(&self.path, kind.spec(&self.key_column, &self.value_column))
    }
}

/// Defaults match the ACS 2013 5-year ZCTA extracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub area: SourceConfig,
    pub population: SourceConfig,
    pub housing: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            area: SourceConfig::new("data/zcta_area.csv", "GEOID_Data", "ALAND"),
            population: SourceConfig::new("data/population.csv", "GEOID", "B01001e1"),
            housing: SourceConfig::new("data/housing.csv", "GEOID", "B25035e1"),
        }
    }
}

// ============================================================================
// OUTPUT / POLICIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_path: PathBuf,
    /// Also write `window.<js_variable>=...;` when set
    pub js_path: Option<PathBuf>,
    pub js_variable: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            json_path: PathBuf::from("out/urban_density.json"),
            js_path: None,
            js_variable: DEFAULT_JS_VARIABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub undefined_density: UndefinedDensityPolicy,
    pub duplicate_keys: DuplicateKeyPolicy,
}

// ============================================================================
// SERVER / MAP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings handed to the map page. Vector tiles come from Mapbox; the page
/// colours each polygon whose `match_property` equals a record's GEOID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub access_token: String,
    pub style: String,
    /// [longitude, latitude]
    pub center: [f64; 2],
    pub zoom: f64,
    pub tileset: String,
    pub source_layer: String,
    pub match_property: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            access_token: String::new(),
            style: "mapbox://styles/mapbox/light-v9".to_string(),
            center: [-71.09, 42.44],
            zoom: 9.0,
            tileset: "rajrsingh.bjb1ffhz".to_string(),
            source_layer: "zipsimple0025-btzfjd".to_string(),
            match_property: "GEOID_Data".to_string(),
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: SourcesConfig,
    pub output: OutputConfig,
    pub policies: PolicyConfig,
    pub server: ServerConfig,
    pub map: MapConfig,
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        Ok(config)
    }

    /// `from_file` when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Three CSV sources in join order: anchor (area), population, housing
    pub fn csv_sources(&self) -> [CsvSource; 3] {
        [
            self.sources.area.csv_source(SourceKind::Area),
            self.sources.population.csv_source(SourceKind::Population),
            self.sources.housing.csv_source(SourceKind::Housing),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TableSource;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.sources.area.key_column, "GEOID_Data");
        assert_eq!(config.sources.population.value_column, "B01001e1");
        assert_eq!(config.sources.housing.value_column, "B25035e1");
        assert_eq!(config.output.js_variable, "vizObj");
        assert_eq!(config.policies.undefined_density, UndefinedDensityPolicy::Sentinel);
        assert_eq!(config.policies.duplicate_keys, DuplicateKeyPolicy::LastWins);
        assert_eq!(config.server.address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "sources": { "area": { "path": "geo.csv", "key_column": "GEOID", "value_column": "ALAND" } },
            "policies": { "undefined_density": "skip", "duplicate_keys": "reject" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.sources.area.path, PathBuf::from("geo.csv"));
        assert_eq!(config.sources.population.key_column, "GEOID");
        assert_eq!(config.policies.undefined_density, UndefinedDensityPolicy::Skip);
        assert_eq!(config.policies.duplicate_keys, DuplicateKeyPolicy::Reject);
        assert_eq!(config.map.zoom, 9.0);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let json = r#"{ "policies": { "undefined_density": "guess" } }"#;
        assert!(serde_json::from_str::<PipelineConfig>(json).is_err());
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = PipelineConfig::from_file("/nonexistent/config.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_csv_sources_in_join_order() {
        let sources = PipelineConfig::default().csv_sources();

        assert_eq!(sources[0].name(), SourceKind::Area.name());
        assert_eq!(sources[1].name(), SourceKind::Population.name());
        assert_eq!(sources[2].name(), SourceKind::Housing.name());
    }
}
