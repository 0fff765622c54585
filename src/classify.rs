// 🏷️ Classifier - Density categories as data
// Ordered rule table, first match wins. Pure: record in, category out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::density::{Density, MeasuredZip};

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Dense urban core
    Urban,
    /// Auto suburb, housing mostly built 1946-1979
    SuburbanEarly,
    /// Auto suburb, housing mostly built 1980 or later
    SuburbanLate,
    /// Everything else, including undefined density
    Exurban,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Urban,
        Category::SuburbanEarly,
        Category::SuburbanLate,
        Category::Exurban,
    ];

    /// Label used in the exported document (`CAT`)
    pub fn label(&self) -> &'static str {
        match self {
            Category::Urban => "URBAN",
            Category::SuburbanEarly => "SUBURBAN_EARLY",
            Category::SuburbanLate => "SUBURBAN_LATE",
            Category::Exurban => "EXURBAN",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            Category::Urban => "Urban",
            Category::SuburbanEarly => "Auto suburban, early",
            Category::SuburbanLate => "Auto suburban, later",
            Category::Exurban => "Auto exurban",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.label() == wanted)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Half-open range: `min` inclusive, `max` exclusive. Unbounded sides are None.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub const fn any() -> Self {
        Bounds { min: None, max: None }
    }

    /// An unknown value never satisfies a constrained range
    pub fn contains(&self, value: Option<T>) -> bool {
        if self.min.is_none() && self.max.is_none() {
            return true;
        }

        let Some(v) = value else {
            return false;
        };

        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v < max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityRule {
    /// Rule ID for tracking
    pub id: &'static str,

    /// Category assigned on match
    pub category: Category,

    /// People per square kilometer
    pub density: Bounds<f64>,

    /// Median year the housing stock was built
    pub year_built: Bounds<i32>,
}

impl DensityRule {
    pub fn matches(&self, density: Option<f64>, year_built: Option<i32>) -> bool {
        self.density.contains(density) && self.year_built.contains(year_built)
    }
}

/// URBAN / SUBURBAN_EARLY / SUBURBAN_LATE / EXURBAN, in evaluation order
pub static STANDARD_RULES: [DensityRule; 4] = [
    DensityRule {
        id: "urban",
        category: Category::Urban,
        density: Bounds { min: Some(2900.0), max: None },
        year_built: Bounds::any(),
    },
    DensityRule {
        id: "suburban_early",
        category: Category::SuburbanEarly,
        density: Bounds { min: Some(100.0), max: Some(2900.0) },
        year_built: Bounds { min: Some(1946), max: Some(1980) },
    },
    DensityRule {
        id: "suburban_late",
        category: Category::SuburbanLate,
        density: Bounds { min: Some(100.0), max: Some(2900.0) },
        year_built: Bounds { min: Some(1980), max: None },
    },
    DensityRule {
        id: "exurban",
        category: Category::Exurban,
        density: Bounds::any(),
        year_built: Bounds::any(),
    },
];

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub rule_id: &'static str,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct Classifier {
    rules: &'static [DensityRule],
}

impl Classifier {
    /// The fixed four-category table
    pub fn standard() -> Self {
        Classifier {
            rules: &STANDARD_RULES,
        }
    }

    pub fn rules(&self) -> &[DensityRule] {
        self.rules
    }

    /// Apply rules top to bottom; the first match wins
    pub fn classify(&self, density: Density, year_built: Option<i32>) -> Classification {
        let value = density.value();

        self.rules
            .iter()
            .find(|rule| rule.matches(value, year_built))
            .map(|rule| Classification {
                category: rule.category,
                rule_id: rule.id,
            })
            .unwrap_or(Classification {
                category: Category::Exurban,
                rule_id: "default",
            })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

/// Category for a density and median year, using the standard table
pub fn classify(density: Density, year_built: Option<i32>) -> Category {
    Classifier::standard().classify(density, year_built).category
}

// ============================================================================
// CLASSIFIED RECORD
// ============================================================================

/// Final, exported shape of a zip record. Field names are what the map reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedZip {
    #[serde(rename = "GEOID")]
    pub id: String,

    #[serde(rename = "AREAMSQ")]
    pub area_sq_m: u64,

    #[serde(rename = "POPULATION")]
    pub population: Option<u64>,

    #[serde(rename = "MEDYRBUILT")]
    pub median_year_built: Option<i32>,

    /// None when density is undefined
    #[serde(rename = "POPPERKMSQ")]
    pub density_per_sq_km: Option<f64>,

    #[serde(rename = "CAT")]
    pub category: Category,
}

impl ClassifiedZip {
    pub fn from_measured(zip: &MeasuredZip, category: Category) -> Self {
        ClassifiedZip {
            id: zip.record.id.clone(),
            area_sq_m: zip.record.area_sq_m,
            population: zip.record.population,
            median_year_built: zip.record.median_year_built,
            density_per_sq_km: zip.density.value(),
            category,
        }
    }
}

/// Classify every measured record into a new table
pub fn classify_all(classifier: &Classifier, zips: &[MeasuredZip]) -> Vec<ClassifiedZip> {
    zips.iter()
        .map(|zip| {
            let result = classifier.classify(zip.density, zip.record.median_year_built);
            ClassifiedZip::from_measured(zip, result.category)
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
