// 📏 Density Calculator - people per square kilometer
// Undefined densities are a sentinel, never NaN or infinity

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::UndefinedDensityError;
use crate::record::ZipRecord;

pub const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;

// ============================================================================
// DENSITY VALUE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Land area is zero (water-only ZCTAs)
    ZeroArea,
    /// No population row joined for this key
    MissingPopulation,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::ZeroArea => write!(f, "land area is zero"),
            UndefinedReason::MissingPopulation => write!(f, "population is missing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Density {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Density {
    /// Finite density, or None for the sentinel
    pub fn value(&self) -> Option<f64> {
        match self {
            Density::Defined(d) => Some(*d),
            Density::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Density::Defined(_))
    }
}

/// population / (area_sq_m / 1_000_000)
///
/// Zero area is checked before population, so a record missing both
/// reports `ZeroArea`.
pub fn density_per_sq_km(population: Option<u64>, area_sq_m: u64) -> Density {
    if area_sq_m == 0 {
        return Density::Undefined(UndefinedReason::ZeroArea);
    }

    match population {
        Some(people) => Density::Defined(people as f64 / (area_sq_m as f64 / SQ_M_PER_SQ_KM)),
        None => Density::Undefined(UndefinedReason::MissingPopulation),
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// How records with undefined density flow through the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedDensityPolicy {
    /// Keep the record; density exports as null and the record falls to
    /// the default category (EXURBAN)
    #[default]
    Sentinel,

    /// Drop the record from classification and from the exported document
    Skip,

    /// Fail the run on the first undefined density
    Abort,
}

// ============================================================================
// MEASURE STAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredZip {
    pub record: ZipRecord,
    pub density: Density,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredTable {
    /// Records that continue to classification
    pub zips: Vec<MeasuredZip>,

    /// Every record whose density was undefined, kept or skipped
    pub undefined: Vec<(String, UndefinedReason)>,

    /// Records dropped under `UndefinedDensityPolicy::Skip`
    pub skipped: usize,
}

/// Attach a density to every record, applying `policy` to undefined ones
pub fn measure(
    records: Vec<ZipRecord>,
    policy: UndefinedDensityPolicy,
) -> Result<MeasuredTable, UndefinedDensityError> {
    let mut zips = Vec::with_capacity(records.len());
    let mut undefined = Vec::new();
    let mut skipped = 0;

    for record in records {
        let density = density_per_sq_km(record.population, record.area_sq_m);

        if let Density::Undefined(reason) = density {
            match policy {
                UndefinedDensityPolicy::Abort => {
                    return Err(UndefinedDensityError {
                        id: record.id,
                        reason,
                    });
                }
                UndefinedDensityPolicy::Skip => {
                    warn!(id = %record.id, %reason, "undefined density, skipping record");
                    undefined.push((record.id, reason));
                    skipped += 1;
                    continue;
                }
                UndefinedDensityPolicy::Sentinel => {
                    warn!(id = %record.id, %reason, "undefined density, defaulting to EXURBAN");
                    undefined.push((record.id.clone(), reason));
                }
            }
        }

        zips.push(MeasuredZip { record, density });
    }

    Ok(MeasuredTable {
        zips,
        undefined,
        skipped,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_formula() {
        let density = density_per_sq_km(Some(17113), 166_659_789);
        let expected = 17113.0 / (166_659_789.0 / 1_000_000.0);

        assert!((density.value().unwrap() - expected).abs() < 1e-9);
        assert!((density.value().unwrap() - 102.68).abs() < 0.01);
    }

    #[test]
    fn test_zero_population_is_defined() {
        assert_eq!(density_per_sq_km(Some(0), 5_000_000), Density::Defined(0.0));
    }

    #[test]
    fn test_zero_area_is_undefined() {
        assert_eq!(
            density_per_sq_km(Some(120), 0),
            Density::Undefined(UndefinedReason::ZeroArea)
        );
        assert_eq!(
            density_per_sq_km(None, 0),
            Density::Undefined(UndefinedReason::ZeroArea)
        );
    }

    #[test]
    fn test_missing_population_is_undefined() {
        assert_eq!(
            density_per_sq_km(None, 1_000_000),
            Density::Undefined(UndefinedReason::MissingPopulation)
        );
    }

    fn sample() -> Vec<ZipRecord> {
        vec![
            ZipRecord::new("a", 1_000_000).with_population(500),
            ZipRecord::new("b", 0).with_population(10),
            ZipRecord::new("c", 2_000_000),
        ]
    }

    #[test]
    fn test_sentinel_policy_keeps_records() {
        let table = measure(sample(), UndefinedDensityPolicy::Sentinel).unwrap();

        assert_eq!(table.zips.len(), 3);
        assert_eq!(table.zips[0].density, Density::Defined(500.0));
        assert!(!table.zips[1].density.is_defined());
        assert_eq!(table.undefined.len(), 2);
        assert_eq!(table.skipped, 0);
    }

    #[test]
    fn test_skip_policy_drops_records() {
        let table = measure(sample(), UndefinedDensityPolicy::Skip).unwrap();

        assert_eq!(table.zips.len(), 1);
        assert_eq!(table.zips[0].record.id, "a");
        assert_eq!(table.skipped, 2);
        assert_eq!(
            table.undefined,
            vec![
                ("b".to_string(), UndefinedReason::ZeroArea),
                ("c".to_string(), UndefinedReason::MissingPopulation),
            ]
        );
    }

    #[test]
    fn test_abort_policy_fails_on_first() {
        let err = measure(sample(), UndefinedDensityPolicy::Abort).unwrap_err();

        assert_eq!(err.id, "b");
        assert_eq!(err.reason, UndefinedReason::ZeroArea);
    }
}
