// 🗺️ Zip records - typed view of the joined table
// One ZipRecord per zip code tabulation area

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::loader::{KeyedTable, Row, SourceKind, Value};

/// Joined record, before density and category are derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipRecord {
    /// Zip code identifier (unique key)
    pub id: String,

    /// Land area in square meters
    pub area_sq_m: u64,

    /// Total population; None when the population source had no row
    pub population: Option<u64>,

    /// Median construction year of the housing stock
    pub median_year_built: Option<i32>,
}

impl ZipRecord {
    pub fn new(id: &str, area_sq_m: u64) -> Self {
        ZipRecord {
            id: id.to_string(),
            area_sq_m,
            population: None,
            median_year_built: None,
        }
    }

    /// Builder pattern: add population
    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }

    /// Builder pattern: add median year built
    pub fn with_median_year_built(mut self, year: i32) -> Self {
        self.median_year_built = Some(year);
        self
    }
}

/// Column positions of the three zip attributes in a joined table
struct ZipColumns {
    area: usize,
    population: usize,
    year: usize,
}

impl ZipColumns {
    fn locate(table: &KeyedTable) -> Result<Self, LoadError> {
        let find = |kind: SourceKind| {
            table
                .column_index(kind.alias())
                .ok_or_else(|| LoadError::MissingColumn {
                    source_name: table.source_name.clone(),
                    column: kind.alias().to_string(),
                })
        };

        Ok(ZipColumns {
            area: find(SourceKind::Area)?,
            population: find(SourceKind::Population)?,
            year: find(SourceKind::Housing)?,
        })
    }
}

fn mismatch(row: &Row, column: SourceKind, expected: &'static str) -> LoadError {
    LoadError::SchemaMismatch {
        key: row.key.clone(),
        column: column.alias().to_string(),
        expected,
    }
}

fn optional_count(row: &Row, index: usize, column: SourceKind) -> Result<Option<u64>, LoadError> {
    match &row.values[index] {
        Value::Null => Ok(None),
        value => value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| mismatch(row, column, "a non-negative integer")),
    }
}

/// Convert a joined table (AREAMSQ, POPULATION, MEDYRBUILT columns) into typed records
pub fn zip_records(table: &KeyedTable) -> Result<Vec<ZipRecord>, LoadError> {
    let columns = ZipColumns::locate(table)?;

    table
        .rows
        .iter()
        .map(|row| {
            let area_sq_m = optional_count(row, columns.area, SourceKind::Area)?
                .ok_or_else(|| mismatch(row, SourceKind::Area, "a land area"))?;
            let population = optional_count(row, columns.population, SourceKind::Population)?;
            let median_year_built = match &row.values[columns.year] {
                Value::Null => None,
                value => Some(
                    value
                        .as_i64()
                        .and_then(|n| i32::try_from(n).ok())
                        .ok_or_else(|| mismatch(row, SourceKind::Housing, "a year"))?,
                ),
            };

            Ok(ZipRecord {
                id: row.key.clone(),
                area_sq_m,
                population,
                median_year_built,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(rows: Vec<(&str, Vec<Value>)>) -> KeyedTable {
        let mut table = KeyedTable::new(
            "area",
            vec!["AREAMSQ".into(), "POPULATION".into(), "MEDYRBUILT".into()],
        );
        for (key, values) in rows {
            table.rows.push(Row {
                key: key.to_string(),
                line: 2,
                values,
            });
        }
        table
    }

    #[test]
    fn test_typed_records_from_joined_table() {
        let table = joined(vec![
            ("00601", vec![Value::Integer(166659789), Value::Integer(17113), Value::Integer(1965)]),
            ("00602", vec![Value::Integer(79288158), Value::Null, Value::Null]),
        ]);

        let records = zip_records(&table).unwrap();

        assert_eq!(
            records[0],
            ZipRecord::new("00601", 166659789)
                .with_population(17113)
                .with_median_year_built(1965)
        );
        assert_eq!(records[1], ZipRecord::new("00602", 79288158));
    }

    #[test]
    fn test_text_in_numeric_column_is_schema_mismatch() {
        let table = joined(vec![(
            "00601",
            vec![Value::Integer(1), Value::Text("many".into()), Value::Null],
        )]);

        let err = zip_records(&table).unwrap_err();
        assert!(matches!(err, LoadError::SchemaMismatch { column, .. } if column == "POPULATION"));
    }

    #[test]
    fn test_missing_zip_column() {
        let table = KeyedTable::new("area", vec!["AREAMSQ".into()]);
        assert!(matches!(zip_records(&table), Err(LoadError::MissingColumn { .. })));
    }
}
