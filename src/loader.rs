// 📂 Loader - CSV sources into keyed tables
// Reads a source, keeps only the declared columns, and types every cell

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::LoadError;

/// Cell tokens that load as `Value::Null`
const NULL_TOKENS: [&str; 5] = ["", "NA", "N/A", "null", "NaN"];

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceKind - Which of the three census extracts a table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Area,
    Population,
    Housing,
}

impl SourceKind {
    /// Human-readable name for display and error messages
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Area => "ZCTA land area",
            SourceKind::Population => "Population by zip code",
            SourceKind::Housing => "Housing age",
        }
    }

    /// Column name the value is exposed under after loading
    pub fn alias(&self) -> &'static str {
        match self {
            SourceKind::Area => "AREAMSQ",
            SourceKind::Population => "POPULATION",
            SourceKind::Housing => "MEDYRBUILT",
        }
    }

    /// Build the extraction spec for this source.
    ///
    /// Land area is mandatory on every anchor row; population and
    /// median year may be blank in the source files.
    pub fn spec(&self, key_column: &str, value_column: &str) -> SourceSpec {
        let column = match self {
            SourceKind::Area => ColumnSpec::new(value_column, ColumnKind::Count).required(),
            SourceKind::Population => ColumnSpec::new(value_column, ColumnKind::Count),
            SourceKind::Housing => ColumnSpec::new(value_column, ColumnKind::Integer),
        };

        SourceSpec::new(self.name(), key_column).with_column(column.with_alias(self.alias()))
    }
}

/// Declared type of an extracted column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    /// Signed whole number
    Integer,
    /// Non-negative whole number (areas, head counts)
    Count,
    Float,
}

impl ColumnKind {
    fn parse(&self, raw: &str) -> Option<Value> {
        match self {
            ColumnKind::Text => Some(Value::Text(raw.to_string())),
            ColumnKind::Integer => parse_whole(raw).map(Value::Integer),
            ColumnKind::Count => parse_whole(raw).filter(|n| *n >= 0).map(Value::Integer),
            ColumnKind::Float => raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
        }
    }
}

/// Accepts "17113" and also "17113.0", which some exports write for integer columns
fn parse_whole(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }

    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// One column to extract from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Header name in the source file
    pub name: String,
    /// Name the column carries in the loaded table (defaults to `name`)
    pub alias: Option<String>,
    pub kind: ColumnKind,
    /// Whether a blank cell aborts the load
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        ColumnSpec {
            name: name.to_string(),
            alias: None,
            kind,
            required: false,
        }
    }

    /// Builder pattern: expose the column under another name
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Builder pattern: reject blank cells
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// What to pull out of one tabular source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub key_column: String,
    pub columns: Vec<ColumnSpec>,
}

impl SourceSpec {
    pub fn new(name: &str, key_column: &str) -> Self {
        SourceSpec {
            name: name.to_string(),
            key_column: key_column.to_string(),
            columns: Vec::new(),
        }
    }

    /// Builder pattern: add a column to extract
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }
}

/// Typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// One loaded row: key, source line, and values in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub line: u64,
    pub values: Vec<Value>,
}

/// Rows of one source, in file order. Keys are not deduplicated here.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    pub source_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl KeyedTable {
    pub fn new(source_name: &str, columns: Vec<String>) -> Self {
        KeyedTable {
            source_name: source_name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by its loaded (aliased) name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Find the first row carrying `key`
    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.key == key)
    }
}

// ============================================================================
// SOURCES
// ============================================================================

/// TableSource - anything that can materialize a keyed table
pub trait TableSource {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Load the whole table in one call. No retries.
    fn load(&self) -> Result<KeyedTable, LoadError>;
}

/// CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    spec: SourceSpec,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P, spec: SourceSpec) -> Self {
        CsvSource {
            path: path.as_ref().to_path_buf(),
            spec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvSource {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn load(&self) -> Result<KeyedTable, LoadError> {
        let file = File::open(&self.path).map_err(|error| LoadError::Io {
            source_name: format!("{} ({})", self.spec.name, self.path.display()),
            error,
        })?;

        let table = read_table(file, &self.spec)?;
        debug!(
            source = %self.spec.name,
            path = %self.path.display(),
            rows = table.len(),
            "loaded source"
        );
        Ok(table)
    }
}

// ============================================================================
// READING
// ============================================================================

/// Read a CSV stream with headers into a keyed table.
///
/// The key column and every declared column must be present in the header.
/// Cells in `NULL_TOKENS` load as `Value::Null`; any other cell that does
/// not parse as the declared kind is a `LoadError::InvalidValue`.
pub fn read_table<R: Read>(reader: R, spec: &SourceSpec) -> Result<KeyedTable, LoadError> {
    let csv_error = |error: csv::Error| LoadError::Csv {
        source_name: spec.name.clone(),
        error,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| LoadError::MissingColumn {
                source_name: spec.name.clone(),
                column: column.to_string(),
            })
    };

    let key_index = find(spec.key_column.as_str())?;
    let column_indexes = spec
        .columns
        .iter()
        .map(|c| find(c.name.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let columns = spec.columns.iter().map(|c| c.output_name().to_string()).collect();
    let mut table = KeyedTable::new(&spec.name, columns);

    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(csv_error)?;
        // +2 because: 1-indexed + header row
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row_num as u64 + 2);

        let key = record.get(key_index).unwrap_or("").to_string();

        let mut values = Vec::with_capacity(spec.columns.len());
        for (column, &index) in spec.columns.iter().zip(&column_indexes) {
            let raw = record.get(index).unwrap_or("");

            if NULL_TOKENS.contains(&raw) {
                if column.required {
                    return Err(LoadError::MissingValue {
                        source_name: spec.name.clone(),
                        line,
                        column: column.name.clone(),
                    });
                }
                values.push(Value::Null);
                continue;
            }

            let value = column.kind.parse(raw).ok_or_else(|| LoadError::InvalidValue {
                source_name: spec.name.clone(),
                line,
                column: column.name.clone(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }

        table.rows.push(Row { key, line, values });
    }

    Ok(table)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn population_spec() -> SourceSpec {
        SourceKind::Population.spec("GEOID", "B01001e1")
    }

    #[test]
    fn test_read_extracts_declared_columns() {
        let csv = "GEOID,B01001e1,B01001e2\n00601,17113,8000\n00602,37751,18000\n";
        let table = read_table(csv.as_bytes(), &population_spec()).unwrap();

        assert_eq!(table.columns, vec!["POPULATION".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].key, "00601");
        assert_eq!(table.rows[0].values, vec![Value::Integer(17113)]);
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn test_keys_keep_leading_zeros() {
        let csv = "GEOID,B01001e1\n 00601 ,1\n";
        let table = read_table(csv.as_bytes(), &population_spec()).unwrap();

        assert_eq!(table.rows[0].key, "00601");
    }

    #[test]
    fn test_blank_cells_load_as_null() {
        let csv = "GEOID,B01001e1\n00601,\n00602,NA\n";
        let table = read_table(csv.as_bytes(), &population_spec()).unwrap();

        assert!(table.rows.iter().all(|r| r.values[0].is_null()));
    }

    #[test]
    fn test_missing_column_fails() {
        let csv = "GEOID,SOMETHING\n00601,1\n";
        let err = read_table(csv.as_bytes(), &population_spec()).unwrap_err();

        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "B01001e1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_key_column_fails() {
        let csv = "ZIP,B01001e1\n00601,1\n";
        let err = read_table(csv.as_bytes(), &population_spec()).unwrap_err();

        assert!(matches!(err, LoadError::MissingColumn { column, .. } if column == "GEOID"));
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let csv = "GEOID,B01001e1\n00601,12\n00602,lots\n";
        let err = read_table(csv.as_bytes(), &population_spec()).unwrap_err();

        match err {
            LoadError::InvalidValue { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_count_rejects_negative() {
        let csv = "GEOID,B01001e1\n00601,-4\n";
        assert!(read_table(csv.as_bytes(), &population_spec()).is_err());
    }

    #[test]
    fn test_integer_accepts_whole_float_text() {
        let spec = SourceKind::Housing.spec("GEOID", "B25035e1");
        let csv = "GEOID,B25035e1\n00601,1965.0\n";
        let table = read_table(csv.as_bytes(), &spec).unwrap();

        assert_eq!(table.rows[0].values, vec![Value::Integer(1965)]);
    }

    #[test]
    fn test_required_column_rejects_blank() {
        let spec = SourceKind::Area.spec("GEOID_Data", "ALAND");
        let csv = "GEOID_Data,ALAND\n00601,\n";
        let err = read_table(csv.as_bytes(), &spec).unwrap_err();

        assert!(matches!(err, LoadError::MissingValue { line: 2, .. }));
    }

    #[test]
    fn test_csv_source_unreachable() {
        let source = CsvSource::new("/nonexistent/zcta.csv", population_spec());
        let err = source.load().unwrap_err();

        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_text_and_float_columns() {
        let spec = SourceSpec::new("misc", "id")
            .with_column(ColumnSpec::new("label", ColumnKind::Text))
            .with_column(ColumnSpec::new("ratio", ColumnKind::Float));
        let csv = "id,label,ratio\na,hello,0.25\n";
        let table = read_table(csv.as_bytes(), &spec).unwrap();

        assert_eq!(
            table.rows[0].values,
            vec![Value::Text("hello".to_string()), Value::Float(0.25)]
        );
    }
}
