// 🔗 Joiner - Left join keyed tables on the zip-code key
// The first table is the anchor: its keys, and only its keys, reach the output

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::JoinKeyError;
use crate::loader::{KeyedTable, Row, Value};

// ============================================================================
// KEY POLICY
// ============================================================================

/// What to do when a table repeats a key or carries a blank one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Later row's values replace the earlier row's; blank keys are skipped.
    /// An anchor key keeps the position where it was first seen.
    #[default]
    LastWins,

    /// First duplicate or blank key aborts the join
    Reject,
}

// ============================================================================
// JOIN RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// Rows read from the anchor table
    pub anchor_rows: usize,

    /// Unique anchor keys, i.e. rows in the joined table
    pub output_rows: usize,

    /// Duplicate keys resolved by last-write-wins, across all tables
    pub duplicate_keys: usize,

    /// Rows skipped for a blank key, across all tables
    pub blank_keys: usize,

    /// Per joined-in table: anchor keys with no matching row
    pub unmatched: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: KeyedTable,
    pub stats: JoinStats,
}

// ============================================================================
// INDEXING
// ============================================================================

/// Key -> row position, plus the first-seen key order
struct KeyIndex {
    order: Vec<String>,
    positions: HashMap<String, usize>,
}

fn index_keys(
    table: &KeyedTable,
    policy: DuplicateKeyPolicy,
    stats: &mut JoinStats,
) -> Result<KeyIndex, JoinKeyError> {
    let mut order = Vec::with_capacity(table.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        if row.key.trim().is_empty() {
            if policy == DuplicateKeyPolicy::Reject {
                return Err(JoinKeyError::Blank {
                    source_name: table.source_name.clone(),
                    line: row.line,
                });
            }
            warn!(source = %table.source_name, line = row.line, "skipping row with blank key");
            stats.blank_keys += 1;
            continue;
        }

        match positions.entry(row.key.clone()) {
            Entry::Occupied(mut existing) => {
                let first_line = table.rows[*existing.get()].line;
                if policy == DuplicateKeyPolicy::Reject {
                    return Err(JoinKeyError::Duplicate {
                        source_name: table.source_name.clone(),
                        key: row.key.clone(),
                        first_line,
                        line: row.line,
                    });
                }
                warn!(
                    source = %table.source_name,
                    key = %row.key,
                    first_line,
                    line = row.line,
                    "duplicate key, keeping the later row"
                );
                stats.duplicate_keys += 1;
                existing.insert(i);
            }
            Entry::Vacant(slot) => {
                slot.insert(i);
                order.push(row.key.clone());
            }
        }
    }

    Ok(KeyIndex { order, positions })
}

// ============================================================================
// LEFT JOIN
// ============================================================================

/// Left-join `others` onto `anchor` by key.
///
/// Output columns are the anchor's followed by each joined table's, in
/// argument order. Every unique non-blank anchor key appears exactly once;
/// a key missing from a joined table gets `Value::Null` for that table's
/// columns.
pub fn left_join(
    anchor: &KeyedTable,
    others: &[&KeyedTable],
    policy: DuplicateKeyPolicy,
) -> Result<JoinOutcome, JoinKeyError> {
    let mut stats = JoinStats {
        anchor_rows: anchor.len(),
        ..JoinStats::default()
    };

    let anchor_index = index_keys(anchor, policy, &mut stats)?;
    let other_indexes = others
        .iter()
        .map(|table| index_keys(table, policy, &mut stats))
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = anchor.columns.clone();
    for table in others {
        columns.extend(table.columns.iter().cloned());
    }

    let mut unmatched = vec![0usize; others.len()];
    let mut joined = KeyedTable::new(&anchor.source_name, columns);

    for key in &anchor_index.order {
        let anchor_row = &anchor.rows[anchor_index.positions[key]];
        let mut values = anchor_row.values.clone();

        for (j, (table, index)) in others.iter().zip(&other_indexes).enumerate() {
            match index.positions.get(key) {
                Some(&pos) => values.extend(table.rows[pos].values.iter().cloned()),
                None => {
                    unmatched[j] += 1;
                    values.extend(std::iter::repeat(Value::Null).take(table.columns.len()));
                }
            }
        }

        joined.rows.push(Row {
            key: key.clone(),
            line: anchor_row.line,
            values,
        });
    }

    stats.output_rows = joined.len();
    stats.unmatched = others
        .iter()
        .map(|t| t.source_name.clone())
        .zip(unmatched)
        .collect();

    debug!(
        anchor = %anchor.source_name,
        rows = stats.output_rows,
        duplicates = stats.duplicate_keys,
        "joined tables"
    );

    Ok(JoinOutcome { table: joined, stats })
}

// ============================================================================
// TESTS
// ============================================================================
