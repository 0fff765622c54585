// 🚰 Pipeline - load → join → measure → classify → export
// Each stage takes the previous stage's output and returns a new table

use serde::Serialize;
use tracing::info;

use crate::classify::{classify_all, ClassifiedZip, Classifier};
use crate::config::{PipelineConfig, PolicyConfig};
use crate::density::{measure, UndefinedDensityPolicy, UndefinedReason};
use crate::error::PipelineError;
use crate::export;
use crate::join::{left_join, DuplicateKeyPolicy, JoinStats};
use crate::loader::{KeyedTable, TableSource};
use crate::record::{zip_records, ZipRecord};

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub join: JoinStats,

    /// Records whose density was undefined, with the reason
    pub undefined_density: Vec<(String, UndefinedReason)>,

    /// Records dropped under the skip policy
    pub skipped: usize,

    /// Records in the classified table
    pub classified: usize,
}

impl RunReport {
    pub fn summary(&self) -> String {
        let unmatched: Vec<String> = self
            .join
            .unmatched
            .iter()
            .map(|(source, n)| format!("{} unmatched in {}", n, source))
            .collect();

        format!(
            "{} anchor rows → {} zip codes ({}), {} duplicate keys, {} undefined densities, {} skipped",
            self.join.anchor_rows,
            self.classified,
            unmatched.join(", "),
            self.join.duplicate_keys,
            self.undefined_density.len(),
            self.skipped
        )
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<ClassifiedZip>,
    pub report: RunReport,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    duplicate_keys: DuplicateKeyPolicy,
    undefined_density: UndefinedDensityPolicy,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(policies: &PolicyConfig) -> Self {
        Pipeline {
            duplicate_keys: policies.duplicate_keys,
            undefined_density: policies.undefined_density,
            classifier: Classifier::standard(),
        }
    }

    /// Join stage: anchor (area) left-joined with population then housing
    pub fn join(
        &self,
        area: &KeyedTable,
        population: &KeyedTable,
        housing: &KeyedTable,
    ) -> Result<(Vec<ZipRecord>, JoinStats), PipelineError> {
        let outcome = left_join(area, &[population, housing], self.duplicate_keys)?;
        let records = zip_records(&outcome.table)?;
        info!(records = records.len(), "join complete");
        Ok((records, outcome.stats))
    }

    /// Join, measure and classify already-loaded tables
    pub fn run_tables(
        &self,
        area: &KeyedTable,
        population: &KeyedTable,
        housing: &KeyedTable,
    ) -> Result<PipelineOutput, PipelineError> {
        let (records, join) = self.join(area, population, housing)?;

        let measured = measure(records, self.undefined_density)?;
        info!(
            measured = measured.zips.len(),
            undefined = measured.undefined.len(),
            skipped = measured.skipped,
            "density computed"
        );

        let classified = classify_all(&self.classifier, &measured.zips);
        info!(records = classified.len(), "classification complete");

        let report = RunReport {
            join,
            undefined_density: measured.undefined,
            skipped: measured.skipped,
            classified: classified.len(),
        };

        Ok(PipelineOutput {
            records: classified,
            report,
        })
    }

    /// Load all three sources, then `run_tables`
    pub fn run_sources(
        &self,
        area: &dyn TableSource,
        population: &dyn TableSource,
        housing: &dyn TableSource,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut tables = Vec::with_capacity(3);
        for source in [area, population, housing] {
            let table = source.load()?;
            info!(source = source.name(), rows = table.len(), "source loaded");
            tables.push(table);
        }

        self.run_tables(&tables[0], &tables[1], &tables[2])
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Run the pipeline over the CSV files named in `config`
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let [area, population, housing] = config.csv_sources();
    Pipeline::new(&config.policies).run_sources(&area, &population, &housing)
}

/// `run`, then write the JSON document (and the JS form when configured)
pub fn run_and_export(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let output = run(config)?;

    export::write_json(&config.output.json_path, &output.records)?;
    if let Some(js_path) = &config.output.js_path {
        export::write_js(js_path, &output.records, &config.output.js_variable)?;
    }

    Ok(output)
}

// ============================================================================
// TESTS
// ============================================================================
