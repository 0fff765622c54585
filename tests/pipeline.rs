// End-to-end runs over the CSV fixtures in tests/fixtures

use std::collections::HashSet;
use std::path::PathBuf;

use urban_density::{
    parse_json, run, run_and_export, Category, ClassifiedZip, DuplicateKeyPolicy, PipelineConfig,
    PipelineError, Summary, UndefinedDensityPolicy, UndefinedReason,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.sources.area.path = fixture("area.csv");
    config.sources.population.path = fixture("population.csv");
    config.sources.housing.path = fixture("housing.csv");
    config
}

fn find<'a>(records: &'a [ClassifiedZip], zip: &str) -> &'a ClassifiedZip {
    let id = format!("8600000US{}", zip);
    records
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("{} missing from output", id))
}

#[test]
fn test_every_anchor_key_once_in_anchor_order() {
    let output = run(&fixture_config()).unwrap();

    let ids: Vec<&str> = output.records.iter().map(|r| r.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();

    assert_eq!(ids.len(), 10);
    assert_eq!(unique.len(), 10);
    assert_eq!(ids[0], "8600000US00601");
    assert_eq!(ids[9], "8600000US59001");
    assert!(!ids.contains(&"8600000US99999"));
}

#[test]
fn test_categories_match_decision_table() {
    let output = run(&fixture_config()).unwrap();
    let records = &output.records;

    assert_eq!(find(records, "00601").category, Category::SuburbanEarly);
    assert_eq!(find(records, "00602").category, Category::SuburbanEarly);
    assert_eq!(find(records, "02108").category, Category::Urban);
    assert_eq!(find(records, "02109").category, Category::SuburbanEarly);
    assert_eq!(find(records, "02110").category, Category::Exurban);
    assert_eq!(find(records, "02111").category, Category::SuburbanLate);
    assert_eq!(find(records, "02112").category, Category::Exurban);
    assert_eq!(find(records, "02113").category, Category::Exurban);
    assert_eq!(find(records, "02114").category, Category::Exurban);
    assert_eq!(find(records, "59001").category, Category::Exurban);
}

#[test]
fn test_density_matches_formula() {
    let output = run(&fixture_config()).unwrap();

    for record in &output.records {
        match (record.population, record.area_sq_m) {
            (Some(people), area) if area > 0 => {
                let expected = people as f64 / (area as f64 / 1_000_000.0);
                let actual = record.density_per_sq_km.unwrap();
                assert!((actual - expected).abs() < 1e-9, "{}: {} vs {}", record.id, actual, expected);
            }
            _ => assert_eq!(record.density_per_sq_km, None, "{}", record.id),
        }
    }

    let first = find(&output.records, "00601");
    assert!((first.density_per_sq_km.unwrap() - 102.68).abs() < 0.01);
}

#[test]
fn test_unmatched_rows_keep_nulls() {
    let output = run(&fixture_config()).unwrap();

    let no_population = find(&output.records, "02113");
    assert_eq!(no_population.population, None);
    assert_eq!(no_population.median_year_built, Some(1990));

    let no_housing = find(&output.records, "02114");
    assert_eq!(no_housing.population, Some(600));
    assert_eq!(no_housing.median_year_built, None);
}

#[test]
fn test_report_counts() {
    let output = run(&fixture_config()).unwrap();
    let report = &output.report;

    assert_eq!(report.join.anchor_rows, 10);
    assert_eq!(report.join.output_rows, 10);
    assert_eq!(report.join.duplicate_keys, 1);
    assert_eq!(report.join.unmatched[0].1, 1);
    assert_eq!(report.join.unmatched[1].1, 1);
    assert_eq!(
        report.undefined_density,
        vec![
            ("8600000US02112".to_string(), UndefinedReason::ZeroArea),
            ("8600000US02113".to_string(), UndefinedReason::MissingPopulation),
        ]
    );
}

#[test]
fn test_skip_policy_removes_undefined_records() {
    let mut config = fixture_config();
    config.policies.undefined_density = UndefinedDensityPolicy::Skip;

    let output = run(&config).unwrap();

    assert_eq!(output.records.len(), 8);
    assert!(output.records.iter().all(|r| r.density_per_sq_km.is_some()));
}

#[test]
fn test_abort_and_reject_policies_fail_the_run() {
    let mut config = fixture_config();
    config.policies.undefined_density = UndefinedDensityPolicy::Abort;
    assert!(matches!(run(&config), Err(PipelineError::UndefinedDensity(_))));

    let mut config = fixture_config();
    config.policies.duplicate_keys = DuplicateKeyPolicy::Reject;
    assert!(matches!(run(&config), Err(PipelineError::JoinKey(_))));
}

#[test]
fn test_export_round_trip() {
    let dir = std::env::temp_dir().join(format!("urban-density-it-{}", std::process::id()));
    let mut config = fixture_config();
    config.output.json_path = dir.join("zips.json");
    config.output.js_path = Some(dir.join("zips.js"));

    let output = run_and_export(&config).unwrap();

    let document = std::fs::read_to_string(&config.output.json_path).unwrap();
    assert_eq!(parse_json(&document).unwrap(), output.records);

    let script = std::fs::read_to_string(dir.join("zips.js")).unwrap();
    assert_eq!(script, format!("window.vizObj={};", document));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_summary_over_fixtures() {
    let output = run(&fixture_config()).unwrap();
    let summary = Summary::from_records(&output.records);

    assert_eq!(summary.count(Category::Urban), 1);
    assert_eq!(summary.count(Category::SuburbanEarly), 3);
    assert_eq!(summary.count(Category::SuburbanLate), 1);
    assert_eq!(summary.count(Category::Exurban), 5);
    assert_eq!(summary.undefined_density, 2);
}
