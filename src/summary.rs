// 📊 Summary - sanity-check statistics over the classified table
// Category counts, population per category, density distribution

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{Category, ClassifiedZip};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: Category,
    pub name: String,
    pub count: usize,
    pub population: u64,
    /// Fraction of all records (0.0 - 1.0)
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl DensityStats {
    /// None when no record has a defined density
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        } else {
            values[count / 2]
        };

        Some(DensityStats {
            count,
            min: values[0],
            max: values[count - 1],
            mean,
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub total_records: usize,
    pub total_population: u64,
    /// Always four entries, in `Category::ALL` order
    pub by_category: Vec<CategoryStat>,
    pub density: Option<DensityStats>,
    pub undefined_density: usize,
    pub missing_population: usize,
    pub missing_year_built: usize,
}

impl Summary {
    pub fn from_records(records: &[ClassifiedZip]) -> Self {
        let total = records.len();

        let by_category = Category::ALL
            .iter()
            .map(|&category| {
                let members = records.iter().filter(|r| r.category == category);
                let (count, population) = members.fold((0usize, 0u64), |(n, p), r| {
                    (n + 1, p + r.population.unwrap_or(0))
                });

                CategoryStat {
                    category,
                    name: category.name().to_string(),
                    count,
                    population,
                    share: if total == 0 { 0.0 } else { count as f64 / total as f64 },
                }
            })
            .collect();

        let densities: Vec<f64> = records.iter().filter_map(|r| r.density_per_sq_km).collect();
        let undefined_density = total - densities.len();

        Summary {
            generated_at: Utc::now(),
            total_records: total,
            total_population: records.iter().filter_map(|r| r.population).sum(),
            by_category,
            density: DensityStats::from_values(densities),
            undefined_density,
            missing_population: records.iter().filter(|r| r.population.is_none()).count(),
            missing_year_built: records
                .iter()
                .filter(|r| r.median_year_built.is_none())
                .count(),
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.count)
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .by_category
            .iter()
            .map(|s| format!("{} {}", s.category, s.count))
            .collect();

        format!(
            "{} zip codes: {} (undefined density: {})",
            self.total_records,
            counts.join(", "),
            self.undefined_density
        )
    }
}

/// Up to `count` records spread evenly across the table, optionally of one category.
/// Deterministic, so repeated runs show the same rows.
pub fn sample(
    records: &[ClassifiedZip],
    count: usize,
    category: Option<Category>,
) -> Vec<&ClassifiedZip> {
    let pool: Vec<&ClassifiedZip> = records
        .iter()
        .filter(|r| category.map_or(true, |c| r.category == c))
        .collect();

    if count == 0 || pool.is_empty() {
        return Vec::new();
    }
    if pool.len() <= count {
        return pool;
    }

    (0..count).map(|i| pool[i * pool.len() / count]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip(id: &str, population: Option<u64>, density: Option<f64>, category: Category) -> ClassifiedZip {
        ClassifiedZip {
            id: id.to_string(),
            area_sq_m: 1_000_000,
            population,
            median_year_built: Some(1970),
            density_per_sq_km: density,
            category,
        }
    }

    fn table() -> Vec<ClassifiedZip> {
        vec![
            zip("a", Some(5000), Some(5000.0), Category::Urban),
            zip("b", Some(300), Some(300.0), Category::SuburbanEarly),
            zip("c", Some(200), Some(200.0), Category::SuburbanEarly),
            zip("d", None, None, Category::Exurban),
        ]
    }

    #[test]
    fn test_category_counts() {
        let summary = Summary::from_records(&table());

        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.by_category.len(), 4);
        assert_eq!(summary.count(Category::Urban), 1);
        assert_eq!(summary.count(Category::SuburbanEarly), 2);
        assert_eq!(summary.count(Category::SuburbanLate), 0);
        assert_eq!(summary.count(Category::Exurban), 1);
        assert_eq!(summary.total_population, 5500);
        assert_eq!(summary.by_category[1].population, 500);
        assert!((summary.by_category[1].share - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_density_stats() {
        let summary = Summary::from_records(&table());
        let density = summary.density.unwrap();

        assert_eq!(density.count, 3);
        assert_eq!(density.min, 200.0);
        assert_eq!(density.max, 5000.0);
        assert_eq!(density.median, 300.0);
        assert_eq!(summary.undefined_density, 1);
        assert_eq!(summary.missing_population, 1);
    }

    #[test]
    fn test_empty_table() {
        let summary = Summary::from_records(&[]);

        assert_eq!(summary.total_records, 0);
        assert!(summary.density.is_none());
        assert!(summary.by_category.iter().all(|s| s.share == 0.0));
    }

    #[test]
    fn test_even_median() {
        let stats = DensityStats::from_values(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
    }

    #[test]
    fn test_sample_is_spread_and_filtered() {
        let records = table();

        let picked: Vec<&str> = sample(&records, 2, None).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(picked, vec!["a", "c"]);

        let suburbs = sample(&records, 10, Some(Category::SuburbanEarly));
        assert_eq!(suburbs.len(), 2);

        assert!(sample(&records, 0, None).is_empty());
        assert!(sample(&records, 3, Some(Category::SuburbanLate)).is_empty());
    }
}
