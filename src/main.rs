// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use urban_density::{
    run, run_and_export, sample, Category, ClassifiedZip, DuplicateKeyPolicy, PipelineConfig,
    PipelineOutput, Summary, UndefinedDensityPolicy,
};

#[derive(Parser)]
#[command(name = "urban-density")]
#[command(version)]
#[command(about = "Classify US zip codes into urban density categories", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Area (anchor) CSV
    #[arg(long, value_name = "FILE", global = true)]
    area: Option<PathBuf>,

    /// Population CSV
    #[arg(long, value_name = "FILE", global = true)]
    population: Option<PathBuf>,

    /// Housing age CSV
    #[arg(long, value_name = "FILE", global = true)]
    housing: Option<PathBuf>,

    /// Undefined density handling (sentinel, skip, abort)
    #[arg(long, value_parser = parse_policy::<UndefinedDensityPolicy>, global = true)]
    undefined_density: Option<UndefinedDensityPolicy>,

    /// Duplicate key handling (last_wins, reject)
    #[arg(long, value_parser = parse_policy::<DuplicateKeyPolicy>, global = true)]
    duplicate_keys: Option<DuplicateKeyPolicy>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, join, classify and export (default)
    Run {
        /// JSON output path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also write a `window.vizObj=...;` script
        #[arg(long, value_name = "FILE")]
        js: Option<PathBuf>,
    },

    /// Print category counts and density statistics without exporting
    Summary {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a spread of classified rows for a quick sanity check
    Sample {
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Only rows of this category
        #[arg(long)]
        category: Option<Category>,
    },

    /// Browse the classified table in the terminal
    Ui,
}

/// Policies share their config spelling on the command line
fn parse_policy<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("Invalid policy: {}", s))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    if let Some(path) = &cli.area {
        config.sources.area.path = path.clone();
    }
    if let Some(path) = &cli.population {
        config.sources.population.path = path.clone();
    }
    if let Some(path) = &cli.housing {
        config.sources.housing.path = path.clone();
    }
    if let Some(policy) = cli.undefined_density {
        config.policies.undefined_density = policy;
    }
    if let Some(policy) = cli.duplicate_keys {
        config.policies.duplicate_keys = policy;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run { output: None, js: None }) {
        Commands::Run { output, js } => {
            if let Some(path) = output {
                config.output.json_path = path;
            }
            if js.is_some() {
                config.output.js_path = js;
            }
            run_export(&config)?;
        }
        Commands::Summary { json } => {
            let output = run(&config).context("Pipeline failed")?;
            let summary = Summary::from_records(&output.records);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Sample { count, category } => {
            let output = run(&config).context("Pipeline failed")?;
            print_rows(&sample(&output.records, count, category));
        }
        Commands::Ui => run_ui_mode(&config)?,
    }

    Ok(())
}

fn run_export(config: &PipelineConfig) -> Result<()> {
    println!("🗺️  Urban Density - CSV → classified JSON");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Sources:");
    println!("   area:       {}", config.sources.area.path.display());
    println!("   population: {}", config.sources.population.path.display());
    println!("   housing:    {}", config.sources.housing.path.display());

    let PipelineOutput { records, report } =
        run_and_export(config).context("Pipeline failed")?;

    println!("\n🔗 {}", report.summary());

    println!("\n💾 Exported {} records", records.len());
    println!("   JSON: {}", config.output.json_path.display());
    if let Some(js_path) = &config.output.js_path {
        println!("   JS:   {} (window.{})", js_path.display(), config.output.js_variable);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_summary(&Summary::from_records(&records));

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("📊 {} zip codes, population {}", summary.total_records, summary.total_population);
    println!();
    println!("   {:<16} {:>8} {:>7} {:>14}", "Category", "Zips", "Share", "Population");
    for stat in &summary.by_category {
        println!(
            "   {:<16} {:>8} {:>6.1}% {:>14}",
            stat.category.label(),
            stat.count,
            stat.share * 100.0,
            stat.population
        );
    }

    if let Some(density) = &summary.density {
        println!();
        println!(
            "   Density (people/km²): min {:.1}, median {:.1}, mean {:.1}, max {:.1}",
            density.min, density.median, density.mean, density.max
        );
    }

    if summary.undefined_density > 0 {
        println!(
            "   ⚠️  {} zip codes have undefined density (zero area or no population)",
            summary.undefined_density
        );
    }
}

fn print_rows(rows: &[&ClassifiedZip]) {
    println!(
        "{:<16} {:>14} {:>11} {:>10} {:>12}  {}",
        "GEOID", "AREAMSQ", "POPULATION", "MEDYRBUILT", "POPPERKMSQ", "CAT"
    );
    for row in rows {
        println!(
            "{:<16} {:>14} {:>11} {:>10} {:>12}  {}",
            row.id,
            row.area_sq_m,
            row.population.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            row.median_year_built
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string()),
            row.density_per_sq_km
                .map(|d| format!("{:.1}", d))
                .unwrap_or_else(|| "-".to_string()),
            row.category
        );
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &PipelineConfig) -> Result<()> {
    println!("🖥️  Loading classified zip codes...\n");

    let output = run(config).context("Pipeline failed")?;
    println!("✓ Classified {} zip codes\n", output.records.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(output.records);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &PipelineConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or serve the map: cargo run --bin urban-density-server --features server");
    std::process::exit(1);
}
