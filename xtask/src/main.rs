use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "sharehold workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the shared handle benchmarks once per global allocator
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
    /// Model-check the reference counter with loom
    Loom,
}

const BENCH: &str = "shared_handle_benchmark";

const ALLOCATORS: &[&str] = &[
    "alloc-system",
    "alloc-mimalloc",
    "alloc-snmalloc",
    "alloc-jemalloc",
];

/// Baseline every other allocator is compared against.
const BASELINE: &str = "system";

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

#[derive(Deserialize)]
struct BenchmarkInfo {
    full_id: String,
    throughput: Option<ThroughputInfo>,
}

#[derive(Deserialize)]
struct ThroughputInfo {
    #[serde(rename = "Elements")]
    elements: Option<f64>,
}

/// Ops/s keyed by benchmark id, then by allocator.
type Results = BTreeMap<String, BTreeMap<String, f64>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
        Commands::Loom => run_loom()?,
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!("Compiling {BENCH}...");
    let status = Command::new("cargo")
        .args(["build", "--bench", BENCH, "--release"])
        .status()
        .context("failed to spawn cargo")?;
    if !status.success() {
        bail!("failed to compile {BENCH}");
    }

    for alloc in ALLOCATORS {
        println!("\n>>> Benchmarking with feature: {alloc}");
        let start = Instant::now();
        let baseline = alloc.trim_start_matches("alloc-");

        let mut cmd = Command::new("cargo");
        cmd.env("CARGO_INCREMENTAL", "0")
            .args(["bench", "--bench", BENCH, "--no-default-features", "--features"])
            .arg(alloc)
            .arg("--")
            .arg("--save-baseline")
            .arg(baseline);

        if quick {
            cmd.args(["--measurement-time", "0.1", "--noplot", "--sample-size", "10"]);
        }

        let status = cmd
            .status()
            .with_context(|| format!("failed to run {BENCH} for {alloc}"))?;

        if status.success() {
            println!("Finished {alloc} in {:.2?}", start.elapsed());
        } else {
            eprintln!("Warning: benchmark failed for {alloc}");
        }
    }

    Ok(())
}

fn run_loom() -> Result<()> {
    let status = Command::new("cargo")
        .env("RUSTFLAGS", "--cfg loom")
        .args(["test", "--release", "--test", "loom_shared_handle"])
        .status()
        .context("failed to spawn cargo")?;
    if !status.success() {
        bail!("loom model check failed");
    }
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results)?;

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)
        .with_context(|| format!("creating {}", report_path.display()))?;

    writeln!(file, "# SharedHandle Benchmark Report")?;
    writeln!(file)?;

    write!(file, "| Benchmark |")?;
    for alloc in ALLOCATORS {
        write!(file, " {} (Ops/s) | vs {BASELINE} |", alloc.trim_start_matches("alloc-"))?;
    }
    writeln!(file)?;
    write!(file, "|---|")?;
    for _ in ALLOCATORS {
        write!(file, "---|---|")?;
    }
    writeln!(file)?;

    for (bench, by_alloc) in &results {
        write!(file, "| {bench} |")?;
        let baseline = by_alloc.get(BASELINE).copied().unwrap_or(0.0);

        for alloc in ALLOCATORS {
            match by_alloc.get(alloc.trim_start_matches("alloc-")) {
                Some(ops) => {
                    let rel = if baseline > 0.0 { ops / baseline } else { 0.0 };
                    write!(file, " {} | **{rel:.2}x** |", format_ops(*ops))?;
                }
                None => write!(file, " N/A | - |")?,
            }
        }
        writeln!(file)?;
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

/// Walks `target/criterion`, reading `<bench>/<baseline>/estimates.json` and
/// the matching `benchmark.json`.
fn collect_results(dir: &Path, results: &mut Results) -> Result<()> {
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_results(&path, results)?;
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()) != Some("estimates.json") {
            continue;
        }

        let Some(baseline_dir) = path.parent() else { continue };
        let Some(baseline) = baseline_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if baseline == "report" || baseline == "new" || baseline == "base" || baseline == "change" {
            continue;
        }

        let info_path = baseline_dir.join("benchmark.json");
        let Ok(info) = fs::read_to_string(&info_path) else { continue };
        let info: BenchmarkInfo = serde_json::from_str(&info)
            .with_context(|| format!("parsing {}", info_path.display()))?;
        let estimates: Estimates = serde_json::from_str(&fs::read_to_string(&path)?)
            .with_context(|| format!("parsing {}", path.display()))?;

        let time_ns = estimates.mean.point_estimate;
        if time_ns <= 0.0 {
            continue;
        }
        let elements = info.throughput.and_then(|t| t.elements).unwrap_or(1.0);
        results
            .entry(info.full_id)
            .or_default()
            .insert(baseline.to_string(), elements * 1e9 / time_ns);
    }
    Ok(())
}
