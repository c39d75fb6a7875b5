use anyhow::{Context, Result};
use clap::Parser;
use il_covdev::alignment::JoinMode;
use il_covdev::output::{PlotFormat, UndefinedPolicy};
use il_covdev::regions::RegionConfig;
use il_covdev::statistics::ScoreSummary;
use il_covdev::types::{ChromosomeClass, ChromosomeClassifier, DeviationRecord};
use il_covdev::{baseline, coverage_reader, deviation, output, regions};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "il-covdev")]
#[command(version)]
#[command(about = "Coverage deviation of an introgression line against alien and wheat-parent baselines", long_about = None)]
struct Args {
    /// Introgression line coverage table (chrom pos <ignored> depth; can be gzipped)
    il: PathBuf,

    /// Wheat parent 1 coverage table
    parent1: PathBuf,

    /// Wheat parent 2 coverage table
    parent2: PathBuf,

    /// Window size label, used only in the output file name
    window_size: String,

    /// Output file name prefix
    prefix: String,

    /// Chromosome-name prefix marking alien chromosomes
    #[arg(long, default_value = "C")]
    alien_prefix: String,

    /// Directory for output files (created if missing)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// How parent rows are matched to IL rows
    #[arg(long, value_enum, default_value_t = JoinMode::Keyed)]
    join: JoinMode,

    /// How undefined scores are written
    #[arg(long, value_enum, default_value_t = UndefinedPolicy::Zero)]
    undefined: UndefinedPolicy,

    /// Write gain/loss regions to this CSV file
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Score at or above which a window counts as a gain
    #[arg(long, default_value = "1.5")]
    gain_threshold: f64,

    /// Score at or below which a window counts as a loss
    #[arg(long, default_value = "0.5")]
    loss_threshold: f64,

    /// Largest gap in bp bridged between flagged windows of one region
    #[arg(long, default_value = "0")]
    merge_distance: u64,

    /// Minimum number of windows for a region to be reported
    #[arg(long, default_value = "1")]
    min_windows: usize,

    /// Number of threads for parallel processing
    #[arg(long, default_value_t = num_cpus())]
    threads: usize,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Log debug diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Generate a coverage deviation plot
    #[arg(long)]
    plot: bool,

    /// Output directory for plots (defaults to the output directory)
    #[arg(long)]
    plot_dir: Option<PathBuf>,

    /// Plot output format
    #[arg(long, value_enum, default_value_t = PlotFormat::Png)]
    plot_format: PlotFormat,

    /// Maximum number of chromosomes to plot
    #[arg(long, default_value = "24")]
    max_plot_chroms: usize,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_progress_bar(quiet: bool, len: u64) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("  [{elapsed_precise}/{eta_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

fn make_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("  {spinner} [{elapsed_precise}] {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn ensure_dir(dir: &Path, what: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {} directory: {}", what, dir.display()))
}

fn validate(args: &Args) -> Result<()> {
    for path in [&args.il, &args.parent1, &args.parent2] {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
    }
    if args.alien_prefix.is_empty() {
        anyhow::bail!("--alien-prefix must not be empty");
    }
    for (name, value) in [("--gain-threshold", args.gain_threshold), ("--loss-threshold", args.loss_threshold)] {
        if !value.is_finite() || value <= 0.0 {
            anyhow::bail!("{} must be a positive number, got {}", name, value);
        }
    }
    if args.loss_threshold >= args.gain_threshold {
        anyhow::bail!(
            "--loss-threshold ({}) must be below --gain-threshold ({})",
            args.loss_threshold,
            args.gain_threshold
        );
    }
    if args.threads == 0 {
        anyhow::bail!("--threads must be at least 1");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    validate(&args)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    if let Some(dir) = &args.output_dir {
        ensure_dir(dir, "output")?;
    }
    let output_path = output::output_path(args.output_dir.as_deref(), &args.prefix, &args.window_size);

    progress!(args.quiet, "IL Coverage Deviation");
    progress!(args.quiet, "=========================================");
    progress!(args.quiet, "IL table: {}", args.il.display());
    progress!(args.quiet, "Parent 1 table: {}", args.parent1.display());
    progress!(args.quiet, "Parent 2 table: {}", args.parent2.display());
    progress!(args.quiet, "Window size: {}", args.window_size);
    progress!(args.quiet, "Alien prefix: {}", args.alien_prefix);
    progress!(args.quiet, "Row matching: {:?}", args.join);
    progress!(args.quiet, "Output TSV: {}", output_path.display());
    if let Some(ref regions_path) = args.regions {
        progress!(args.quiet, "Regions CSV: {}", regions_path.display());
        progress!(
            args.quiet,
            "  Gain >= {}, loss <= {}, merge distance {} bp, min windows {}",
            args.gain_threshold,
            args.loss_threshold,
            args.merge_distance,
            args.min_windows
        );
    }
    progress!(args.quiet, "Threads: {}", args.threads);
    progress!(args.quiet);

    // Step 1: Load tables
    progress!(args.quiet, "Step 1: Loading coverage tables...");
    let classifier = ChromosomeClassifier::new(args.alien_prefix.as_str());
    let mut tables = Vec::with_capacity(3);
    for path in [&args.il, &args.parent1, &args.parent2] {
        let pb = make_spinner(args.quiet);
        pb.set_message(format!("rows read from {}", path.display()));
        let table = coverage_reader::load_coverage_table(path, &classifier, Some(&pb))?;
        pb.finish_and_clear();
        progress!(
            args.quiet,
            "  {}: {} rows ({} alien, {} wheat)",
            path.display(),
            table.len(),
            table.count_of(ChromosomeClass::Alien),
            table.count_of(ChromosomeClass::WheatBackground)
        );
        tables.push(table);
    }
    let (il, parent1, parent2) = (&tables[0], &tables[1], &tables[2]);

    if il.is_empty() {
        anyhow::bail!("No rows in IL table {}", il.name);
    }

    // Step 2: Baselines
    progress!(args.quiet);
    progress!(args.quiet, "Step 2: Estimating median baselines...");
    let medians = baseline::estimate_baselines(il, parent1, parent2)?;
    progress!(args.quiet, "  IL alien median: {}", medians.alien_il);
    progress!(args.quiet, "  IL wheat median: {}", medians.wheat_il);
    progress!(args.quiet, "  Parent 1 wheat median: {}", medians.wheat_parent1);
    progress!(args.quiet, "  Parent 2 wheat median: {}", medians.wheat_parent2);

    // Step 3: Score rows
    progress!(args.quiet);
    progress!(args.quiet, "Step 3: Scoring coverage deviation...");
    let pb_score = make_progress_bar(args.quiet, il.len() as u64);
    let records = deviation::score_tables(il, parent1, parent2, &medians, args.join, Some(&pb_score))?;
    pb_score.finish_and_clear();

    if !args.quiet {
        ScoreSummary::from_records(&records).report();
    }

    // Step 4: Write table
    progress!(args.quiet);
    progress!(args.quiet, "Step 4: Writing results to TSV...");
    output::write_deviations_file(&records, &output_path, args.undefined)?;

    let region_config = RegionConfig {
        gain_threshold: args.gain_threshold,
        loss_threshold: args.loss_threshold,
        merge_distance: args.merge_distance,
        min_windows: args.min_windows,
    };

    if let Some(ref regions_path) = args.regions {
        progress!(args.quiet, "Step 5: Flagging copy-number change regions...");
        let flagged = regions::identify_regions(&records, &region_config);
        regions::write_regions_csv(&flagged, regions_path)?;
        if !args.quiet {
            regions::report_regions(&flagged);
        }
        progress!(args.quiet, "  Regions written to: {}", regions_path.display());
    }

    if args.plot {
        run_plot(&args, &records, &region_config)?;
    }

    progress!(args.quiet);
    progress!(args.quiet, "Done! Results written to: {}", output_path.display());

    Ok(())
}

/// Resolve the plot directory: `--plot-dir`, else the output directory, else `.`.
fn plot_dir(args: &Args) -> PathBuf {
    args.plot_dir
        .clone()
        .or_else(|| args.output_dir.clone())
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

#[cfg(feature = "plotting")]
fn run_plot(args: &Args, records: &[DeviationRecord], thresholds: &RegionConfig) -> Result<()> {
    use il_covdev::plotting;

    let config = plotting::PlotConfig {
        format: args.plot_format,
        max_chromosomes: args.max_plot_chroms,
        ..Default::default()
    };

    let dir = plot_dir(args);
    ensure_dir(&dir, "plot")?;
    let path = dir.join(format!(
        "{}_cov_dev_{}.{}",
        args.prefix,
        args.window_size,
        config.format.extension()
    ));

    progress!(args.quiet, "Generating plot...");
    plotting::plot_coverage_deviation(records, &path, &config, thresholds)?;
    progress!(args.quiet, "  Plot saved to: {}", path.display());
    Ok(())
}

#[cfg(not(feature = "plotting"))]
fn run_plot(args: &Args, _records: &[DeviationRecord], _thresholds: &RegionConfig) -> Result<()> {
    log::warn!(
        "plotting feature not enabled; rebuild with --features plotting to write {} plots (up to {} chromosomes) to {}",
        args.plot_format.extension(),
        args.max_plot_chroms,
        plot_dir(args).display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONALS: [&str; 6] = ["il-covdev", "il.cov", "p1.cov", "p2.cov", "1Mb", "IL7"];

    #[test]
    fn test_plot_options_parse_without_plotting_feature() {
        let mut argv = POSITIONALS.to_vec();
        argv.extend(["--plot", "--plot-format", "svg", "--max-plot-chroms", "7"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.plot_format, PlotFormat::Svg);
        assert_eq!(args.max_plot_chroms, 7);
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(POSITIONALS).unwrap();
        assert_eq!(args.join, JoinMode::Keyed);
        assert_eq!(args.undefined, UndefinedPolicy::Zero);
        assert_eq!(args.plot_format, PlotFormat::Png);
        assert_eq!(args.max_plot_chroms, 24);
    }

    #[test]
    fn test_ensure_dir_error_names_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let target = blocker.join("plots");

        let err = ensure_dir(&target, "plot").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("plot directory"), "{}", msg);
        assert!(msg.contains(&target.display().to_string()), "{}", msg);
        assert!(ensure_dir(&dir.path().join("a/b"), "output").is_ok());
    }

    #[test]
    fn test_plot_dir_falls_back_to_output_dir() {
        let mut argv = POSITIONALS.to_vec();
        argv.extend(["--output-dir", "out"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(plot_dir(&args), PathBuf::from("out"));
    }
}
