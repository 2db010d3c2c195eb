use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use cmmd::{
    CmmdConfig, CmmdRequest, DistanceMetric, MoltiDetector, AnalysisResult,
    pipeline::{self, AnalysisSettings},
    output,
    utils::{self, format_elapsed},
};

/// Multilayer community trajectory analysis.
#[derive(Debug, Parser)]
#[command(name = "cmmd", version, about)]
struct Cli {
    /// INI configuration file; command-line flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// error, warn, info, debug, trace or none
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write the log to a timestamped file in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Show progress bars
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run community detection for missing resolutions, then analyse
    Run(RunArgs),
    /// Analyse a directory that already holds membership reports
    Analyze(AnalysisArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Network layer edge-list files
    #[arg(short, long = "layer", num_args = 1..)]
    layers: Vec<PathBuf>,

    #[arg(long)]
    gamma_min: Option<f64>,

    #[arg(long)]
    gamma_max: Option<f64>,

    #[arg(long)]
    gamma_step: Option<f64>,

    /// Community detection binary
    #[arg(long)]
    tool: Option<String>,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Debug, Args)]
struct AnalysisArgs {
    /// Directory of membership reports
    #[arg(short = 'd', long)]
    communities_dir: Option<PathBuf>,

    /// Distance metric (hamming, jaccard, euclidean, ...)
    #[arg(short = 'm', long)]
    distmethod: Option<String>,

    /// Distance workers; 0 uses every core
    #[arg(short = 'j', long)]
    n_jobs: Option<usize>,

    /// Keep only the entities listed in this file
    #[arg(long)]
    nodelist: Option<PathBuf>,

    /// Directory for the result matrices
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write the whole result bundle as JSON
    #[arg(long)]
    json: bool,
}

impl AnalysisArgs {
    fn apply(&self, config: &mut CmmdConfig) -> cmmd::Result<()> {
        if let Some(dir) = &self.communities_dir {
            config.files.communities_dir = dir.clone();
        }
        if let Some(method) = &self.distmethod {
            config.analysis.distance_metric = method.parse::<DistanceMetric>()?;
        }
        if let Some(jobs) = self.n_jobs {
            config.analysis.n_jobs = jobs;
        }
        if let Some(path) = &self.nodelist {
            config.files.nodelist_file = Some(path.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.files.output_dir = dir.clone();
        }
        Ok(())
    }
}

impl RunArgs {
    fn apply(&self, config: &mut CmmdConfig) -> cmmd::Result<()> {
        if !self.layers.is_empty() {
            config.detection.layers = self.layers.clone();
        }
        if let Some(v) = self.gamma_min {
            config.detection.gamma_min = v;
        }
        if let Some(v) = self.gamma_max {
            config.detection.gamma_max = v;
        }
        if let Some(v) = self.gamma_step {
            config.detection.gamma_step = v;
        }
        if let Some(tool) = &self.tool {
            config.detection.tool = tool.clone();
        }
        self.analysis.apply(config)
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn execute(cli: &Cli) -> cmmd::Result<()> {
    let start = Instant::now();

    let mut config = match &cli.config {
        Some(path) => CmmdConfig::from_ini(path)?,
        None => CmmdConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.analysis.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.files.log_dir = Some(dir.clone());
    }
    let json = match &cli.command {
        Command::Run(args) => {
            args.apply(&mut config)?;
            config.validate()?;
            args.analysis.json
        },
        Command::Analyze(args) => {
            args.apply(&mut config)?;
            config.validate_analysis()?;
            args.json
        },
    };
    let level = utils::parse_log_level(&config.analysis.log_level)
        .ok_or_else(|| cmmd::Error::config(format!("Invalid log level: {}", config.analysis.log_level)))?;

    if let Some(path) = utils::init_logging(level, config.files.log_dir.as_deref())? {
        println!("Logging to {}", path.display());
    }
    info!("Starting cmmd with log level: {:?}", level);

    let nodelist = match &config.files.nodelist_file {
        Some(path) => Some(pipeline::read_nodelist(path)?),
        None => None,
    };

    let progress = progress_bar(cli.progress);
    let result = match &cli.command {
        Command::Run(_) => {
            let request = CmmdRequest::from_config(&config, nodelist);
            let detector = MoltiDetector::new(config.detection.tool.clone());
            pipeline::cmmd_with_progress(&request, &detector, &progress)?
        },
        Command::Analyze(_) => {
            let settings = AnalysisSettings::from_config(&config);
            pipeline::analyze_directory_with_progress(
                &config.files.communities_dir,
                nodelist.as_ref(),
                &settings,
                &progress,
            )?
        },
    };
    progress.finish_and_clear();

    let written = output::write_results(&config.files.output_dir, &result)?;
    if json {
        output::write_json(&config.files.output_dir.join("cmmd_result.json"), &result)?;
    }

    print_summary(&result);
    println!("Label matrix:    {}", written.label_matrix.display());
    println!("Distance matrix: {}", written.distance_matrix.display());
    println!("Trajectories:    {}", written.groups.display());
    info!("cmmd finished in {}", format_elapsed(start.elapsed()));
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let matrix = &result.gene_community_matrix;
    let largest = result.l_constant.values().map(|g| g.len()).max().unwrap_or(0);
    println!(
        "{} entities, {} resolutions, {} distinct trajectories (largest group: {})",
        matrix.nrows(),
        matrix.ncols(),
        result.l_constant.len(),
        largest
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
