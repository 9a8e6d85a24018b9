use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use buildrig::config::Config;
use buildrig::orchestration::{ConsoleSink, LogSink, Runner};
use buildrig::pipeline::{outline, pipeline_path, BuildContext, Pipeline};
use buildrig::{rig_debug, rig_error, Result};

/// buildrig - run build pipelines of copy, bundle and zip steps
#[derive(Parser, Debug)]
#[command(name = "buildrig")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    BUILDRIG_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.buildrig/buildrig.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Disable colored status lines
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a pipeline file
    Run {
        /// Pipeline file (defaults to ./buildrig.toml)
        file: Option<PathBuf>,

        /// Print a JSON summary after the run
        #[arg(long)]
        json: bool,
    },

    /// Validate a pipeline file and print its task tree
    Check {
        /// Pipeline file (defaults to ./buildrig.toml)
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("buildrig: could not load config: {}", e);
            Config::default()
        }
    };

    let level = buildrig::log::effective_level(cli.debug, config.log_level);
    buildrig::log::init(level, config.effective_log_file());
    rig_debug!("buildrig starting: {:?}", cli.command);

    let result = match cli.command {
        Command::Run { file, json } => run_pipeline(file, json, &config, !cli.no_color),
        Command::Check { file } => run_check(file, &config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            rig_error!("{}", e);
            eprintln!("buildrig: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_task(file: Option<PathBuf>, config: &Config, sink: Arc<dyn LogSink>) -> Result<(Pipeline, buildrig::Task)> {
    let path = pipeline_path(file);
    let pipeline = Pipeline::load(&path)?;
    let ctx = BuildContext::for_file(&path, config).with_sink(sink);
    let task = pipeline.to_task(&ctx)?;
    Ok((pipeline, task))
}

fn run_pipeline(file: Option<PathBuf>, json: bool, config: &Config, color: bool) -> Result<ExitCode> {
    let sink: Arc<dyn LogSink> = Arc::new(ConsoleSink::new(color && config.effective_color()));
    let (_, task) = load_task(file, config, Arc::clone(&sink))?;

    // One thread: parallel steps interleave cooperatively.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(Runner::new(sink).run(&task));

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
    }
    Ok(outcome.exit_code())
}

fn run_check(file: Option<PathBuf>, config: &Config) -> Result<ExitCode> {
    let sink = Arc::new(ConsoleSink::new(config.effective_color()));
    let (pipeline, task) = load_task(file, config, sink)?;
    println!(
        "{}: {} steps OK ({} leaf tasks)",
        pipeline.display_name(),
        pipeline.steps.len(),
        task.leaf_count()
    );
    print!("{}", outline(&task));
    Ok(ExitCode::SUCCESS)
}
