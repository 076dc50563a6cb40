//! The command line interface for the simulation.
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{DataWriter, create_output_directory, get_output_dir};
use crate::params::ModelParameters;
use crate::params::registry::parameter_rows;
use crate::results::transform_to_long_format;
use crate::settings::Settings;
use crate::simulation::{self, SimulationResults, to_absolute, to_delta};
use crate::warning::log_warnings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Write absolute values to the comparison table instead of differences from BAU
    #[arg(long)]
    pub absolute: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run every scenario of a model.
    Run {
        /// Path to the model file.
        model_path: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model file.
        model_path: PathBuf,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_path, opts } => handle_run_command(&model_path, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_path } => handle_validate_command(&model_path, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ npa_howtopay --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Load the model to run. The default output folder is named after the run.
    let params = ModelParameters::from_path(model_path).context("Failed to load model.")?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(&params.run_name)?;
        &pathbuf
    };

    // Command-line arguments can only turn these settings on
    let allow_overwrite = opts.overwrite || settings.overwrite;
    let show_absolute = opts.absolute || settings.show_absolute;

    let overwrite =
        create_output_directory(output_path, allow_overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Run the simulation
    let (start_year, end_year) = params.analysis_years();
    let results = simulation::run(&params, start_year, end_year)?;
    log_warnings(&results.warnings);

    write_outputs(output_path, &params, &results, show_absolute)
        .context("Failed to write output files.")?;
    write_metadata(output_path, &params.run_name, Some(model_path))
        .context("Failed to save metadata.")?;
    info!("Simulation complete!");

    Ok(())
}

/// Write every output table for a completed run
fn write_outputs(
    output_path: &Path,
    params: &ModelParameters,
    results: &SimulationResults,
    show_absolute: bool,
) -> Result<()> {
    let comparison = if show_absolute {
        to_absolute(results)
    } else {
        to_delta(results)
    };
    if comparison.dropped_rows > 0 {
        warn!(
            "{} rows had no BAU counterpart and were left out of the comparison",
            comparison.dropped_rows
        );
    }

    let mut writer = DataWriter::create(output_path)?;
    writer.write_results(&results.results)?;
    writer.write_comparison(&comparison)?;
    writer.write_comparison_long(&transform_to_long_format(&comparison))?;
    writer.write_parameters(&parameter_rows(params))?;
    writer.flush()?;

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    // Load/validate the model
    let params = ModelParameters::from_path(model_path).context("Failed to validate model.")?;
    log_warnings(&params.warnings());
    info!("Model validation successful!");

    Ok(())
}
