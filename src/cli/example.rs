//! Code related to the example models and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::input::preset::PresetRepository;
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, File, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example models.
static EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/presets");

/// The available subcommands for managing example models.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example model file.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination file for the example.
        new_path: Option<PathBuf>,
    },
    /// Run an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command()?,
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// Load every bundled example
pub fn load_examples() -> Result<PresetRepository> {
    let sources = EXAMPLES_DIR
        .files()
        .filter(|file| file.path().extension().is_some_and(|ext| ext == "toml"))
        .map(|file| {
            let path = file.path();
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .with_context(|| format!("Invalid example file name: {}", path.display()))?;
            let contents = file
                .contents_utf8()
                .with_context(|| format!("{} is not UTF-8 encoded", path.display()))?;
            Ok((stem, contents))
        })
        .collect::<Result<Vec<_>>>()?;

    PresetRepository::from_sources(sources)
}

/// Get the model file for the named example
fn get_example_file(name: &str) -> Result<&'static File<'static>> {
    EXAMPLES_DIR
        .get_file(format!("{name}.toml"))
        .context("Example not found.")
}

/// Handle the `example list` command.
fn handle_example_list_command() -> Result<()> {
    for name in load_examples()?.names() {
        println!("{name}");
    }

    Ok(())
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    let examples = load_examples()?;
    let description = examples.description(name).context("Example not found.")?;
    println!("{description}");

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let default_dest = PathBuf::from(format!("{name}.toml"));
    extract_example(name, dest.unwrap_or(&default_dest))
}

/// Extract the specified example to a new file
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let file = get_example_file(name)?;

    ensure!(
        !new_path.exists(),
        "Destination {} already exists",
        new_path.display()
    );
    fs::write(new_path, file.contents())
        .with_context(|| format!("Could not write {}", new_path.display()))?;

    Ok(())
}

/// Handle the `example run` command.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(format!("{name}.toml"));
    extract_example(name, &model_path)?;
    handle_run_command(&model_path, opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_examples() {
        let examples = load_examples().unwrap();
        assert!(examples.get("sample").is_some());
        for name in examples.names() {
            assert!(!examples.description(name).unwrap().is_empty());

            // Examples are looked up by file name, so this must match the run name
            assert!(get_example_file(name).is_ok());
        }
    }

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.toml");
        extract_example("sample", &dest).unwrap();
        assert_eq!(
            fs::read(&dest).unwrap(),
            get_example_file("sample").unwrap().contents()
        );

        // Won't overwrite
        assert!(extract_example("sample", &dest).is_err());
    }

    #[test]
    fn test_extract_example_not_found() {
        let dir = tempdir().unwrap();
        let err = extract_example("missing", &dir.path().join("x.toml")).unwrap_err();
        assert_eq!(err.to_string(), "Example not found.");
    }
}
