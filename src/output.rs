//! The module responsible for writing output data to disk.
use crate::params::registry::ParameterRow;
use crate::results::{ComparisonTable, LongRow, ResultsByScenario};
use anyhow::{Context, Result, ensure};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which run-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "npa_howtopay_results";

/// The output file name for the full results table
const RESULTS_FILE_NAME: &str = "results.csv";

/// The output file name for the comparison table
const COMPARISON_FILE_NAME: &str = "comparison.csv";

/// The output file name for the comparison table in long format
const COMPARISON_LONG_FILE_NAME: &str = "comparison_long.csv";

/// The output file name for the parameters echo table
const PARAMETERS_FILE_NAME: &str = "parameters.csv";

/// Get the default output folder for the named run
pub fn get_output_dir(run_name: &str) -> Result<PathBuf> {
    ensure!(!run_name.is_empty(), "Run name cannot be empty");
    ensure!(
        !run_name.contains(['/', '\\']),
        "Run name cannot contain path separators: {run_name}"
    );

    Ok([OUTPUT_DIRECTORY_ROOT, run_name].iter().collect())
}

/// Create a new output directory.
///
/// An existing directory is only reused if it is empty or `allow_overwrite` is true.
///
/// # Returns
///
/// Whether an existing non-empty directory will be overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// An object for writing the tables of a model run to CSV files
pub struct DataWriter {
    results_writer: csv::Writer<File>,
    comparison_writer: csv::Writer<File>,
    comparison_long_writer: csv::Writer<File>,
    parameters_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(&file_path)
                .with_context(|| format!("Could not create {}", file_path.display()))
        };

        Ok(Self {
            results_writer: new_writer(RESULTS_FILE_NAME)?,
            comparison_writer: new_writer(COMPARISON_FILE_NAME)?,
            comparison_long_writer: new_writer(COMPARISON_LONG_FILE_NAME)?,
            parameters_writer: new_writer(PARAMETERS_FILE_NAME)?,
        })
    }

    /// Write every metric of every scenario
    pub fn write_results(&mut self, results: &ResultsByScenario) -> Result<()> {
        for row in results.rows() {
            self.results_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write a comparison table, with one column per compared metric
    pub fn write_comparison(&mut self, table: &ComparisonTable) -> Result<()> {
        let header = ["year", "scenario_id", "utility_type"]
            .into_iter()
            .map(str::to_string)
            .chain(table.compare_cols.iter().map(ToString::to_string));
        self.comparison_writer.write_record(header)?;

        for row in &table.rows {
            let record = [
                row.year.to_string(),
                row.scenario.to_string(),
                row.utility.to_string(),
            ]
            .into_iter()
            .chain(row.values.iter().map(ToString::to_string));
            self.comparison_writer.write_record(record)?;
        }

        Ok(())
    }

    /// Write a comparison table in long format
    pub fn write_comparison_long<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a LongRow>,
    {
        for row in rows {
            self.comparison_long_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the parameters echo table
    pub fn write_parameters(&mut self, rows: &[ParameterRow]) -> Result<()> {
        for row in rows {
            self.parameters_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.results_writer.flush()?;
        self.comparison_writer.flush()?;
        self.comparison_long_writer.flush()?;
        self.parameters_writer.flush()?;

        Ok(())
    }
}
