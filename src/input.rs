//! Common routines for handling input data.
//!
//! Proportions are held internally as values between 0 and 1. Model files (and any other
//! user-facing surface) express percentage fields as values between 0 and 100 instead, and the
//! functions in this module are the only place where one form is turned into the other.
use crate::units::Dimensionless;
use anyhow::{Context, Result};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod preset;

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Convert a user-facing percentage (0-100) into an internal proportion (0-1)
pub fn percent_to_proportion(percent: f64) -> Dimensionless {
    Dimensionless(percent / 100.0)
}

/// Convert an internal proportion (0-1) into a user-facing percentage (0-100)
pub fn proportion_to_percent(proportion: Dimensionless) -> f64 {
    proportion.0 * 100.0
}

/// Read a percentage (0-100) and store it as a proportion (0-1).
///
/// Bounds are not checked here, as several percentage fields (e.g. inflation rates) may
/// legitimately be negative or exceed 100. See [`crate::params::registry`] for range checks.
pub fn deserialise_percent<'de, D>(deserialiser: D) -> Result<Dimensionless, D::Error>
where
    D: Deserializer<'de>,
{
    let value: f64 = Deserialize::deserialize(deserialiser)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("Percentage must be a finite number"));
    }

    Ok(percent_to_proportion(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        name: String,
        #[serde(deserialize_with = "deserialise_percent")]
        rate: Dimensionless,
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "name = \"gas\"\nrate = 8.5").unwrap();
        }

        let record: Record = read_toml(&file_path).unwrap();
        assert_eq!(record.name, "gas");
        assert_approx_eq!(Dimensionless, record.rate, Dimensionless(0.085));
    }

    #[test]
    fn test_read_toml_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.toml");
        let result: Result<Record> = read_toml(&file_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Error reading ")
        );
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(100.0, 1.0)]
    #[case(2.5, 0.025)]
    #[case(-3.0, -0.03)]
    #[case(250.0, 2.5)]
    fn test_percent_round_trip(#[case] percent: f64, #[case] proportion: f64) {
        let converted = percent_to_proportion(percent);
        assert_approx_eq!(f64, converted.0, proportion, epsilon = 1e-12);
        assert_approx_eq!(f64, proportion_to_percent(converted), percent, epsilon = 1e-12);
    }

    #[test]
    fn test_deserialise_percent_rejects_non_finite() {
        let result: Result<Record, _> = toml::from_str("name = \"x\"\nrate = nan");
        assert!(result.is_err());
    }
}
