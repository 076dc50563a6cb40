//! Code for loading a collection of named model presets.
use super::input_err_msg;
use crate::params::ModelParameters;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

/// The file extension of preset files
const PRESET_FILE_EXTENSION: &str = "toml";

/// A set of model presets, keyed by run name in load order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresetRepository(IndexMap<String, ModelParameters>);

impl PresetRepository {
    /// Load every `*.toml` file in a directory.
    ///
    /// Files are read in file name order. A preset without a `run_name` is named after its file
    /// stem.
    pub fn from_dir(dir_path: &Path) -> Result<Self> {
        let mut file_paths: Vec<_> = fs::read_dir(dir_path)
            .with_context(|| input_err_msg(dir_path))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<_, _>>()
            .with_context(|| input_err_msg(dir_path))?;
        file_paths.retain(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == PRESET_FILE_EXTENSION)
        });
        file_paths.sort();

        let mut repo = Self::default();
        for file_path in file_paths {
            repo.insert(ModelParameters::from_path(&file_path)?)
                .with_context(|| input_err_msg(&file_path))?;
        }

        Ok(repo)
    }

    /// Build a repository from `(file stem, TOML contents)` pairs
    pub fn from_sources<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut repo = Self::default();
        for (stem, toml_str) in sources {
            let params = ModelParameters::from_toml_str(stem, toml_str)
                .with_context(|| format!("Invalid preset: {stem}"))?;
            repo.insert(params)?;
        }

        Ok(repo)
    }

    fn insert(&mut self, params: ModelParameters) -> Result<()> {
        ensure!(
            !self.0.contains_key(&params.run_name),
            "Duplicate preset name: {}",
            params.run_name
        );
        self.0.insert(params.run_name.clone(), params);

        Ok(())
    }

    /// The names of the presets, in load order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Get the named preset
    pub fn get(&self, name: &str) -> Option<&ModelParameters> {
        self.0.get(name)
    }

    /// Get the description of the named preset
    pub fn description(&self, name: &str) -> Option<&str> {
        self.get(name).map(|params| params.description.as_str())
    }

    /// The number of presets
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no presets
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::SAMPLE_MODEL_TOML;
    use itertools::assert_equal;
    use tempfile::tempdir;

    /// The sample model with its run name replaced
    fn named_model(run_name: Option<&str>) -> String {
        let body = SAMPLE_MODEL_TOML
            .lines()
            .filter(|line| !line.starts_with("run_name"))
            .collect::<Vec<_>>()
            .join("\n");
        match run_name {
            Some(name) => format!("run_name = \"{name}\"\n{body}"),
            None => body,
        }
    }

    #[test]
    fn test_from_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.toml"), named_model(Some("zeta"))).unwrap();
        fs::write(dir.path().join("a.toml"), named_model(None)).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a preset").unwrap();

        let repo = PresetRepository::from_dir(dir.path()).unwrap();
        assert_eq!(repo.len(), 2);
        assert_equal(repo.names(), ["a", "zeta"]);
        assert_eq!(
            repo.description("zeta"),
            Some("A mid-sized gas utility with a ten-year NPA program")
        );
        assert_eq!(repo.get("a").unwrap().end_year, 2050);
        assert!(repo.get("b").is_none());
    }

    #[test]
    fn test_from_dir_missing() {
        let dir = tempdir().unwrap();
        assert!(PresetRepository::from_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_from_dir_duplicate_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), named_model(Some("same"))).unwrap();
        fs::write(dir.path().join("b.toml"), named_model(Some("same"))).unwrap();
        let err = PresetRepository::from_dir(dir.path()).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Duplicate preset name: same");
    }

    #[test]
    fn test_from_sources() {
        let unnamed = named_model(None);
        let sources = [("sample", SAMPLE_MODEL_TOML), ("other", unnamed.as_str())];
        let repo = PresetRepository::from_sources(sources).unwrap();
        assert_equal(repo.names(), ["sample", "other"]);
        assert!(repo.description("missing").is_none());
    }

    #[test]
    fn test_from_sources_invalid() {
        let err = PresetRepository::from_sources([("broken", "end_year = 2050")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid preset: broken");
    }

    #[test]
    fn test_empty() {
        let repo = PresetRepository::default();
        assert!(repo.is_empty());
        assert_eq!(repo.names().count(), 0);
    }
}
