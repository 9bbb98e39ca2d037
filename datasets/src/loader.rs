// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Question catalog file loader.

use crate::schema::QuestionCatalog;
use crate::DatasetError;
use serde_valid::Validate;
use std::path::Path;

/// Loads and saves question catalog files (JSON or YAML).
pub struct CatalogLoader;

impl CatalogLoader {
    /// Creates a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Loads a catalog from a file, auto-detecting JSON or YAML by
    /// extension.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use inference_mesh_datasets::loader::CatalogLoader;
    /// use std::path::Path;
    ///
    /// let loader = CatalogLoader::new();
    /// let catalog = loader.load(Path::new("catalog.json")).unwrap();
    /// println!("Loaded {} with {} questions", catalog.name, catalog.questions.len());
    /// ```
    pub fn load(&self, path: &Path) -> Result<QuestionCatalog, DatasetError> {
        let content = std::fs::read_to_string(path)?;

        let catalog = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str::<QuestionCatalog>(&content)?,
            _ => serde_json::from_str::<QuestionCatalog>(&content)?,
        };

        catalog
            .validate()
            .map_err(|e| DatasetError::ValidationError(format!("catalog validation failed: {e}")))?;

        Ok(catalog)
    }

    /// Loads a catalog from a JSON file.
    pub fn load_from_json(&self, path: &Path) -> Result<QuestionCatalog, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: QuestionCatalog = serde_json::from_str(&content)?;
        catalog
            .validate()
            .map_err(|e| DatasetError::ValidationError(format!("catalog validation failed: {e}")))?;
        Ok(catalog)
    }

    /// Loads a catalog from a YAML file.
    pub fn load_from_yaml(&self, path: &Path) -> Result<QuestionCatalog, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: QuestionCatalog = serde_yaml::from_str(&content)?;
        catalog
            .validate()
            .map_err(|e| DatasetError::ValidationError(format!("catalog validation failed: {e}")))?;
        Ok(catalog)
    }

    /// Saves a catalog as JSON.
    pub fn save_to_json(&self, catalog: &QuestionCatalog, path: &Path) -> Result<(), DatasetError> {
        let content = serde_json::to_string_pretty(catalog)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Saves a catalog as YAML.
    pub fn save_to_yaml(&self, catalog: &QuestionCatalog, path: &Path) -> Result<(), DatasetError> {
        let content = serde_yaml::to_string(catalog)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads every catalog file in a directory, skipping (and logging)
    /// any that fail to parse or validate.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<QuestionCatalog>, DatasetError> {
        let mut catalogs = Vec::new();

        if !dir.exists() {
            return Ok(catalogs);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && Self::is_catalog_file(&path) {
                match self.load(&path) {
                    Ok(catalog) => catalogs.push(catalog),
                    Err(e) => {
                        tracing::warn!("failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        Ok(catalogs)
    }

    /// Lists catalog file stems available in a directory.
    pub fn list_catalogs(&self, dir: &Path) -> Result<Vec<String>, DatasetError> {
        let mut names = Vec::new();

        if !dir.exists() {
            return Ok(names);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && Self::is_catalog_file(&path) {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(name.to_string());
                }
            }
        }

        Ok(names)
    }

    fn is_catalog_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        )
    }
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Question;

    #[test]
    fn test_loader_creation() {
        let _loader = CatalogLoader::new();
    }

    #[test]
    fn test_save_and_load_catalog() {
        let loader = CatalogLoader::new();
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test_catalog.json");

        let mut catalog = QuestionCatalog::new("test", "1.0.0");
        catalog.add_question(Question::new("q1", "Test prompt"));

        loader.save_to_json(&catalog, &file_path).unwrap();
        assert!(file_path.exists());

        let loaded = loader.load_from_json(&file_path).unwrap();
        assert_eq!(loaded.name, catalog.name);
        assert_eq!(loaded.questions.len(), 1);
    }

    #[test]
    fn test_load_dir_skips_non_catalog_files() {
        let loader = CatalogLoader::new();
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let mut catalog = QuestionCatalog::new("a", "1.0.0");
        catalog.add_question(Question::new("q1", "p1"));
        loader
            .save_to_json(&catalog, &temp_dir.path().join("a.json"))
            .unwrap();

        let loaded = loader.load_dir(temp_dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
