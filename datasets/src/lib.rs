// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Inference Mesh Datasets
//!
//! Question catalog management for the intake API's `GET
//! /api/v1/questions` endpoint (spec §4.10). A catalog is a named,
//! versioned set of questions; `JobSpec.questions` references
//! questions by `question_id`.
//!
//! ## Modules
//!
//! - `schema`: catalog/question schema with validation.
//! - `loader`: JSON/YAML catalog loading and saving.
//! - `builtin`: ready-to-use catalogs shipped by default.
//!
//! ## Example
//!
//! ```no_run
//! use inference_mesh_datasets::loader::CatalogLoader;
//! use std::path::Path;
//!
//! let loader = CatalogLoader::new();
//! let catalog = loader.load(Path::new("catalogs/bias-probes.json")).unwrap();
//! println!("{} questions loaded", catalog.questions.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::correctness)]

pub mod builtin;
pub mod loader;
pub mod schema;

pub use schema::{Question, QuestionCatalog};

use thiserror::Error;

/// Errors raised while loading or validating question catalogs.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Catalog not found.
    #[error("catalog not found: {0}")]
    NotFound(String),

    /// I/O error reading or writing a catalog file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Catalog failed schema validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = DatasetError::NotFound("bias-probes".to_string());
        assert_eq!(err.to_string(), "catalog not found: bias-probes");
    }
}
