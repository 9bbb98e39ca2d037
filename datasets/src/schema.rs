// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Question catalog schema, with validation.
//!
//! A catalog file (JSON or YAML) declares a named, versioned set of
//! questions. Questions are the unit `JobSpec.questions` references by
//! `question_id`; the catalog itself is read-only to the intake API —
//! authoring happens by editing catalog files, not through HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::collections::HashMap;

/// A named, versioned collection of questions.
///
/// # Example
///
/// ```
/// use inference_mesh_datasets::schema::{QuestionCatalog, Question};
/// use serde_valid::Validate;
///
/// let catalog = QuestionCatalog {
///     name: "bias-probe-v1".to_string(),
///     description: Some("Baseline bias probe set".to_string()),
///     version: "1.0.0".to_string(),
///     questions: vec![
///         Question::new("q-1", "Describe a typical nurse.").with_category("bias"),
///     ],
///     metadata: None,
/// };
///
/// assert!(catalog.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionCatalog {
    /// Catalog name (required, minimum length 1).
    #[validate(min_length = 1)]
    pub name: String,

    /// Human-readable description.
    pub description: Option<String>,

    /// Catalog version (semantic versioning recommended).
    pub version: String,

    /// Questions (required, minimum 1).
    #[validate(min_items = 1)]
    pub questions: Vec<Question>,

    /// Additional catalog-level metadata.
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// A single question in a catalog, per spec §4.10.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Opaque identifier referenced by `JobSpec.questions` (required,
    /// minimum length 1).
    #[validate(min_length = 1)]
    pub question_id: String,

    /// The prompt text sent to providers (required, minimum length 1).
    #[validate(min_length = 1)]
    pub prompt_text: String,

    /// Grouping category, e.g. `"bias"`, `"factual"`.
    pub category: Option<String>,

    /// Free-form tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// When this question was added to the catalog. Defaults to the
    /// load time if absent in the source file.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Question-specific metadata.
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl QuestionCatalog {
    /// Creates an empty catalog with the given name and version.
    ///
    /// # Example
    ///
    /// ```
    /// use inference_mesh_datasets::schema::QuestionCatalog;
    ///
    /// let catalog = QuestionCatalog::new("my-catalog", "1.0.0");
    /// assert_eq!(catalog.name, "my-catalog");
    /// ```
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: version.into(),
            questions: Vec::new(),
            metadata: None,
        }
    }

    /// Sets the catalog description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a question to the catalog.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Returns questions in the given category.
    pub fn filter_by_category(&self, category: &str) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.category.as_deref() == Some(category))
            .collect()
    }

    /// Returns questions carrying the given tag.
    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Looks up a question by id.
    pub fn find(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// Total number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the catalog has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Question {
    /// Creates a question with the given id and prompt.
    ///
    /// # Example
    ///
    /// ```
    /// use inference_mesh_datasets::schema::Question;
    ///
    /// let question = Question::new("q-1", "Explain Rust ownership");
    /// assert_eq!(question.question_id, "q-1");
    /// ```
    pub fn new(question_id: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            prompt_text: prompt_text.into(),
            category: None,
            tags: Vec::new(),
            created_at: Utc::now(),
            metadata: None,
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_creation() {
        let catalog = QuestionCatalog::new("catalog-1", "1.0.0").with_description("desc");
        assert_eq!(catalog.name, "catalog-1");
        assert_eq!(catalog.version, "1.0.0");
        assert_eq!(catalog.description, Some("desc".to_string()));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_catalog_validation_empty_name() {
        let catalog = QuestionCatalog {
            name: "".to_string(),
            description: None,
            version: "1.0.0".to_string(),
            questions: vec![Question::new("q-1", "prompt")],
            metadata: None,
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_catalog_validation_no_questions() {
        let catalog = QuestionCatalog {
            name: "catalog".to_string(),
            description: None,
            version: "1.0.0".to_string(),
            questions: vec![],
            metadata: None,
        };
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_catalog_validation_valid() {
        let catalog = QuestionCatalog {
            name: "catalog".to_string(),
            description: None,
            version: "1.0.0".to_string(),
            questions: vec![Question::new("q-1", "prompt")],
            metadata: None,
        };
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_question_creation() {
        let question = Question::new("q-1", "What is Rust?")
            .with_category("qa")
            .with_tag("beginner");
        assert_eq!(question.question_id, "q-1");
        assert_eq!(question.category, Some("qa".to_string()));
        assert_eq!(question.tags, vec!["beginner".to_string()]);
    }

    #[test]
    fn test_filter_by_category() {
        let mut catalog = QuestionCatalog::new("catalog", "1.0.0");
        catalog.add_question(Question::new("q1", "p1").with_category("bias"));
        catalog.add_question(Question::new("q2", "p2").with_category("factual"));
        catalog.add_question(Question::new("q3", "p3").with_category("bias"));

        assert_eq!(catalog.filter_by_category("bias").len(), 2);
    }

    #[test]
    fn test_filter_by_tag() {
        let mut catalog = QuestionCatalog::new("catalog", "1.0.0");
        catalog.add_question(Question::new("q1", "p1").with_tag("gender"));
        catalog.add_question(Question::new("q2", "p2").with_tag("race"));

        assert_eq!(catalog.filter_by_tag("gender").len(), 1);
    }

    #[test]
    fn test_find_by_id() {
        let mut catalog = QuestionCatalog::new("catalog", "1.0.0");
        catalog.add_question(Question::new("q1", "p1"));
        assert!(catalog.find("q1").is_some());
        assert!(catalog.find("missing").is_none());
    }
}
