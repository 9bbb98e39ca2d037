// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `GET /api/v1/questions`: serves the question catalogs loaded at
//! startup.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Query params for `GET /api/v1/questions`.
#[derive(Debug, Deserialize)]
pub struct ListQuestionsParams {
    category: Option<String>,
    tag: Option<String>,
}

/// A catalog's name and version alongside the questions that survived
/// the request's filters.
#[derive(Debug, Serialize)]
struct CatalogView<'a> {
    name: &'a str,
    version: &'a str,
    questions: Vec<&'a inference_mesh_datasets::schema::Question>,
}

/// Lists every loaded catalog, each optionally filtered by category or
/// tag. No auth is required: question text is not sensitive.
pub async fn list(State(state): State<AppState>, Query(params): Query<ListQuestionsParams>) -> Response {
    let views: Vec<_> = state
        .catalogs
        .iter()
        .map(|catalog| {
            let questions = match (&params.category, &params.tag) {
                (Some(category), _) => catalog.filter_by_category(category),
                (None, Some(tag)) => catalog.filter_by_tag(tag),
                (None, None) => catalog.questions.iter().collect(),
            };
            CatalogView {
                name: &catalog.name,
                version: &catalog.version,
                questions,
            }
        })
        .collect();

    Json(views).into_response()
}
