//! Symptom input handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use remedy_common::{
    assistant,
    catalog::{BodyRegion, COMMON_SYMPTOMS},
    errors::{AppError, Result},
    knowledge::DEFAULT_SUGGESTION_LIMIT,
    segment_symptoms,
};

/// Free-text symptom entry
#[derive(Debug, Deserialize, Validate)]
pub struct TextRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Serialize)]
pub struct SymptomsResponse {
    pub symptoms: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
pub struct SymptomDiseasesResponse {
    pub symptom: String,
    pub diseases: Vec<String>,
}

#[derive(Serialize)]
pub struct BodyRegionResponse {
    pub region: BodyRegion,
    pub name: String,
    pub symptoms: Vec<String>,
}

pub(crate) fn validation_error(e: validator::ValidationErrors) -> AppError {
    AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|k| k.to_string()),
    }
}

/// Split one raw entry into symptoms
pub async fn segment(Json(request): Json<TextRequest>) -> Result<Json<SymptomsResponse>> {
    request.validate().map_err(validation_error)?;

    Ok(Json(SymptomsResponse {
        symptoms: segment_symptoms(&request.text),
    }))
}

/// Autocomplete against known symptoms
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>> {
    query.validate().map_err(validation_error)?;

    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    let suggestions = state.index.suggest(&query.q, limit);

    Ok(Json(SuggestResponse {
        query: query.q,
        suggestions,
    }))
}

/// Diseases listing a known symptom
pub async fn diseases(
    State(state): State<AppState>,
    Path(symptom): Path<String>,
) -> Json<SymptomDiseasesResponse> {
    let diseases = state.index.diseases_for(&symptom).to_vec();
    Json(SymptomDiseasesResponse { symptom, diseases })
}

/// Quick-pick checklist
pub async fn common() -> Json<SymptomsResponse> {
    Json(SymptomsResponse {
        symptoms: COMMON_SYMPTOMS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Suggested symptoms for a body area
pub async fn body_region(Path(region): Path<String>) -> Result<Json<BodyRegionResponse>> {
    let region: BodyRegion = region.parse()?;

    Ok(Json(BodyRegionResponse {
        region,
        name: region.display_name(),
        symptoms: region
            .suggested_symptoms()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }))
}

/// Extract symptoms from a natural-language description
pub async fn extract(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Result<Json<SymptomsResponse>> {
    request.validate().map_err(validation_error)?;

    let symptoms = assistant::extract_symptoms(state.llm.as_deref(), &request.text).await?;
    Ok(Json(SymptomsResponse { symptoms }))
}
