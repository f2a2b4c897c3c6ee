//! Stateless symptom analysis

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::symptoms::validation_error;
use crate::AppState;
use remedy_common::{
    errors::Result,
    find_diseases, metrics, segment_symptoms,
    treatment::GENERAL_NOTICE,
    DiseaseMatch, KnowledgeBase, MatchResults,
};

/// Analysis request
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(max = 100))]
    pub symptoms: Vec<String>,

    /// Run each entry through the segmenter first
    #[serde(default)]
    pub segment: bool,

    /// Return at most this many matches
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    /// Symptoms actually matched, after segmentation
    pub symptoms: Vec<String>,
    pub total_matches: usize,
    pub matches: Vec<DiseaseMatch>,
    pub notice: &'static str,
    pub processing_time_ms: u64,
}

/// Rank diseases for `symptoms` and build the response
///
/// Also returns the full ranking, which `limit` does not truncate.
pub(crate) fn analyze_symptoms(
    kb: &KnowledgeBase,
    symptoms: Vec<String>,
    limit: Option<usize>,
) -> (AnalysisResponse, MatchResults) {
    let start = Instant::now();

    let results = find_diseases(kb.entries(), &symptoms);
    let total_matches = results.len();
    let matches = results.top(limit.unwrap_or(total_matches)).to_vec();

    let elapsed = start.elapsed();
    metrics::record_analysis(elapsed.as_secs_f64(), symptoms.len(), total_matches);

    let response = AnalysisResponse {
        symptoms,
        total_matches,
        matches,
        notice: GENERAL_NOTICE,
        processing_time_ms: elapsed.as_millis() as u64,
    };
    (response, results)
}

/// Analyze a symptom list
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>> {
    request.validate().map_err(validation_error)?;

    let candidates: Vec<String> = if request.segment {
        request
            .symptoms
            .iter()
            .flat_map(|raw| segment_symptoms(raw))
            .collect()
    } else {
        // a blank symptom would be a substring of every disease
        request
            .symptoms
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect()
    };

    // same set semantics as session symptoms, first occurrence wins
    let mut symptoms = Vec::with_capacity(candidates.len());
    for symptom in candidates {
        if !symptoms.contains(&symptom) {
            symptoms.push(symptom);
        }
    }

    let (response, _) = analyze_symptoms(&state.kb, symptoms, request.limit);

    tracing::info!(
        symptoms = response.symptoms.len(),
        matches = response.total_matches,
        "Analysis complete"
    );

    Ok(Json(response))
}
