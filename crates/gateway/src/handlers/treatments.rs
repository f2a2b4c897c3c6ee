//! Treatment lookup handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use remedy_common::{
    assistant::EnhancedTreatment,
    errors::{AppError, Result},
    treatment::{TreatmentInfo, TreatmentParadigm, TreatmentView, GENERAL_NOTICE},
};

#[derive(Debug, Deserialize)]
pub struct TreatmentQuery {
    pub view: Option<String>,

    #[serde(default)]
    pub enhance: bool,
}

/// One paradigm's treatment as shown to the user
#[derive(Serialize)]
pub struct TreatmentBlock {
    pub paradigm: TreatmentParadigm,
    pub label: &'static str,
    pub text: String,
    pub enhanced: bool,
    pub disclaimer: &'static str,
}

#[derive(Serialize)]
pub struct TreatmentsResponse {
    pub disease: String,
    pub category: String,
    pub symptoms: String,
    pub view: TreatmentView,
    pub treatments: Vec<TreatmentBlock>,
    pub notice: &'static str,
}

/// Treatment texts for `view`, enhanced by the language model when asked
pub(crate) async fn build_treatments(
    state: &AppState,
    info: TreatmentInfo,
    view: TreatmentView,
    enhance: bool,
) -> TreatmentsResponse {
    let paradigms = view.paradigms();

    let texts: Vec<EnhancedTreatment> = if enhance {
        state.enhancer.enhance_all(&info, paradigms).await
    } else {
        paradigms
            .iter()
            .map(|&paradigm| EnhancedTreatment {
                paradigm,
                text: info.treatment(paradigm).to_string(),
                enhanced: false,
            })
            .collect()
    };

    let treatments = texts
        .into_iter()
        .map(|t| TreatmentBlock {
            paradigm: t.paradigm,
            label: t.paradigm.label(),
            text: t.text,
            enhanced: t.enhanced,
            disclaimer: t.paradigm.disclaimer(),
        })
        .collect();

    TreatmentsResponse {
        disease: info.disease,
        category: info.category,
        symptoms: info.symptoms,
        view,
        treatments,
        notice: GENERAL_NOTICE,
    }
}

pub(crate) fn lookup(state: &AppState, disease: &str) -> Result<TreatmentInfo> {
    state
        .kb
        .treatment_info(disease)
        .ok_or_else(|| AppError::DiseaseNotFound {
            name: disease.to_string(),
        })
}

/// Get treatments for a disease
pub async fn get_treatments(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TreatmentQuery>,
) -> Result<Json<TreatmentsResponse>> {
    let view = match query.view.as_deref() {
        Some(view) => view.parse::<TreatmentView>()?,
        None => TreatmentView::All,
    };

    let info = lookup(&state, &name)?;

    tracing::debug!(disease = %name, view = ?view, enhance = query.enhance, "Treatment lookup");

    Ok(Json(build_treatments(&state, info, view, query.enhance).await))
}
