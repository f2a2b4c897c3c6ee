//! Consultation session handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::analysis::{analyze_symptoms, AnalysisResponse};
use super::symptoms::validation_error;
use super::treatments::{build_treatments, lookup, TreatmentsResponse};
use crate::AppState;
use remedy_common::{
    assistant::{self, ChatContext},
    errors::{AppError, Result},
    session::{ChatMessage, ChatRole, ConsultationSession},
    treatment::TreatmentView,
};

/// Session state response
#[derive(Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: ConsultationSession,
    pub expires_at: DateTime<Utc>,
}

impl SessionResponse {
    fn new(state: &AppState, session: ConsultationSession) -> Self {
        let expires_at = session.expires_at(state.sessions.ttl());
        Self { session, expires_at }
    }
}

fn default_true() -> bool {
    true
}

/// Add symptoms request
#[derive(Debug, Deserialize, Validate)]
pub struct AddSymptomsRequest {
    #[validate(length(min = 1, max = 50))]
    pub symptoms: Vec<String>,

    /// Split compound entries such as "cough, fever" (checklist picks send false)
    #[serde(default = "default_true")]
    pub segment: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DescribeRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Serialize)]
pub struct DescribeResponse {
    pub extracted: Vec<String>,
    pub session: SessionResponse,
}

/// Select a disease and/or treatment view
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub disease: Option<String>,
    pub view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct ModeResponse {
    pub llm_mode: bool,

    /// False when the mode is on but no language model is configured
    pub language_model_available: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub history: Vec<ChatMessage>,
}

/// Create a new session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionResponse::new(&state, session)))
}

/// Get session state
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(SessionResponse::new(&state, session)))
}

/// Add symptoms to a session
pub async fn add_symptoms(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddSymptomsRequest>,
) -> Result<Json<SessionResponse>> {
    request.validate().map_err(validation_error)?;

    let session = state
        .sessions
        .add_symptoms(session_id, &request.symptoms, request.segment)
        .await?;

    tracing::debug!(
        session_id = %session_id,
        symptoms = session.symptoms.len(),
        "Symptoms added"
    );

    Ok(Json(SessionResponse::new(&state, session)))
}

/// Clear all symptoms and the results built on them
pub async fn clear_symptoms(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.clear_symptoms(session_id).await?;
    Ok(Json(SessionResponse::new(&state, session)))
}

/// Remove one symptom
pub async fn remove_symptom(
    State(state): State<AppState>,
    Path((session_id, symptom)): Path<(Uuid, String)>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.remove_symptom(session_id, &symptom).await?;
    Ok(Json(SessionResponse::new(&state, session)))
}

/// Extract symptoms from a description and add them to the session
pub async fn describe(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<DescribeRequest>,
) -> Result<Json<DescribeResponse>> {
    request.validate().map_err(validation_error)?;

    // fail fast before spending a model call on a dead session
    state.sessions.get(session_id).await?;

    let extracted = assistant::extract_symptoms(state.llm.as_deref(), &request.text).await?;

    let session = if extracted.is_empty() {
        state.sessions.get(session_id).await?
    } else {
        state
            .sessions
            .add_symptoms(session_id, &extracted, false)
            .await?;
        state
            .sessions
            .push_chat(session_id, ChatRole::User, request.text.as_str())
            .await?;
        state
            .sessions
            .push_chat(
                session_id,
                ChatRole::Assistant,
                format!("I've identified these symptoms: {}", extracted.join(", ")),
            )
            .await?
    };

    Ok(Json(DescribeResponse {
        extracted,
        session: SessionResponse::new(&state, session),
    }))
}

/// Analyze the session's symptoms and store the result
pub async fn analyze_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>> {
    let session = state.sessions.get(session_id).await?;

    let (response, results) = analyze_symptoms(&state.kb, session.symptoms, None);
    state.sessions.record_analysis(session_id, results).await?;

    tracing::info!(
        session_id = %session_id,
        matches = response.total_matches,
        "Session analysis complete"
    );

    Ok(Json(response))
}

/// Select a disease to view and/or change the treatment view
pub async fn update_selection(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SessionResponse>> {
    if request.disease.is_none() && request.view.is_none() {
        return Err(AppError::Validation {
            message: "Either disease or view must be provided".to_string(),
            field: None,
        });
    }

    let view = request
        .view
        .as_deref()
        .map(str::parse::<TreatmentView>)
        .transpose()?;

    let mut session = match &request.disease {
        Some(disease) => {
            lookup(&state, disease)?;
            state.sessions.select_disease(session_id, disease).await?
        }
        None => state.sessions.get(session_id).await?,
    };

    if let Some(view) = view {
        session = state.sessions.set_treatment_view(session_id, view).await?;
    }

    Ok(Json(SessionResponse::new(&state, session)))
}

/// Toggle language-model mode
pub async fn set_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<ModeResponse>> {
    let session = state.sessions.set_llm_mode(session_id, request.enabled).await?;

    if session.llm_mode && state.llm.is_none() {
        tracing::warn!(session_id = %session_id, "Language model mode enabled but no model configured");
    }

    Ok(Json(ModeResponse {
        llm_mode: session.llm_mode,
        language_model_available: state.llm.is_some(),
    }))
}

/// Treatments for the selected disease, enhanced when the session's mode is on
pub async fn session_treatments(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<TreatmentsResponse>> {
    let session = state.sessions.get(session_id).await?;

    let disease = session.selected_disease.ok_or_else(|| AppError::Validation {
        message: "No disease selected".to_string(),
        field: Some("disease".to_string()),
    })?;
    let info = lookup(&state, &disease)?;

    Ok(Json(
        build_treatments(&state, info, session.treatment_view, session.llm_mode).await,
    ))
}

/// Ask a follow-up question about the consultation
pub async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate().map_err(validation_error)?;

    let session = state.sessions.get(session_id).await?;
    let context = ChatContext {
        viewing: session
            .selected_disease
            .as_deref()
            .and_then(|disease| state.kb.treatment_info(disease)),
        symptoms: session.symptoms,
    };

    let answer =
        assistant::answer_question(state.llm.as_deref(), &context, &request.question).await?;

    state
        .sessions
        .push_chat(session_id, ChatRole::User, request.question)
        .await?;
    let session = state
        .sessions
        .push_chat(session_id, ChatRole::Assistant, answer.as_str())
        .await?;

    Ok(Json(ChatResponse {
        answer,
        history: session.chat_history,
    }))
}
