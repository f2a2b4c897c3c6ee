//! Consultation sessions
//!
//! Server-held state for one user's consultation: the symptoms gathered so
//! far, the last analysis, the disease being viewed and the chat history.
//! Sessions live in memory and expire after an idle TTL.

use crate::analysis::{segment_symptoms, MatchResults};
use crate::config::SessionConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::treatment::TreatmentView;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// State of one consultation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSession {
    pub id: Uuid,

    /// Symptoms in first-insertion order, no exact duplicates
    pub symptoms: Vec<String>,

    /// Result of the last analysis
    pub detected_diseases: Option<MatchResults>,

    pub selected_disease: Option<String>,
    pub treatment_view: TreatmentView,
    pub chat_history: Vec<ChatMessage>,

    /// Whether treatment texts are enhanced by the language model
    pub llm_mode: bool,

    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl ConsultationSession {
    fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            symptoms: Vec::new(),
            detected_diseases: None,
            selected_disease: None,
            treatment_view: TreatmentView::default(),
            chat_history: Vec::new(),
            llm_mode: false,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Check if the session has been idle longer than `ttl` at `now`
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_active_at > ttl
    }

    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.last_active_at + ttl
    }

    /// Add a symptom unless already present; returns whether it was added
    fn insert_symptom(&mut self, symptom: &str) -> bool {
        let symptom = symptom.trim();
        if symptom.is_empty() || self.symptoms.iter().any(|s| s == symptom) {
            return false;
        }
        self.symptoms.push(symptom.to_string());
        true
    }
}

/// In-memory session store with idle expiry
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, ConsultationSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::minutes(config.ttl_minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of sessions held, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Start a new, empty session
    pub async fn create(&self) -> ConsultationSession {
        let session = ConsultationSession::new(Uuid::new_v4());

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        metrics::record_sessions(sessions.len());

        tracing::info!(session_id = %session.id, "Session created");
        session
    }

    /// Current state of a session
    pub async fn get(&self, id: Uuid) -> Result<ConsultationSession> {
        self.update(id, |_| {}).await
    }

    /// Add raw symptom entries
    ///
    /// With `segment`, each entry is split by the segmenter first. Symptoms
    /// already present are skipped.
    pub async fn add_symptoms(
        &self,
        id: Uuid,
        entries: &[String],
        segment: bool,
    ) -> Result<ConsultationSession> {
        self.update(id, |session| {
            for entry in entries {
                if segment {
                    for symptom in segment_symptoms(entry) {
                        session.insert_symptom(&symptom);
                    }
                } else {
                    session.insert_symptom(entry);
                }
            }
        })
        .await
    }

    /// Add one symptom verbatim
    pub async fn add_symptom(&self, id: Uuid, symptom: &str) -> Result<ConsultationSession> {
        self.update(id, |session| {
            session.insert_symptom(symptom);
        })
        .await
    }

    /// Remove one symptom; absent symptoms are ignored
    pub async fn remove_symptom(&self, id: Uuid, symptom: &str) -> Result<ConsultationSession> {
        self.update(id, |session| session.symptoms.retain(|s| s != symptom))
            .await
    }

    /// Clear symptoms along with the analysis and selection built on them
    pub async fn clear_symptoms(&self, id: Uuid) -> Result<ConsultationSession> {
        self.update(id, |session| {
            session.symptoms.clear();
            session.detected_diseases = None;
            session.selected_disease = None;
        })
        .await
    }

    /// Store an analysis result; any previous selection no longer applies
    pub async fn record_analysis(
        &self,
        id: Uuid,
        results: MatchResults,
    ) -> Result<ConsultationSession> {
        self.update(id, move |session| {
            session.detected_diseases = Some(results);
            session.selected_disease = None;
            session.treatment_view = TreatmentView::All;
        })
        .await
    }

    /// Select a disease to view, showing all paradigms
    pub async fn select_disease(&self, id: Uuid, disease: &str) -> Result<ConsultationSession> {
        self.update(id, |session| {
            session.selected_disease = Some(disease.to_string());
            session.treatment_view = TreatmentView::All;
        })
        .await
    }

    pub async fn set_treatment_view(
        &self,
        id: Uuid,
        view: TreatmentView,
    ) -> Result<ConsultationSession> {
        self.update(id, |session| session.treatment_view = view).await
    }

    pub async fn set_llm_mode(&self, id: Uuid, enabled: bool) -> Result<ConsultationSession> {
        self.update(id, |session| session.llm_mode = enabled).await
    }

    /// Append a message to the chat history
    pub async fn push_chat(
        &self,
        id: Uuid,
        role: ChatRole,
        content: impl Into<String>,
    ) -> Result<ConsultationSession> {
        let message = ChatMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        };
        self.update(id, move |session| session.chat_history.push(message))
            .await
    }

    /// Drop idle sessions, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(self.ttl, now));
        let removed = before - sessions.len();

        metrics::record_sessions(sessions.len());
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Expired sessions purged");
        }
        removed
    }

    /// Apply `f` to a live session and return a snapshot of the result
    ///
    /// Expired sessions are removed and reported as not found.
    async fn update<F>(&self, id: Uuid, f: F) -> Result<ConsultationSession>
    where
        F: FnOnce(&mut ConsultationSession),
    {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(&id) {
            None => return Err(AppError::SessionNotFound { id: id.to_string() }),
            Some(session) => session.is_expired_at(self.ttl, now),
        };
        if expired {
            sessions.remove(&id);
            tracing::debug!(session_id = %id, "Session expired");
            return Err(AppError::SessionNotFound { id: id.to_string() });
        }

        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })?;
        f(session);
        session.last_active_at = now;
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::find_diseases;
    use crate::knowledge::fixtures::sample_kb;
    use tokio_test::{assert_err, assert_ok};

    fn store() -> SessionStore {
        SessionStore::new(Duration::minutes(30))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let session = store.create().await;

        let fetched = store.get(session.id).await.unwrap();
        assert_eq!(fetched.id, session.id);
        assert!(fetched.symptoms.is_empty());
        assert_eq!(fetched.treatment_view, TreatmentView::All);
        assert!(!fetched.llm_mode);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = store();
        let id = Uuid::new_v4();

        assert!(matches!(store.get(id).await, Err(AppError::SessionNotFound { .. })));
        assert_err!(store.add_symptom(id, "fever").await);
        assert_err!(store.set_llm_mode(id, true).await);
    }

    #[tokio::test]
    async fn test_add_symptoms_segments_and_dedups() {
        let store = store();
        let id = store.create().await.id;

        store
            .add_symptoms(id, &strings(&["cough, fever"]), true)
            .await
            .unwrap();
        let session = store
            .add_symptoms(id, &strings(&["fever; headache", "CoughChills"]), true)
            .await
            .unwrap();

        assert_eq!(session.symptoms, vec!["cough", "fever", "headache", "Cough", "Chills"]);
    }

    #[tokio::test]
    async fn test_add_symptoms_unsegmented() {
        let store = store();
        let id = store.create().await.id;

        let session = store
            .add_symptoms(id, &strings(&["cough, fever", "cough, fever", "  "]), false)
            .await
            .unwrap();
        assert_eq!(session.symptoms, vec!["cough, fever"]);
    }

    #[tokio::test]
    async fn test_add_and_remove_single() {
        let store = store();
        let id = store.create().await.id;

        assert_ok!(store.add_symptom(id, "Fever").await);
        assert_ok!(store.add_symptom(id, "Fever").await);
        assert_ok!(store.add_symptom(id, "Rash").await);
        let session = store.remove_symptom(id, "Fever").await.unwrap();
        assert_eq!(session.symptoms, vec!["Rash"]);

        // removing something absent is not an error
        let session = store.remove_symptom(id, "Nausea").await.unwrap();
        assert_eq!(session.symptoms, vec!["Rash"]);
    }

    #[tokio::test]
    async fn test_analysis_then_selection_then_clear() {
        let store = store();
        let kb = sample_kb();
        let id = store.create().await.id;

        let session = store.add_symptom(id, "cough").await.unwrap();
        let results = find_diseases(kb.entries(), &session.symptoms);
        store.record_analysis(id, results).await.unwrap();

        store.select_disease(id, "Flu").await.unwrap();
        let session = store
            .set_treatment_view(id, TreatmentView::Homeopathic)
            .await
            .unwrap();
        assert_eq!(session.selected_disease.as_deref(), Some("Flu"));
        assert_eq!(session.treatment_view, TreatmentView::Homeopathic);
        assert!(session.detected_diseases.as_ref().unwrap().contains("Flu"));

        // selecting again resets the view
        let session = store.select_disease(id, "Common Cold").await.unwrap();
        assert_eq!(session.treatment_view, TreatmentView::All);

        let session = store.clear_symptoms(id).await.unwrap();
        assert!(session.symptoms.is_empty());
        assert!(session.detected_diseases.is_none());
        assert!(session.selected_disease.is_none());
    }

    #[tokio::test]
    async fn test_new_analysis_resets_selection() {
        let store = store();
        let id = store.create().await.id;

        store.select_disease(id, "Flu").await.unwrap();
        let session = store
            .record_analysis(id, MatchResults::default())
            .await
            .unwrap();
        assert!(session.selected_disease.is_none());
    }

    #[tokio::test]
    async fn test_chat_and_mode() {
        let store = store();
        let id = store.create().await.id;

        store.set_llm_mode(id, true).await.unwrap();
        store.push_chat(id, ChatRole::User, "Is it serious?").await.unwrap();
        let session = store
            .push_chat(id, ChatRole::Assistant, "Please see a doctor.")
            .await
            .unwrap();

        assert!(session.llm_mode);
        assert_eq!(session.chat_history.len(), 2);
        assert_eq!(session.chat_history[0].role, ChatRole::User);
        assert_eq!(session.chat_history[1].content, "Please see a doctor.");
    }

    #[tokio::test]
    async fn test_expired_session_not_found() {
        let store = SessionStore::new(Duration::zero());
        let id = store.create().await.id;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(matches!(
            store.get(id).await,
            Err(AppError::SessionNotFound { .. })
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::zero());
        store.create().await;
        store.create().await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_expiry_is_idle_based() {
        let session = ConsultationSession::new(Uuid::new_v4());
        let ttl = Duration::minutes(30);

        assert!(!session.is_expired_at(ttl, session.last_active_at + Duration::minutes(29)));
        assert!(session.is_expired_at(ttl, session.last_active_at + Duration::minutes(31)));
        assert_eq!(session.expires_at(ttl), session.last_active_at + ttl);
    }

    #[test]
    fn test_chat_role_serde() {
        assert_eq!(serde_json::to_string(&ChatRole::Assistant).unwrap(), "\"assistant\"");
    }
}
