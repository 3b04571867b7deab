use crate::advisor::{answer_or_fallback, build_advisor, build_prompt, Advisor};
use crate::analysis::{analyze, render_text, Simulator};
use crate::charts::{density_heatmap, gauge, scatter, DEFAULT_HEATMAP_BINS};
use crate::config::AppSettings;
use crate::errors::{AppError, AppResult};
use crate::ingest::Tables;
use crate::models::{Analysis, AnalysisResponse, ChatEntry, DashboardView};
use crate::session::SessionManager;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct DashboardCore {
    settings: Arc<AppSettings>,
    sessions: SessionManager,
    advisor: Arc<dyn Advisor>,
}

impl DashboardCore {
    pub fn new(settings: AppSettings) -> AppResult<Arc<Self>> {
        let advisor: Arc<dyn Advisor> = Arc::from(build_advisor(&settings.advisor)?);
        Ok(Self::with_advisor(settings, advisor))
    }

    pub fn with_advisor(settings: AppSettings, advisor: Arc<dyn Advisor>) -> Arc<Self> {
        tracing::info!(
            advisor = advisor.name(),
            samples = settings.simulation.samples,
            seeded = settings.simulation.seed.is_some(),
            "dashboard core ready"
        );
        let sessions = SessionManager::with_limits(
            settings.max_sessions,
            Duration::from_secs(settings.session_idle_secs),
        );
        Arc::new(Self {
            settings: Arc::new(settings),
            sessions,
            advisor,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub async fn open_session(&self) -> String {
        let session_id = self.sessions.open_session().await;
        tracing::debug!(session_id = %session_id, "session opened");
        session_id
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        self.sessions.close_session(session_id).await
    }

    /// Scores the uploaded tables and replaces the session's previous analysis.
    pub async fn run_analysis(&self, session_id: &str, tables: Tables) -> AppResult<AnalysisResponse> {
        if !self.sessions.contains(session_id).await {
            return Err(AppError::NotFound(format!("No active session {}", session_id)));
        }

        let mut simulator = Simulator::new(&self.settings.simulation);
        let analysis = analyze(&tables, &mut simulator);
        tracing::info!(
            session_id = %session_id,
            projects = tables.projects.len(),
            scored = analysis.rows.len(),
            skipped = analysis.skipped_projects.len(),
            "analysis complete"
        );

        let response = AnalysisResponse {
            project_count: analysis.rows.len(),
            skipped_projects: analysis.skipped_projects.clone(),
            analyzed_at: analysis.analyzed_at,
        };
        self.sessions
            .with_session(session_id, |state| state.analysis = Some(analysis))
            .await?;
        Ok(response)
    }

    pub async fn dashboard(&self, session_id: &str) -> AppResult<Option<DashboardView>> {
        let state = self.sessions.snapshot(session_id).await?;
        Ok(state.analysis.as_ref().and_then(build_view))
    }

    pub async fn ask(&self, session_id: &str, question: &str) -> AppResult<ChatEntry> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Input("Question cannot be empty".to_string()));
        }

        let state = self.sessions.snapshot(session_id).await?;
        let rows = state.analysis.as_ref().map(|analysis| analysis.rows.as_slice());
        let prompt = build_prompt(question, rows);
        let (answer, source) = answer_or_fallback(self.advisor.as_ref(), &prompt).await;
        tracing::info!(session_id = %session_id, source = source.as_str(), "advisor answered");

        let entry = ChatEntry {
            question: question.to_string(),
            answer,
            source,
            asked_at: Utc::now(),
        };
        self.sessions
            .with_session(session_id, |state| state.chat.push(entry.clone()))
            .await?;
        Ok(entry)
    }

    pub async fn chat(&self, session_id: &str) -> AppResult<Vec<ChatEntry>> {
        Ok(self.sessions.snapshot(session_id).await?.chat)
    }
}

/// Everything the page renders for one analysis. `None` when nothing was scored.
pub fn build_view(analysis: &Analysis) -> Option<DashboardView> {
    let summary = analysis.summary.clone()?;
    Some(DashboardView {
        summary_text: render_text(&summary),
        gauge: gauge(&summary),
        scatter: scatter(&analysis.rows),
        heatmap: density_heatmap(&analysis.rows, DEFAULT_HEATMAP_BINS),
        rows: analysis.rows.clone(),
        skipped_projects: analysis.skipped_projects.clone(),
        analyzed_at: analysis.analyzed_at,
        summary,
    })
}
