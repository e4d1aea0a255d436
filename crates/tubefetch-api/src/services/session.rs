//! Session orchestration.
//!
//! A session holds everything one user sees: the analysis in flight, the
//! located video, its insights and the download lifecycle. All events for a
//! session go out on one broadcast channel, which the WebSocket handler
//! forwards to the client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tubefetch_lifecycle::{Clock, LifecycleConfig, LifecycleRunner};
use tubefetch_models::{
    download_option, AiInsights, DownloadOption, DownloadSnapshot, VideoDetails, WsMessage,
    DOWNLOAD_OPTIONS,
};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::form::{validate_submission, validate_title};
use crate::metrics;
use crate::services::gemini::{InsightGenerator, InsightOutcome};

/// Capacity of each session's event channel.
const EVENT_BUFFER_SIZE: usize = 256;

/// Idle sessions are evicted after this long.
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Maximum number of live sessions.
const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Title shown when neither a manual title nor insights exist.
const DEFAULT_TITLE: &str = "Video Found";

/// Mutable state of one session.
pub struct SessionContext {
    pub loading: bool,
    pub video: Option<VideoDetails>,
    pub insights: Option<AiInsights>,
    pub insight_source: Option<&'static str>,
    pub generating: bool,
    /// Bumped on every analysis; completions from older analyses are dropped
    analysis_generation: u64,
    runner: Arc<LifecycleRunner>,
}

impl SessionContext {
    /// Preview heading: manual title, then suggested file name, then a default.
    pub fn display_title(&self) -> Option<String> {
        let video = self.video.as_ref()?;
        let title = video
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.insights.as_ref().map(|i| i.suggested_file_name.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Some(title)
    }
}

/// Serialized view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<AiInsights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_source: Option<&'static str>,
    pub generating: bool,
    pub download: DownloadSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_label: Option<&'static str>,
    pub selected_option: DownloadOption,
}

/// One user session.
pub struct Session {
    id: Uuid,
    events: broadcast::Sender<WsMessage>,
    state: RwLock<SessionContext>,
    analysis: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// Clock reading of the last access, in nanoseconds
    last_seen: AtomicU64,
}

impl Session {
    fn new(id: Uuid, events: broadcast::Sender<WsMessage>, runner: LifecycleRunner) -> Self {
        Self {
            id,
            events,
            state: RwLock::new(SessionContext {
                loading: false,
                video: None,
                insights: None,
                insight_source: None,
                generating: false,
                analysis_generation: 0,
                runner: Arc::new(runner),
            }),
            analysis: std::sync::Mutex::new(None),
            last_seen: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to this session's events.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.events.subscribe()
    }

    /// Current download lifecycle runner.
    pub async fn runner(&self) -> Arc<LifecycleRunner> {
        Arc::clone(&self.state.read().await.runner)
    }

    pub async fn view(&self) -> SessionView {
        let ctx = self.state.read().await;
        let download = ctx.runner.snapshot().await;
        let selected_option = download_option(download.selected_option)
            .copied()
            .unwrap_or(DOWNLOAD_OPTIONS[0]);

        SessionView {
            session_id: self.id,
            loading: ctx.loading,
            video: ctx.video.clone(),
            display_title: ctx.display_title(),
            insights: ctx.insights.clone(),
            insight_source: ctx.insight_source,
            generating: ctx.generating,
            download,
            download_label: download.label(),
            selected_option,
        }
    }

    /// Wait for the pending analysis, if any.
    pub async fn join_analysis(&self) {
        let handle = match self.analysis.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(session_id = %self.id, "Analysis task panicked: {}", e);
                }
            }
        }
    }

    fn touch(&self, now: Duration) {
        self.last_seen.store(now.as_nanos() as u64, Ordering::SeqCst);
    }

    fn last_seen(&self) -> Duration {
        Duration::from_nanos(self.last_seen.load(Ordering::SeqCst))
    }

    /// Stop the pending analysis timer and the download driver.
    pub async fn shutdown(&self) {
        self.replace_analysis(None);
        self.state.read().await.runner.shutdown();
    }

    fn replace_analysis(&self, handle: Option<JoinHandle<()>>) {
        if let Ok(mut guard) = self.analysis.lock() {
            if let Some(previous) = std::mem::replace(&mut *guard, handle) {
                previous.abort();
            }
        }
    }

    fn publish(&self, message: WsMessage) {
        // No subscribers is fine; the view stays queryable.
        let _ = self.events.send(message);
    }

    async fn complete_analysis(&self, generation: u64, url: &str) {
        let mut ctx = self.state.write().await;
        if ctx.analysis_generation != generation {
            debug!(session_id = %self.id, generation, "Discarding superseded analysis");
            return;
        }

        ctx.loading = false;
        match VideoDetails::from_url(url) {
            Ok(video) => {
                info!(session_id = %self.id, video_id = %video.id, "Video found");
                metrics::record_analysis(true);
                ctx.video = Some(video.clone());
                self.publish(WsMessage::VideoFound { video });
            }
            Err(e) => {
                warn!(session_id = %self.id, "No video found: {}", e);
                metrics::record_analysis(false);
                self.publish(WsMessage::VideoNotFound);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.replace_analysis(None);
    }
}

/// In-memory session registry with idle expiry and a size cap.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Insert a session, evicting expired ones and then the least recently
    /// seen while at capacity. Returns the new count and the evicted sessions.
    pub async fn insert(
        &self,
        session: Arc<Session>,
        now: Duration,
    ) -> (usize, Vec<Arc<Session>>) {
        session.touch(now);
        let mut sessions = self.sessions.write().await;

        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| now.saturating_sub(s.last_seen()) >= self.ttl)
            .map(|(id, _)| *id)
            .collect();
        let mut evicted: Vec<Arc<Session>> =
            expired.iter().filter_map(|id| sessions.remove(id)).collect();

        if sessions.len() >= self.max_entries {
            let mut by_age: Vec<(Uuid, Duration)> =
                sessions.iter().map(|(id, s)| (*id, s.last_seen())).collect();
            by_age.sort_by_key(|(_, seen)| *seen);

            let to_remove = sessions.len() + 1 - self.max_entries;
            for (id, _) in by_age.into_iter().take(to_remove) {
                evicted.extend(sessions.remove(&id));
            }
            warn!("Session store at capacity, evicted {} sessions", to_remove);
        }

        sessions.insert(session.id(), session);
        (sessions.len(), evicted)
    }

    /// Look up a session and mark it as seen.
    pub async fn get(&self, id: Uuid, now: Duration) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch(now);
        Some(session)
    }

    pub async fn remove(&self, id: Uuid) -> Option<(Arc<Session>, usize)> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(&id)?;
        Some((session, sessions.len()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session operations: analysis, insights and download actions.
pub struct SessionService {
    store: SessionStore,
    clock: Arc<dyn Clock>,
    insights: Arc<dyn InsightGenerator>,
    lifecycle: LifecycleConfig,
    analyze_delay: Duration,
}

impl SessionService {
    pub fn new(
        clock: Arc<dyn Clock>,
        insights: Arc<dyn InsightGenerator>,
        lifecycle: LifecycleConfig,
        analyze_delay: Duration,
    ) -> Self {
        Self {
            store: SessionStore::default(),
            clock,
            insights,
            lifecycle,
            analyze_delay,
        }
    }

    /// Replace the idle expiry and session cap.
    pub fn with_limits(mut self, ttl: Duration, max_sessions: usize) -> Self {
        self.store = SessionStore::new(ttl, max_sessions);
        self
    }

    fn new_runner(&self, events: &broadcast::Sender<WsMessage>) -> LifecycleRunner {
        LifecycleRunner::new(self.lifecycle, Arc::clone(&self.clock), events.clone())
    }

    /// Whether insights can be generated live (otherwise always fallback).
    pub fn insights_live(&self) -> bool {
        self.insights.is_live()
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }

    pub async fn create(&self) -> Arc<Session> {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let runner = self.new_runner(&events);
        let session = Arc::new(Session::new(Uuid::new_v4(), events, runner));

        let (count, evicted) = self
            .store
            .insert(Arc::clone(&session), self.clock.now())
            .await;
        for stale in evicted {
            stale.shutdown().await;
            info!(session_id = %stale.id(), "Session evicted");
        }
        metrics::set_active_sessions(count);
        info!(session_id = %session.id(), "Session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Arc<Session>> {
        self.store
            .get(id, self.clock.now())
            .await
            .ok_or_else(|| ApiError::not_found(format!("Session {} not found", id)))
    }

    /// Remove a session and stop its timers.
    pub async fn remove(&self, id: Uuid) -> ApiResult<()> {
        let (session, count) = self
            .store
            .remove(id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("Session {} not found", id)))?;
        session.shutdown().await;
        metrics::set_active_sessions(count);
        info!(session_id = %id, "Session removed");
        Ok(())
    }

    /// Submit a link for analysis.
    ///
    /// Clears the previous video and insights, replaces the download
    /// lifecycle, and locates the video after the analysis delay.
    pub async fn analyze(&self, session: &Arc<Session>, input: &str) -> ApiResult<SessionView> {
        let url = validate_submission(input)?;

        let generation = {
            let mut ctx = session.state.write().await;
            if ctx.loading {
                return Err(ApiError::conflict("An analysis is already in progress"));
            }
            ctx.video = None;
            ctx.insights = None;
            ctx.insight_source = None;
            ctx.loading = true;
            ctx.analysis_generation += 1;
            ctx.runner = Arc::new(self.new_runner(&session.events));
            ctx.analysis_generation
        };

        info!(session_id = %session.id(), generation, "Analysis started");
        session.publish(WsMessage::log("Analyzing video link..."));

        let clock = Arc::clone(&self.clock);
        let delay = self.analyze_delay;
        let task_session = Arc::clone(session);
        let handle = tokio::spawn(async move {
            clock.sleep(delay).await;
            task_session.complete_analysis(generation, &url).await;
        });
        session.replace_analysis(Some(handle));

        Ok(session.view().await)
    }

    /// Generate insights from a manually entered title.
    pub async fn generate_insights(
        &self,
        session: &Arc<Session>,
        title: &str,
    ) -> ApiResult<InsightOutcome> {
        let title = validate_title(title)?;

        let generation = {
            let mut ctx = session.state.write().await;
            if ctx.generating {
                return Err(ApiError::conflict("Insights are already being generated"));
            }
            let video = ctx
                .video
                .as_mut()
                .ok_or_else(|| ApiError::conflict("Analyze a video before generating insights"))?;
            video.title = Some(title.clone());
            ctx.generating = true;
            ctx.analysis_generation
        };

        // Clear the flag even if this request is dropped mid-flight.
        let pending = scopeguard::guard(Arc::clone(session), |session| {
            tokio::spawn(async move {
                session.state.write().await.generating = false;
            });
        });

        let outcome = self.insights.generate(&title).await;
        let session = scopeguard::ScopeGuard::into_inner(pending);

        let mut ctx = session.state.write().await;
        ctx.generating = false;
        if ctx.analysis_generation != generation {
            return Err(ApiError::conflict("The video changed while generating insights"));
        }
        ctx.insights = Some(outcome.clone().into_insights());
        ctx.insight_source = Some(outcome.source());
        drop(ctx);

        session.publish(WsMessage::Insights {
            insights: outcome.clone().into_insights(),
            fallback: outcome.is_fallback(),
        });
        Ok(outcome)
    }

    /// Runner for download actions; requires a located video.
    async fn download_runner(&self, session: &Session) -> ApiResult<Arc<LifecycleRunner>> {
        let ctx = session.state.read().await;
        if ctx.video.is_none() {
            return Err(ApiError::conflict("Analyze a video before downloading"));
        }
        Ok(Arc::clone(&ctx.runner))
    }

    pub async fn select_option(&self, session: &Arc<Session>, index: usize) -> ApiResult<SessionView> {
        let runner = self.download_runner(session).await?;
        runner.select_option(index).await?;
        Ok(session.view().await)
    }

    pub async fn start_download(&self, session: &Arc<Session>) -> ApiResult<SessionView> {
        let runner = self.download_runner(session).await?;
        let snapshot = runner.start().await?;
        if let Some(option) = download_option(snapshot.selected_option) {
            metrics::record_download_started(option.format.as_str());
        }
        Ok(session.view().await)
    }

    pub async fn reset_download(&self, session: &Arc<Session>) -> ApiResult<SessionView> {
        let runner = self.download_runner(session).await?;
        runner.reset().await?;
        Ok(session.view().await)
    }
}
