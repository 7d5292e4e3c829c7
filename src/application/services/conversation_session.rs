//! Conversation Session - Owns the dialogue history and drives generation
//!
//! A session renders the current scene plus history into a prompt, sends it
//! to the generation backend, normalizes the reply and appends it to the
//! bounded history. The most recent character request is remembered so the
//! reply can be regenerated, and auxiliary system requests can be layered on
//! top of the last prompt.
//!
//! At most one generation may be in flight per session. Overlapping calls to
//! `request_response`, `regenerate` or `send_system_message` are rejected
//! with [`SessionError::Busy`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::prompt_renderer::PromptRenderer;
use super::text_normalizer::TextNormalizer;
use crate::application::ports::outbound::{GenerationBackend, GenerationError, PresentationPort};
use crate::domain::value_objects::{
    ConversationHistory, DialogueMessage, MessageId, SystemRequest,
};

/// Speaker used for system requests and system notices
pub const SYSTEM_SPEAKER: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Nothing to regenerate")]
    NothingToRegenerate,
    #[error(transparent)]
    Backend(#[from] GenerationError),
    #[error("A generation request is already in progress")]
    Busy,
}

/// The last character request, kept for regeneration
#[derive(Debug, Clone)]
struct RegenerationSnapshot {
    character_name: String,
    prompt: String,
    /// Message produced by the request, once it completed
    last_generated: Option<MessageId>,
}

#[derive(Debug, Default)]
struct SessionState {
    history: ConversationHistory,
    regeneration: Option<RegenerationSnapshot>,
}

/// Marks the session busy until dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SessionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| SessionError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ConversationSession {
    backend: Arc<dyn GenerationBackend>,
    renderer: Arc<RwLock<PromptRenderer>>,
    normalizer: TextNormalizer,
    presenter: Option<Arc<dyn PresentationPort>>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl ConversationSession {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        renderer: Arc<RwLock<PromptRenderer>>,
        normalizer: TextNormalizer,
        max_history_length: usize,
    ) -> Self {
        Self {
            backend,
            renderer,
            normalizer,
            presenter: None,
            state: Mutex::new(SessionState {
                history: ConversationHistory::new(max_history_length),
                regeneration: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Attach the collaborator that displays system requests
    pub fn with_presenter(mut self, presenter: Arc<dyn PresentationPort>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn renderer(&self) -> &Arc<RwLock<PromptRenderer>> {
        &self.renderer
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Append a message, evicting the oldest once the history is full
    pub async fn add_message(&self, sender: &str, text: &str) -> MessageId {
        let mut state = self.state.lock().await;
        let id = state.history.push(DialogueMessage::new(sender, text));
        debug!(sender = %sender, history_len = state.history.len(), "Added message");
        id
    }

    /// Remove a specific message, e.g. a player line whose reply failed
    pub async fn retract_message(&self, id: MessageId) -> Option<DialogueMessage> {
        self.state.lock().await.history.remove(id)
    }

    /// Copy of the history in insertion order
    pub async fn get_history(&self) -> Vec<DialogueMessage> {
        self.state.lock().await.history.snapshot()
    }

    /// Empty the history and forget the last request
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.history.clear();
        state.regeneration = None;
        debug!("Cleared conversation");
    }

    pub async fn max_history_length(&self) -> usize {
        self.state.lock().await.history.max_length()
    }

    /// Change the bound, trimming the oldest messages right away
    pub async fn set_max_history_length(&self, max_length: usize) {
        self.state.lock().await.history.set_max_length(max_length);
    }

    pub async fn can_regenerate(&self) -> bool {
        self.state.lock().await.regeneration.is_some()
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// Ask `character_name` to speak next
    ///
    /// The scene context must already be up to date. On failure the history
    /// is left untouched.
    #[instrument(skip(self))]
    pub async fn request_response(&self, character_name: &str) -> Result<String, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let history = self.get_history().await;
        let prompt = {
            let renderer = self.renderer.read().await;
            renderer.replace_keywords(&renderer.render(&history), character_name)
        };
        debug!(prompt = %prompt, "Generated prompt");

        self.state.lock().await.regeneration = Some(RegenerationSnapshot {
            character_name: character_name.to_string(),
            prompt: prompt.clone(),
            last_generated: None,
        });

        let text = self.generate(&prompt, character_name).await?;

        let mut state = self.state.lock().await;
        let id = state
            .history
            .push(DialogueMessage::new(character_name, text.as_str()));
        if let Some(snapshot) = state.regeneration.as_mut() {
            snapshot.last_generated = Some(id);
        }

        Ok(text)
    }

    /// Replace the last generated reply with a fresh one from the same prompt
    ///
    /// Only the exact message produced by the previous request is removed,
    /// and only once the new reply has arrived. If that request failed this
    /// simply retries it.
    #[instrument(skip(self))]
    pub async fn regenerate(&self) -> Result<String, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let snapshot = self.state.lock().await.regeneration.clone();
        let Some(snapshot) = snapshot else {
            warn!("No previous response to regenerate");
            return Err(SessionError::NothingToRegenerate);
        };
        debug!(
            character = %snapshot.character_name,
            prompt = %snapshot.prompt,
            "Regenerating response"
        );

        let text = self
            .generate(&snapshot.prompt, &snapshot.character_name)
            .await?;

        let mut state = self.state.lock().await;
        if let Some(previous) = snapshot.last_generated {
            state.history.remove(previous);
        }
        let id = state
            .history
            .push(DialogueMessage::new(snapshot.character_name.as_str(), text.as_str()));
        state.regeneration = Some(RegenerationSnapshot {
            last_generated: Some(id),
            ..snapshot
        });

        Ok(text)
    }

    /// Run an auxiliary request on top of the last character prompt
    ///
    /// Falls back to a freshly rendered prompt when no character request was
    /// made yet. The regeneration snapshot is not touched.
    #[instrument(skip(self, request), fields(kind = ?request.kind))]
    pub async fn send_system_message(&self, request: &SystemRequest) -> Result<String, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let (history, base_prompt) = {
            let state = self.state.lock().await;
            (
                state.history.snapshot(),
                state.regeneration.as_ref().map(|s| s.prompt.clone()),
            )
        };

        let request_prompt = request.generate_prompt(&history);
        let prompt = {
            let renderer = self.renderer.read().await;
            let base = base_prompt.unwrap_or_else(|| renderer.render(&history));
            renderer.replace_keywords(
                &format!("{}\n{}: {}", base, SYSTEM_SPEAKER, request_prompt),
                SYSTEM_SPEAKER,
            )
        };
        debug!(prompt = %prompt, "Generated system prompt");

        if request.show_on_ui {
            self.present(&request_prompt);
        }

        let text = self.generate(&prompt, SYSTEM_SPEAKER).await?;

        if request.add_to_history {
            self.add_message(SYSTEM_SPEAKER, &text).await;
        }
        if request.show_on_ui {
            self.present(&text);
        }

        Ok(text)
    }

    async fn generate(&self, prompt: &str, role_label: &str) -> Result<String, SessionError> {
        match self.backend.generate(prompt, role_label).await {
            Ok(raw) => {
                info!(role = %role_label, "Received generated response");
                debug!(raw = %raw, "Raw response");
                Ok(self.normalizer.normalize(&raw))
            }
            Err(e) => {
                warn!(role = %role_label, error = %e, "Generation failed");
                Err(e.into())
            }
        }
    }

    fn present(&self, text: &str) {
        if let Some(presenter) = &self.presenter {
            presenter.show_dialogue(SYSTEM_SPEAKER, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::testing::ScriptedBackend;
    use crate::application::ports::outbound::MockPresentationPort;
    use crate::application::services::prompt_renderer::PromptSettings;
    use crate::domain::entities::PlayerProfile;
    use mockall::predicate::eq;

    fn renderer() -> Arc<RwLock<PromptRenderer>> {
        Arc::new(RwLock::new(PromptRenderer::new(
            PromptSettings {
                system_instructions: "Play {{char}} talking to {{user}}.".into(),
                include_timestamp: false,
            },
            &PlayerProfile::default(),
        )))
    }

    fn session(backend: Arc<ScriptedBackend>) -> ConversationSession {
        ConversationSession::new(backend, renderer(), TextNormalizer::default(), 20)
    }

    fn texts(history: &[DialogueMessage]) -> Vec<String> {
        history.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let session = ConversationSession::new(
            Arc::new(ScriptedBackend::new()),
            renderer(),
            TextNormalizer::default(),
            3,
        );

        for i in 0..10 {
            session.add_message("Jeff", &format!("line {i}")).await;
            assert!(session.get_history().await.len() <= 3);
        }

        assert_eq!(
            texts(&session.get_history().await),
            vec!["Jeff: line 7", "Jeff: line 8", "Jeff: line 9"]
        );
    }

    #[tokio::test]
    async fn test_request_response_appends_cleaned_reply() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("Mira: \"welcome, traveller!\""));
        let session = session(backend.clone());
        session.add_message("Jeff", "Hello?").await;

        let reply = session.request_response("Mira").await.unwrap();

        assert_eq!(reply, "Welcome, traveller!");
        assert_eq!(
            texts(&session.get_history().await),
            vec!["Jeff: Hello?", "Mira: Welcome, traveller!"]
        );

        let (prompt, role) = backend.calls().remove(0);
        assert_eq!(role, "Mira");
        assert!(prompt.starts_with("**System:**\nPlay Mira talking to Jeff."));
        assert!(prompt.ends_with("**Conversation:**\nJeff: Hello?"));
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_history_unchanged() {
        let backend = Arc::new(ScriptedBackend::new().with_failure("connection refused"));
        let session = session(backend);
        session.add_message("Jeff", "Hello?").await;

        let err = session.request_response("Mira").await.unwrap_err();

        assert!(matches!(err, SessionError::Backend(GenerationError::RequestFailed(_))));
        assert_eq!(texts(&session.get_history().await), vec!["Jeff: Hello?"]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_regenerate_without_request_fails() {
        let session = session(Arc::new(ScriptedBackend::new()));
        assert_eq!(
            session.regenerate().await,
            Err(SessionError::NothingToRegenerate)
        );
    }

    #[tokio::test]
    async fn test_regenerate_replaces_only_the_generated_message() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("First answer.")
                .with_reply("Second answer.")
                .with_reply("Third answer."),
        );
        let session = session(backend.clone());
        session.add_message("Jeff", "Hello?").await;

        session.request_response("Alice").await.unwrap();
        let before = session.get_history().await.len();

        assert_eq!(session.regenerate().await.unwrap(), "Second answer.");
        assert_eq!(session.get_history().await.len(), before);

        // A player line after the reply must survive a second regeneration
        session.add_message("Jeff", "Hmm.").await;
        assert_eq!(session.regenerate().await.unwrap(), "Third answer.");
        assert_eq!(
            texts(&session.get_history().await),
            vec!["Jeff: Hello?", "Jeff: Hmm.", "Alice: Third answer."]
        );

        let calls = backend.calls();
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[1], calls[2]);
    }

    #[tokio::test]
    async fn test_regenerate_failure_keeps_previous_reply() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Kept answer.")
                .with_failure("timeout"),
        );
        let session = session(backend);
        session.request_response("Alice").await.unwrap();

        assert!(session.regenerate().await.is_err());
        assert_eq!(
            texts(&session.get_history().await),
            vec!["Alice: Kept answer."]
        );
    }

    #[tokio::test]
    async fn test_regenerate_retries_failed_request() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_failure("timeout")
                .with_reply("Finally."),
        );
        let session = session(backend);

        assert!(session.request_response("Alice").await.is_err());
        assert_eq!(session.regenerate().await.unwrap(), "Finally.");
        assert_eq!(texts(&session.get_history().await), vec!["Alice: Finally."]);
    }

    #[tokio::test]
    async fn test_clear_forgets_regeneration() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("Hi."));
        let session = session(backend);
        session.request_response("Alice").await.unwrap();

        session.clear().await;

        assert!(session.get_history().await.is_empty());
        assert!(!session.can_regenerate().await);
        assert_eq!(session.regenerate().await, Err(SessionError::NothingToRegenerate));
    }

    #[tokio::test]
    async fn test_system_message_builds_on_last_prompt() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Hello {{user}}.")
                .with_reply("They seem happy."),
        );
        let session = session(backend.clone());
        session.request_response("Alice").await.unwrap();

        let reply = session
            .send_system_message(&SystemRequest::custom("Describe {{char}}'s mood."))
            .await
            .unwrap();

        assert_eq!(reply, "They seem happy.");
        let calls = backend.calls();
        let (system_prompt, role) = &calls[1];
        assert_eq!(role, SYSTEM_SPEAKER);
        assert_eq!(
            system_prompt,
            &format!("{}\nSYSTEM: Describe SYSTEM's mood.", calls[0].0)
        );
        // Custom requests stay out of the history by default
        assert_eq!(session.get_history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_system_message_does_not_touch_regeneration() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply("Original.")
                .with_reply("A summary.")
                .with_reply("Regenerated."),
        );
        let session = session(backend.clone());
        session.request_response("Alice").await.unwrap();
        session
            .send_system_message(&SystemRequest::plot_summary(None))
            .await
            .unwrap();

        assert_eq!(session.regenerate().await.unwrap(), "Regenerated.");
        assert_eq!(
            texts(&session.get_history().await),
            vec!["SYSTEM: A summary.", "Alice: Regenerated."]
        );
        assert_eq!(backend.calls()[2], backend.calls()[0]);
    }

    #[tokio::test]
    async fn test_system_message_without_prior_request_renders_fresh() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("Nothing happened yet."));
        let session = session(backend.clone());

        session
            .send_system_message(&SystemRequest::relationship())
            .await
            .unwrap();

        let prompt = backend.last_prompt().unwrap();
        assert!(prompt.starts_with("**System:**\nPlay SYSTEM talking to Jeff.\nSYSTEM: "));
        assert!(!session.can_regenerate().await);
    }

    #[tokio::test]
    async fn test_system_message_shown_on_ui() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("calm and curious."));
        let request = SystemRequest::emotional_analysis();
        let request_prompt = request.generate_prompt(&[]);

        let mut presenter = MockPresentationPort::new();
        presenter
            .expect_show_dialogue()
            .with(eq(SYSTEM_SPEAKER), eq(request_prompt))
            .times(1)
            .return_const(());
        presenter
            .expect_show_dialogue()
            .with(eq(SYSTEM_SPEAKER), eq("Calm and curious."))
            .times(1)
            .return_const(());

        let session = session(backend).with_presenter(Arc::new(presenter));
        let reply = session.send_system_message(&request).await.unwrap();

        assert_eq!(reply, "Calm and curious.");
        assert!(session.get_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_system_failure_shows_only_request() {
        let backend = Arc::new(ScriptedBackend::new().with_failure("down"));
        let mut presenter = MockPresentationPort::new();
        presenter.expect_show_dialogue().times(1).return_const(());

        let session = session(backend).with_presenter(Arc::new(presenter));
        let result = session
            .send_system_message(&SystemRequest::emotional_analysis())
            .await;

        assert!(result.is_err());
        assert!(session.get_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_request_is_rejected() {
        let session = session(Arc::new(ScriptedBackend::new()));
        let _held = InFlight::acquire(&session.in_flight).unwrap();

        assert_eq!(session.request_response("Alice").await, Err(SessionError::Busy));
        assert_eq!(session.regenerate().await, Err(SessionError::Busy));
        assert_eq!(
            session
                .send_system_message(&SystemRequest::relationship())
                .await,
            Err(SessionError::Busy)
        );
    }

    #[tokio::test]
    async fn test_guard_is_released_after_each_call() {
        let backend = Arc::new(ScriptedBackend::new().with_reply("One.").with_reply("Two."));
        let session = session(backend);

        session.request_response("Alice").await.unwrap();
        assert!(!session.is_busy());
        session.request_response("Alice").await.unwrap();
        assert_eq!(session.get_history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_retract_and_shrink_history() {
        let session = session(Arc::new(ScriptedBackend::new()));
        let first = session.add_message("Jeff", "one").await;
        session.add_message("Jeff", "two").await;
        session.add_message("Jeff", "three").await;

        assert!(session.retract_message(first).await.is_some());
        assert!(session.retract_message(first).await.is_none());

        session.set_max_history_length(1).await;
        assert_eq!(session.max_history_length().await, 1);
        assert_eq!(texts(&session.get_history().await), vec!["Jeff: three"]);
    }
}
