// Chat session service - transcript, prompt enhancement and the completion round trip
use crate::application::completion_service::{CompletionService, ContextTurn};
use crate::domain::chat::{Message, Transcript};
use crate::domain::enhancement::{EnhancementError, EnhancementKind, EnhancementSelection, Enhancements};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Assistant reply used whenever the completion path fails.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    /// Blank input; nothing was appended or sent.
    Ignored,
    /// Another submission is still in flight; nothing was appended or sent.
    Busy,
    Replied { reply: Message },
    Failed { reply: Message },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a chat request is still in flight")]
pub struct SessionBusy;

/// What the rendering surface needs to draw the chat panel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub messages: Vec<Message>,
    pub in_flight: bool,
    pub enhancements: Vec<EnhancementSelection>,
}

#[derive(Default)]
struct SessionState {
    transcript: Transcript,
    enhancements: Enhancements,
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct ChatSession {
    completion: Arc<dyn CompletionService>,
    state: Arc<Mutex<SessionState>>,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            state: Arc::new(Mutex::new(SessionState::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send one user turn and append the model's reply (or the fallback) to the transcript.
    ///
    /// Only one submission runs at a time; a second call while one is
    /// outstanding returns [`SubmitOutcome::Busy`] without touching the transcript.
    ///
    /// Once the user turn is recorded the round trip runs on its own task, so
    /// dropping the returned future does not leave the turn without a reply.
    pub async fn submit(&self, raw_text: &str) -> SubmitOutcome {
        if raw_text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Rejecting chat submission while another is in flight");
            return SubmitOutcome::Busy;
        };

        // Context is the transcript before the new turn; the new turn goes out as the prompt.
        let (context, prompt) = {
            let mut state = self.lock_state();
            let prompt = state.enhancements.apply(raw_text);
            let context: Vec<ContextTurn> = state
                .transcript
                .messages()
                .iter()
                .map(ContextTurn::from)
                .collect();
            state.transcript.push(Message::user(prompt.clone()));
            (context, prompt)
        };

        tracing::debug!("Sending chat prompt with {} context turns", context.len());

        let session = self.clone();
        let round_trip = tokio::spawn(async move {
            let _guard = guard;
            let outcome = match session.completion.complete(&context, &prompt).await {
                Ok(text) => SubmitOutcome::Replied {
                    reply: Message::assistant(text),
                },
                Err(e) => {
                    tracing::error!("Completion request failed: {}", e);
                    SubmitOutcome::Failed {
                        reply: Message::assistant(FALLBACK_REPLY),
                    }
                }
            };

            if let SubmitOutcome::Replied { reply } | SubmitOutcome::Failed { reply } = &outcome {
                session.lock_state().transcript.push(reply.clone());
            }
            outcome
        });

        match round_trip.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Completion task aborted: {}", e);
                let reply = Message::assistant(FALLBACK_REPLY);
                self.lock_state().transcript.push(reply.clone());
                SubmitOutcome::Failed { reply }
            }
        }
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock_state().transcript.messages().to_vec()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn select_enhancement(&self, kind: EnhancementKind, value: &str) -> Result<(), EnhancementError> {
        self.lock_state().enhancements.select(kind, value)
    }

    pub fn clear_enhancement(&self, kind: EnhancementKind) -> bool {
        self.lock_state().enhancements.clear(kind)
    }

    pub fn selections(&self) -> Vec<EnhancementSelection> {
        self.lock_state().enhancements.selections()
    }

    pub fn view(&self) -> SessionView {
        let state = self.lock_state();
        SessionView {
            messages: state.transcript.messages().to_vec(),
            in_flight: self.is_in_flight(),
            enhancements: state.enhancements.selections(),
        }
    }

    /// Start a new conversation: drop the transcript and every selection.
    pub fn reset(&self) -> Result<(), SessionBusy> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SessionBusy)?;
        let mut state = self.lock_state();
        state.transcript.clear();
        state.enhancements.clear_all();
        tracing::info!("Chat session reset");
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
