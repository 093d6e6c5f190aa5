//! Login / registration form state machine.
//!
//! `Anonymous -> Submitting -> Authenticated | Rejected`. The flow owns the
//! form fields and drives exactly one auth request per submission.

use crate::api::{ApiError, AuthRequest, Backend};
use crate::model::{AuthMode, Session, AVATARS};
use crate::session::SessionStore;
use crate::storage::KvStore;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Submitting,
    Authenticated,
    /// Last submission failed; the message was shown to the user
    Rejected(String),
}

/// What a submission produced
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated { mode: AuthMode, session: Session },
    /// Non-2xx reply; carries the text to show
    Rejected(ApiError),
    /// No usable reply from the server
    Offline(ApiError),
    /// Signed in on the server but the session could not be stored locally
    NotSaved(String),
    /// A submission is already running
    Busy,
}

#[derive(Debug, Clone, Default)]
pub struct AuthFlow {
    pub open: bool,
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub username: String,
    selected_avatar: usize,
    phase: AuthPhase,
}

impl AuthFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the dialog on the given tab
    pub fn open(&mut self, mode: AuthMode) {
        self.set_mode(mode);
        self.open = true;
    }

    /// Switch tabs; typed fields are kept
    pub fn set_mode(&mut self, mode: AuthMode) {
        self.mode = mode;
    }

    pub fn phase(&self) -> &AuthPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == AuthPhase::Submitting
    }

    /// 0-based index into `AVATARS`
    pub fn selected_avatar(&self) -> usize {
        self.selected_avatar
    }

    pub fn select_avatar(&mut self, index: usize) -> bool {
        if index < AVATARS.len() {
            self.selected_avatar = index;
            true
        } else {
            false
        }
    }

    /// Request for the current form; register-only fields are left out in login mode
    pub fn request(&self) -> AuthRequest {
        let register = self.mode == AuthMode::Register;
        AuthRequest {
            action: self.mode,
            email: self.email.clone(),
            password: self.password.clone(),
            username: register.then(|| self.username.clone()),
            avatar_id: register.then(|| self.selected_avatar() as i64 + 1),
        }
    }

    /// Mark the session as gone (logout)
    pub fn sign_out(&mut self) {
        self.phase = AuthPhase::Anonymous;
    }

    /// Mark an already persisted session as active (restore)
    pub fn mark_authenticated(&mut self) {
        self.phase = AuthPhase::Authenticated;
    }

    fn reset_fields(&mut self) {
        self.email.clear();
        self.password.clear();
        self.username.clear();
        self.selected_avatar = 0;
    }

    /// Send the form to the backend and, on success, persist the new session
    pub fn submit<B: Backend, S: KvStore>(
        &mut self,
        backend: &B,
        sessions: &mut SessionStore<S>,
    ) -> AuthOutcome {
        if self.is_submitting() {
            return AuthOutcome::Busy;
        }

        let mode = self.mode;
        let request = self.request();
        self.phase = AuthPhase::Submitting;

        match backend.authenticate(&request) {
            Ok(reply) => {
                let session = Session::new(reply.user, reply.session_token);
                if let Err(e) = sessions.persist(&session) {
                    self.phase = AuthPhase::Anonymous;
                    return AuthOutcome::NotSaved(e.to_string());
                }
                self.phase = AuthPhase::Authenticated;
                self.open = false;
                self.reset_fields();
                AuthOutcome::Authenticated { mode, session }
            }
            Err(e @ ApiError::Rejected { .. }) => {
                let message = e.message_or(crate::notify::text::AUTH_FALLBACK).to_string();
                self.phase = AuthPhase::Rejected(message);
                AuthOutcome::Rejected(e)
            }
            Err(e) => {
                self.phase = AuthPhase::Anonymous;
                AuthOutcome::Offline(e)
            }
        }
    }
}
