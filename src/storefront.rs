//! The storefront: session store, auth flow and balance flow wired together.
//!
//! Every user action is one synchronous step that may issue a single backend
//! call, update state, queue notifications and write to the activity log.

use crate::api::Backend;
use crate::auth::{AuthFlow, AuthOutcome};
use crate::balance::{BalanceFlow, DepositOutcome, RefreshOutcome};
use crate::model::{format_money, AuthMode, Session, User};
use crate::notify::{text, Notice};
use crate::session::SessionStore;
use crate::storage::KvStore;
use crate::transcript::Transcript;

/// What the top bar shows
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Anonymous,
    SignedIn {
        username: String,
        avatar_url: Option<&'static str>,
        initial: String,
        balance: f64,
    },
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Header::Anonymous => write!(f, "TickPay  [Вход]"),
            Header::SignedIn {
                username,
                avatar_url,
                initial,
                balance,
            } => {
                let avatar = match avatar_url {
                    Some(url) => url.to_string(),
                    None => format!("({})", initial),
                };
                write!(
                    f,
                    "TickPay  {} {}  Баланс: {}",
                    avatar,
                    username,
                    format_money(*balance)
                )
            }
        }
    }
}

pub struct Storefront<B: Backend, S: KvStore> {
    backend: B,
    sessions: SessionStore<S>,
    session: Option<Session>,
    auth: AuthFlow,
    balance: BalanceFlow,
    notices: Vec<Notice>,
    log: Transcript,
}

impl<B: Backend, S: KvStore> Storefront<B, S> {
    pub fn new(backend: B, store: S, log: Transcript) -> Self {
        Self {
            backend,
            sessions: SessionStore::new(store),
            session: None,
            auth: AuthFlow::new(),
            balance: BalanceFlow::new(),
            notices: Vec::new(),
            log,
        }
    }

    /// Restore a persisted session and, if there is one, fetch its balance once
    pub fn load(&mut self) {
        match self.sessions.restore() {
            Ok(Some(session)) => {
                let _ = self.log.session_restored(session.user.id);
                self.session = Some(session);
                self.auth.mark_authenticated();
                self.refresh_balance();
            }
            Ok(None) => {
                let _ = self.log.session_absent(None);
            }
            Err(e) => {
                let _ = self.log.session_absent(Some(&format!("{:#}", e)));
            }
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    pub fn balance(&self) -> f64 {
        self.balance.balance()
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut AuthFlow {
        &mut self.auth
    }

    pub fn deposit_form(&self) -> &BalanceFlow {
        &self.balance
    }

    pub fn deposit_form_mut(&mut self) -> &mut BalanceFlow {
        &mut self.balance
    }

    pub fn log(&self) -> &Transcript {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut Transcript {
        &mut self.log
    }

    /// Drain notifications queued since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn header(&self) -> Header {
        match self.user() {
            None => Header::Anonymous,
            Some(user) => Header::SignedIn {
                username: user.username.clone(),
                avatar_url: user.avatar_url(),
                initial: user.initial(),
                balance: self.balance.balance(),
            },
        }
    }

    pub fn open_auth(&mut self, mode: AuthMode) {
        self.auth.open(mode);
    }

    pub fn submit_auth(&mut self) -> AuthOutcome {
        let mode = self.auth.mode;
        if !self.auth.is_submitting() {
            let _ = self.log.auth_submit(mode.as_str(), &self.auth.email);
        }

        let outcome = self.auth.submit(&self.backend, &mut self.sessions);
        match &outcome {
            AuthOutcome::Authenticated { mode, session } => {
                let _ = self.log.auth_ok(mode.as_str(), session.user.id);
                self.notices.push(Notice::success(match mode {
                    AuthMode::Login => text::WELCOME_BACK,
                    AuthMode::Register => text::ACCOUNT_CREATED,
                }));
                self.session = Some(session.clone());
                self.refresh_balance();
            }
            AuthOutcome::Rejected(e) => {
                let _ = self.log.auth_rejected(mode.as_str(), &e.to_string());
                self.notices
                    .push(Notice::error(e.message_or(text::AUTH_FALLBACK)));
            }
            AuthOutcome::Offline(e) => {
                let _ = self.log.auth_offline(mode.as_str(), &e.to_string());
                self.notices.push(Notice::error(text::CONNECTION_FAILED));
            }
            AuthOutcome::NotSaved(e) => {
                let _ = self.log.session_save_failed(e);
                self.notices.push(Notice::error(text::SESSION_NOT_SAVED));
            }
            AuthOutcome::Busy => {}
        }
        outcome
    }

    /// Re-read the balance from the server. Failures are only logged.
    pub fn refresh_balance(&mut self) -> RefreshOutcome {
        let outcome = self.balance.refresh(&self.backend, self.session.as_ref());
        match &outcome {
            RefreshOutcome::Updated(balance) => {
                let _ = self.log.balance_refresh_ok(*balance);
            }
            RefreshOutcome::Failed(e) => {
                let _ = self.log.balance_refresh_failed(&e.to_string());
            }
            RefreshOutcome::Skipped => {}
        }
        outcome
    }

    /// Open the top-up dialog; only reachable while signed in
    pub fn open_deposit(&mut self) -> bool {
        if self.session.is_some() {
            self.balance.open_dialog();
            true
        } else {
            false
        }
    }

    pub fn submit_deposit(&mut self) -> DepositOutcome {
        let outcome = self.balance.deposit(&self.backend, self.session.as_ref());
        match &outcome {
            DepositOutcome::Invalid => {
                let _ = self.log.deposit_invalid(&self.balance.amount_input);
                self.notices.push(Notice::error(text::INVALID_AMOUNT));
            }
            DepositOutcome::Deposited { amount, balance } => {
                let _ = self.log.deposit_ok(*amount, *balance);
                self.notices.push(Notice::success(text::deposited(*amount)));
            }
            DepositOutcome::Rejected { amount, error } => {
                let _ = self.log.deposit_rejected(*amount, &error.to_string());
                self.notices
                    .push(Notice::error(error.message_or(text::DEPOSIT_FALLBACK)));
            }
            DepositOutcome::Offline { amount, error } => {
                let _ = self.log.deposit_offline(*amount, &error.to_string());
                self.notices.push(Notice::error(text::CONNECTION_FAILED));
            }
            DepositOutcome::NoSession | DepositOutcome::Busy => {}
        }
        outcome
    }

    /// Forget the session locally. The server is not told.
    ///
    /// When the stored keys cannot be removed the session stays active, since
    /// it would come back on the next start anyway.
    pub fn logout(&mut self) {
        let user_id = self.user().map(|u| u.id);
        if let Err(e) = self.sessions.clear() {
            let _ = self.log.session_clear_failed(&format!("{:#}", e));
            self.notices.push(Notice::error(text::LOGOUT_FAILED));
            return;
        }
        self.session = None;
        self.balance.reset();
        self.auth.sign_out();
        let _ = self.log.logout(user_id);
        self.notices.push(Notice::success(text::LOGGED_OUT));
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        self.sessions.inner()
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut S {
        self.sessions.inner_mut()
    }
}
