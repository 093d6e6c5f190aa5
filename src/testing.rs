//! Test doubles shared by the flow and storefront tests.

use crate::api::{ApiError, AuthReply, AuthRequest, Backend};
use crate::model::{Session, User};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

pub fn sample_user(avatar_id: i64) -> User {
    User {
        id: 1,
        username: "Ann".to_string(),
        email: "a@a.com".to_string(),
        avatar_id,
        balance: None,
    }
}

type Reply<T> = Result<T, ApiError>;

/// Backend that answers from queued replies and records every call.
/// An empty queue answers with a network error.
#[derive(Default)]
pub struct ScriptedBackend {
    auth: RefCell<VecDeque<Reply<AuthReply>>>,
    balances: RefCell<VecDeque<Reply<f64>>>,
    deposits: RefCell<VecDeque<Reply<f64>>>,
    auth_requests: RefCell<Vec<AuthRequest>>,
    balance_calls: Cell<usize>,
    deposit_amounts: RefCell<Vec<f64>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth_reply(user: User, token: &str) -> AuthReply {
        AuthReply {
            user,
            session_token: token.to_string(),
        }
    }

    pub fn push_auth(&self, reply: Reply<AuthReply>) {
        self.auth.borrow_mut().push_back(reply);
    }

    pub fn push_balance(&self, reply: Reply<f64>) {
        self.balances.borrow_mut().push_back(reply);
    }

    pub fn push_deposit(&self, reply: Reply<f64>) {
        self.deposits.borrow_mut().push_back(reply);
    }

    pub fn auth_requests(&self) -> Vec<AuthRequest> {
        self.auth_requests.borrow().clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.get()
    }

    pub fn deposit_amounts(&self) -> Vec<f64> {
        self.deposit_amounts.borrow().clone()
    }

    fn next<T>(queue: &RefCell<VecDeque<Reply<T>>>) -> Reply<T> {
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("nothing scripted".to_string())))
    }
}

impl Backend for ScriptedBackend {
    fn authenticate(&self, request: &AuthRequest) -> Result<AuthReply, ApiError> {
        self.auth_requests.borrow_mut().push(request.clone());
        Self::next(&self.auth)
    }

    fn fetch_balance(&self, _session: &Session) -> Result<f64, ApiError> {
        self.balance_calls.set(self.balance_calls.get() + 1);
        Self::next(&self.balances)
    }

    fn deposit(&self, _session: &Session, amount: f64) -> Result<f64, ApiError> {
        self.deposit_amounts.borrow_mut().push(amount);
        Self::next(&self.deposits)
    }
}
