use crate::api::{ApiError, Backend};
use crate::model::Session;

/// Parse the deposit field. Only finite numbers above zero are accepted.
pub fn parse_amount(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// No session; nothing was requested
    Skipped,
    Updated(f64),
    /// Cached value kept; only worth a diagnostic
    Failed(ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DepositOutcome {
    /// Input was not a positive amount; nothing was sent
    Invalid,
    NoSession,
    Busy,
    Deposited { amount: f64, balance: f64 },
    Rejected { amount: f64, error: ApiError },
    Offline { amount: f64, error: ApiError },
}

/// Cached balance plus the state of the deposit dialog
#[derive(Debug, Clone, Default)]
pub struct BalanceFlow {
    balance: f64,
    pub dialog_open: bool,
    pub amount_input: String,
    submitting: bool,
}

impl BalanceFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value the server reported (0 until the first fetch)
    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn open_dialog(&mut self) {
        self.dialog_open = true;
    }

    /// Fill the amount field from a quick-amount button
    pub fn pick_preset(&mut self, amount: u32) {
        self.amount_input = amount.to_string();
    }

    /// Forget everything tied to the previous session
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn refresh<B: Backend>(&mut self, backend: &B, session: Option<&Session>) -> RefreshOutcome {
        let Some(session) = session else {
            return RefreshOutcome::Skipped;
        };

        match backend.fetch_balance(session) {
            Ok(balance) => {
                self.balance = balance;
                RefreshOutcome::Updated(balance)
            }
            Err(e) => RefreshOutcome::Failed(e),
        }
    }

    /// Submit the dialog's amount. The cached balance is replaced with the
    /// server's figure, never adjusted locally.
    pub fn deposit<B: Backend>(&mut self, backend: &B, session: Option<&Session>) -> DepositOutcome {
        let Some(amount) = parse_amount(&self.amount_input) else {
            return DepositOutcome::Invalid;
        };
        let Some(session) = session else {
            return DepositOutcome::NoSession;
        };
        if self.submitting {
            return DepositOutcome::Busy;
        }

        self.submitting = true;
        let result = backend.deposit(session, amount);
        self.submitting = false;

        match result {
            Ok(balance) => {
                self.balance = balance;
                self.dialog_open = false;
                self.amount_input.clear();
                DepositOutcome::Deposited { amount, balance }
            }
            Err(error @ ApiError::Rejected { .. }) => DepositOutcome::Rejected { amount, error },
            Err(error) => DepositOutcome::Offline { amount, error },
        }
    }
}
