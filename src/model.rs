use serde::{Deserialize, Serialize};

/// Avatar images offered at registration; `User::avatar_id` is 1-based into this list
pub const AVATARS: [&str; 3] = [
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Felix",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Aneka",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Luna",
];

pub const CURRENCY: &str = "₽";

/// Account as returned by the auth endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

impl User {
    /// Image for this user's avatar, if `avatar_id` points into the list
    pub fn avatar_url(&self) -> Option<&'static str> {
        usize::try_from(self.avatar_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| AVATARS.get(idx).copied())
    }

    /// Uppercased first letter of the username, shown when there is no image
    pub fn initial(&self) -> String {
        self.username
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

/// A signed-in user together with the bearer token the server issued.
/// Either both halves exist or there is no session at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }
}

/// Which tab of the auth dialog is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}

/// Format an amount the way the header shows it: `₽1234.50`
pub fn format_money(amount: f64) -> String {
    format!("{}{:.2}", CURRENCY, amount)
}
