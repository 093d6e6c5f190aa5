//! User-facing notifications ("toasts") and their fixed texts.

/// Texts shown to the user. Server-supplied messages replace the
/// `*_FALLBACK` ones when present.
pub mod text {
    pub const WELCOME_BACK: &str = "Добро пожаловать!";
    pub const ACCOUNT_CREATED: &str = "Аккаунт создан!";
    pub const AUTH_FALLBACK: &str = "Ошибка при входе";
    pub const CONNECTION_FAILED: &str = "Ошибка подключения к серверу";
    pub const INVALID_AMOUNT: &str = "Введите корректную сумму";
    pub const DEPOSIT_FALLBACK: &str = "Ошибка пополнения";
    pub const LOGGED_OUT: &str = "Вы вышли из аккаунта";
    pub const SESSION_NOT_SAVED: &str = "Не удалось сохранить сессию";
    pub const LOGOUT_FAILED: &str = "Не удалось выйти из аккаунта";

    pub fn deposited(amount: f64) -> String {
        format!("Баланс пополнен на {}{}", crate::model::CURRENCY, amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = match self.level {
            Level::Success => "✓",
            Level::Error => "✗",
        };
        write!(f, "{} {}", mark, self.text)
    }
}
