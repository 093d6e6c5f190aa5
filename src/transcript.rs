use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

enum Sink {
    File { path: PathBuf, file: File },
    Memory(Vec<String>),
}

/// Append-only JSONL log of storefront activity for one run.
/// Never records passwords or session tokens.
pub struct Transcript {
    run_id: String,
    sink: Sink,
    echo: bool,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            run_id: run_id.to_string(),
            sink: Sink::File {
                path: path.to_path_buf(),
                file,
            },
            echo: false,
        })
    }

    /// Log kept in memory only; used when no activity directory is available and in tests
    pub fn in_memory(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            sink: Sink::Memory(Vec::new()),
            echo: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            Sink::Memory(_) => None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Also print every event to stderr
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        if self.echo {
            eprintln!("[TRACE:{}] {}", event_type, data);
        }

        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        match &mut self.sink {
            Sink::File { file, .. } => {
                writeln!(file, "{}", line)?;
                file.flush()?;
            }
            Sink::Memory(lines) => lines.push(line),
        }
        Ok(())
    }

    pub fn session_restored(&mut self, user_id: i64) -> Result<()> {
        self.log("session_restored", json!({ "user_id": user_id }))
    }

    pub fn session_absent(&mut self, reason: Option<&str>) -> Result<()> {
        self.log("session_absent", json!({ "reason": reason }))
    }

    pub fn auth_submit(&mut self, mode: &str, email: &str) -> Result<()> {
        self.log("auth_submit", json!({ "mode": mode, "email": email }))
    }

    pub fn auth_ok(&mut self, mode: &str, user_id: i64) -> Result<()> {
        self.log("auth_ok", json!({ "mode": mode, "user_id": user_id }))
    }

    pub fn auth_rejected(&mut self, mode: &str, error: &str) -> Result<()> {
        self.log("auth_rejected", json!({ "mode": mode, "error": error }))
    }

    pub fn auth_offline(&mut self, mode: &str, error: &str) -> Result<()> {
        self.log("auth_offline", json!({ "mode": mode, "error": error }))
    }

    pub fn session_save_failed(&mut self, error: &str) -> Result<()> {
        self.log("session_save_failed", json!({ "error": error }))
    }

    pub fn session_clear_failed(&mut self, error: &str) -> Result<()> {
        self.log("session_clear_failed", json!({ "error": error }))
    }

    pub fn balance_refresh_ok(&mut self, balance: f64) -> Result<()> {
        self.log("balance_refresh_ok", json!({ "balance": balance }))
    }

    pub fn balance_refresh_failed(&mut self, error: &str) -> Result<()> {
        self.log("balance_refresh_failed", json!({ "error": error }))
    }

    pub fn deposit_invalid(&mut self, input: &str) -> Result<()> {
        self.log("deposit_invalid", json!({ "input": input }))
    }

    pub fn deposit_ok(&mut self, amount: f64, balance: f64) -> Result<()> {
        self.log(
            "deposit_ok",
            json!({ "amount": amount, "balance": balance }),
        )
    }

    pub fn deposit_rejected(&mut self, amount: f64, error: &str) -> Result<()> {
        self.log(
            "deposit_rejected",
            json!({ "amount": amount, "error": error }),
        )
    }

    pub fn deposit_offline(&mut self, amount: f64, error: &str) -> Result<()> {
        self.log(
            "deposit_offline",
            json!({ "amount": amount, "error": error }),
        )
    }

    pub fn logout(&mut self, user_id: Option<i64>) -> Result<()> {
        self.log("logout", json!({ "user_id": user_id }))
    }

    /// Event types recorded so far (in-memory logs only)
    #[cfg(test)]
    pub fn event_types(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory(lines) => lines
                .iter()
                .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
                .filter_map(|v| v["type"].as_str().map(str::to_string))
                .collect(),
            Sink::File { .. } => Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        match &self.sink {
            Sink::Memory(lines) => lines,
            Sink::File { .. } => &[],
        }
    }
}
