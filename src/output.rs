// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports human-readable and JSON-lines output modes.

use serde::Serialize;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly tables and messages
    Normal,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Print a progress message (suppressed in json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            eprintln!("{message}");
        }
    }

    /// Print a result: `human` in normal mode, `data` as one JSON line otherwise.
    pub fn result<T: Serialize>(&self, data: &T, human: impl FnOnce() -> String) {
        match self.mode {
            OutputMode::Normal => {
                let text = human();
                if !text.is_empty() {
                    println!("{text}");
                }
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "result",
                    message: None,
                    data: Some(data),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => println!("{message}"),
            OutputMode::Json => emit(false, "success", message),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Error: {message}"),
            OutputMode::Json => emit(true, "error", message),
        }
    }
}

fn emit(stderr: bool, event: &str, message: &str) {
    let event = JsonEvent::<()> {
        event,
        message: Some(message),
        data: None,
    };
    if let Ok(json) = serde_json::to_string(&event) {
        if stderr {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a, T: Serialize> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}
