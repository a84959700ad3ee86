use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;
use crate::types::Zone;

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON record of portal exchanges. Passwords and tokens never reach it.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_payload: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_payload: None,
        })
    }

    pub fn log_login(&mut self, username: &str) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "login",
            "user": username,
        });
        self.write_line(&entry);
    }

    pub fn log_token(&mut self, device_id: &str, found: bool) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "token",
            "device": device_id,
            "found": found,
        });
        self.write_line(&entry);
    }

    /// `fields` must already have the token stripped.
    pub fn log_command(&mut self, action: &str, zone: Zone, fields: &Value, status: Option<u16>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "zone": zone.number(),
            "fields": fields,
            "status": status,
        });
        self.write_line(&entry);
    }

    /// `body` is `None` when the response did not decode.
    pub fn log_read(&mut self, zone: Zone, status: u16, body: Option<&Value>) {
        let Some(body) = body else {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "read",
                "zone": zone.number(),
                "status": status,
                "decoded": false,
            });
            self.write_line(&entry);
            return;
        };

        let entry = match (&self.mode, &self.previous_payload) {
            (MessageLogMode::Full, _) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "read",
                "zone": zone.number(),
                "status": status,
                "body": body,
            }),
            (MessageLogMode::Diffed, None) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "read",
                "zone": zone.number(),
                "status": status,
                "full": true,
                "body": body,
            }),
            (MessageLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, body, "", &mut changes);
                let change_entries: Vec<Value> = changes
                    .iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "read",
                    "zone": zone.number(),
                    "status": status,
                    "changes": change_entries,
                })
            }
        };
        self.write_line(&entry);

        if matches!(self.mode, MessageLogMode::Diffed) {
            self.previous_payload = Some(body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
