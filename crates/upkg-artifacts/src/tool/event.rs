//! The artifact tool logs one compact Serilog JSON object per stderr line.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use upkg_core::ui::tracker::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Information,
    Debug,
}

impl Level {
    fn from_serilog(level: Option<&str>) -> Self {
        match level {
            None | Some("Information") => Level::Information,
            Some("Fatal" | "Critical" | "Error") => Level::Error,
            Some("Warning") => Level::Warning,
            Some(_) => Level::Debug,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EventId {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "@m", default)]
    message: Option<String>,
    #[serde(rename = "@mt", default)]
    template: Option<String>,
    #[serde(rename = "@l", default)]
    level: Option<String>,
    #[serde(rename = "@x", default)]
    exception: Option<String>,
    #[serde(rename = "EventId", default)]
    event_id: Option<EventId>,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl LogEvent {
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    pub fn level(&self) -> Level {
        Level::from_serilog(self.level.as_deref())
    }

    /// The rendered message. Falls back to the template for producers that
    /// do not render.
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .or(self.template.as_deref())
            .unwrap_or_default()
    }

    /// What gets logged: errors carry their exception text along.
    pub fn text(&self) -> String {
        match (self.level(), self.exception.as_deref()) {
            (Level::Error, Some(exception)) if !exception.is_empty() => {
                format!("{}\n{}", self.message(), exception)
            }
            _ => self.message().to_string(),
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event_id.as_ref()?.name.as_deref()
    }

    /// Spinner update for the transfer events, `None` for everything else.
    pub fn progress(&self) -> Option<Status> {
        let (done, total) = match self.event_name()? {
            "ProcessingFiles" => ("ProcessedFiles", "TotalFiles"),
            "Uploading" => ("UploadedBytes", "TotalBytes"),
            "Downloading" => ("DownloadedBytes", "TotalBytes"),
            _ => return None,
        };
        let percent = match (self.number(done), self.number(total)) {
            (Some(done), Some(total)) if total > 0.0 => Some((done / total * 100.0).clamp(0.0, 100.0)),
            _ => None,
        };
        Some(Status {
            message: self.message().to_string(),
            percent,
        })
    }

    /// Forward to the subscriber at the mapped level.
    pub fn emit(&self) {
        let text = self.text();
        match self.level() {
            Level::Error => error!(target: "artifacttool", "{text}"),
            Level::Warning => warn!(target: "artifacttool", "{text}"),
            Level::Information => info!(target: "artifacttool", "{text}"),
            Level::Debug => debug!(target: "artifacttool", "{text}"),
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping() {
        let level = |l: &str| LogEvent::parse(l).unwrap().level();
        assert_eq!(level(r#"{"@m":"x"}"#), Level::Information);
        assert_eq!(level(r#"{"@m":"x","@l":"Critical"}"#), Level::Error);
        assert_eq!(level(r#"{"@m":"x","@l":"Error"}"#), Level::Error);
        assert_eq!(level(r#"{"@m":"x","@l":"Warning"}"#), Level::Warning);
        assert_eq!(level(r#"{"@m":"x","@l":"Verbose"}"#), Level::Debug);
        assert_eq!(level(r#"{"@m":"x","@l":"Debug"}"#), Level::Debug);
    }

    #[test]
    fn error_text_includes_exception() {
        let event = LogEvent::parse(
            r#"{"@m":"Publish failed","@l":"Error","@x":"System.Exception: boom"}"#,
        )
        .unwrap();
        assert_eq!(event.text(), "Publish failed\nSystem.Exception: boom");

        let event =
            LogEvent::parse(r#"{"@m":"careful","@l":"Warning","@x":"ignored"}"#).unwrap();
        assert_eq!(event.text(), "careful");
    }

    #[test]
    fn upload_progress() {
        let event = LogEvent::parse(
            r#"{"@m":"Uploading","EventId":{"Id":2,"Name":"Uploading"},"UploadedBytes":25,"TotalBytes":200}"#,
        )
        .unwrap();
        let status = event.progress().unwrap();
        assert_eq!(status.message, "Uploading");
        assert_eq!(status.percent, Some(12.5));
    }

    #[test]
    fn processing_and_download_progress() {
        let event = LogEvent::parse(
            r#"{"@m":"Processing","EventId":{"Name":"ProcessingFiles"},"ProcessedFiles":3,"TotalFiles":4}"#,
        )
        .unwrap();
        assert_eq!(event.progress().unwrap().percent, Some(75.0));

        let event = LogEvent::parse(
            r#"{"@m":"Downloading","EventId":{"Name":"Downloading"},"DownloadedBytes":10,"TotalBytes":0}"#,
        )
        .unwrap();
        assert_eq!(event.progress().unwrap().percent, None);
    }

    #[test]
    fn other_events_have_no_progress() {
        let event =
            LogEvent::parse(r#"{"@m":"Hello","EventId":{"Name":"Something"}}"#).unwrap();
        assert!(event.progress().is_none());
        assert!(LogEvent::parse(r#"{"@m":"Hello"}"#).unwrap().progress().is_none());
    }

    #[test]
    fn non_json_is_rejected() {
        assert!(LogEvent::parse("plain text").is_none());
        assert!(LogEvent::parse("").is_none());
    }

    #[test]
    fn template_fallback() {
        let event = LogEvent::parse(r#"{"@mt":"Processing {Count} files"}"#).unwrap();
        assert_eq!(event.message(), "Processing {Count} files");
    }
}
