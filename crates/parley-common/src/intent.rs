use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every command the resolver can produce, plus `Unknown` for "no opinion".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    Unknown,
    OpenApplication,
    CloseApplication,
    PlayMusic,
    PauseMusic,
    SendEmail,
    SendSms,
    DeviceControl,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 8] = [
        IntentLabel::Unknown,
        IntentLabel::OpenApplication,
        IntentLabel::CloseApplication,
        IntentLabel::PlayMusic,
        IntentLabel::PauseMusic,
        IntentLabel::SendEmail,
        IntentLabel::SendSms,
        IntentLabel::DeviceControl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::Unknown => "unknown",
            IntentLabel::OpenApplication => "open_application",
            IntentLabel::CloseApplication => "close_application",
            IntentLabel::PlayMusic => "play_music",
            IntentLabel::PauseMusic => "pause_music",
            IntentLabel::SendEmail => "send_email",
            IntentLabel::SendSms => "send_sms",
            IntentLabel::DeviceControl => "device_control",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, IntentLabel::Unknown)
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown intent label: {0}")]
pub struct ParseLabelError(pub String);

impl FromStr for IntentLabel {
    type Err = ParseLabelError;

    /// Accepts `open_application`, `OpenApplication` and `open-application`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        IntentLabel::ALL
            .into_iter()
            .find(|label| label.as_str().replace('_', "") == folded)
            .ok_or_else(|| ParseLabelError(s.to_string()))
    }
}

/// Typed entity payload carried by strategy results and commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<EntityValue>),
    /// Anything a strategy produced that has no dedicated variant.
    Opaque(serde_json::Value),
}

impl EntityValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EntityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value carries no usable content (blank text, empty list).
    pub fn is_blank(&self) -> bool {
        match self {
            EntityValue::Text(s) => s.trim().is_empty(),
            EntityValue::List(items) => items.is_empty(),
            EntityValue::Opaque(v) => v.is_null(),
            EntityValue::Number(_) | EntityValue::Flag(_) => false,
        }
    }

    /// Lift an arbitrary JSON value into the closest typed variant.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => EntityValue::Text(s),
            serde_json::Value::Bool(b) => EntityValue::Flag(b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => EntityValue::Number(f),
                None => EntityValue::Opaque(serde_json::Value::Number(n)),
            },
            serde_json::Value::Array(items) => {
                EntityValue::List(items.into_iter().map(EntityValue::from_json).collect())
            }
            other => EntityValue::Opaque(other),
        }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Text(s) => f.write_str(s),
            EntityValue::Number(n) => write!(f, "{}", n),
            EntityValue::Flag(b) => write!(f, "{}", b),
            EntityValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            EntityValue::Opaque(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::Text(s.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        EntityValue::Text(s)
    }
}

impl From<f64> for EntityValue {
    fn from(n: f64) -> Self {
        EntityValue::Number(n)
    }
}

/// Ordered so that cache keys and log lines built from entities are stable.
pub type Entities = BTreeMap<String, EntityValue>;

/// Well-known entity names.
pub mod entity {
    pub const APPLICATION: &str = "application";
    pub const PREFERRED_APPLICATION: &str = "preferredApplication";
    pub const QUERY: &str = "query";
    pub const RECIPIENT: &str = "recipient";
    pub const BODY: &str = "body";
    pub const MESSAGE: &str = "message";
    pub const SETTING: &str = "setting";
    pub const VALUE: &str = "value";
}
