use crate::intent::{Entities, EntityValue, IntentLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Verb tag of an executable command. One handler is registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    OpenApplication,
    CloseApplication,
    PlayMusic,
    PauseMusic,
    SendEmail,
    SendSms,
    DeviceControl,
}

impl CommandKind {
    /// `None` for `Unknown`: there is nothing to execute.
    pub fn from_label(label: IntentLabel) -> Option<Self> {
        Some(match label {
            IntentLabel::Unknown => return None,
            IntentLabel::OpenApplication => CommandKind::OpenApplication,
            IntentLabel::CloseApplication => CommandKind::CloseApplication,
            IntentLabel::PlayMusic => CommandKind::PlayMusic,
            IntentLabel::PauseMusic => CommandKind::PauseMusic,
            IntentLabel::SendEmail => CommandKind::SendEmail,
            IntentLabel::SendSms => CommandKind::SendSms,
            IntentLabel::DeviceControl => CommandKind::DeviceControl,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::OpenApplication => "open_application",
            CommandKind::CloseApplication => "close_application",
            CommandKind::PlayMusic => "play_music",
            CommandKind::PauseMusic => "pause_music",
            CommandKind::SendEmail => "send_email",
            CommandKind::SendSms => "send_sms",
            CommandKind::DeviceControl => "device_control",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the caching stage treats a command's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Unique per logically-equivalent request.
    pub key: String,
    pub group: Option<String>,
    /// Falls back to the configured default when absent.
    pub sliding_expiration: Option<Duration>,
    /// Skip the read, still refresh the stored value.
    #[serde(default)]
    pub bypass: bool,
}

impl CachePolicy {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            group: None,
            sliding_expiration: None,
            bypass: false,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn sliding(mut self, expiration: Duration) -> Self {
        self.sliding_expiration = Some(expiration);
        self
    }

    pub fn bypassing(mut self) -> Self {
        self.bypass = true;
        self
    }
}

/// A structured instruction ready for the execution pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub parameters: Entities,
    pub cache: Option<CachePolicy>,
    /// Cache group whose entries become stale once this command succeeds.
    pub invalidates: Option<String>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            parameters: Entities::new(),
            cache: None,
            invalidates: None,
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<EntityValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn with_params(mut self, params: Entities) -> Self {
        self.parameters.extend(params);
        self
    }

    pub fn cached(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    pub fn invalidating(mut self, group: impl Into<String>) -> Self {
        self.invalidates = Some(group.into());
        self
    }

    pub fn param_text(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(EntityValue::as_text)
    }
}
