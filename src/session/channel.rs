use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Recording purpose; each channel has its own capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// What the target achievement was
    Achievement,
    /// Problems faced along the way
    Excuse,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Achievement, Channel::Excuse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Achievement => "achievement",
            Channel::Excuse => "excuse",
        }
    }

    /// User-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Achievement => "Achievement",
            Channel::Excuse => "Problem",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "achievement" => Ok(Channel::Achievement),
            "excuse" | "problem" => Ok(Channel::Excuse),
            other => Err(format!("Unknown recording channel '{}'", other)),
        }
    }
}

/// The single token a channel must hold while recording or paused
#[derive(Debug, Clone, Default)]
pub struct ActiveChannel {
    holder: Arc<Mutex<Option<Channel>>>,
}

impl ActiveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token, failing fast if the other channel holds it
    pub fn acquire(&self, channel: Channel) -> Result<(), CaptureError> {
        let mut holder = self.lock();
        match *holder {
            Some(active) if active != channel => Err(CaptureError::ChannelBusy { active }),
            _ => {
                *holder = Some(channel);
                Ok(())
            }
        }
    }

    /// Give the token back; a no-op unless `channel` holds it
    pub fn release(&self, channel: Channel) {
        let mut holder = self.lock();
        if *holder == Some(channel) {
            *holder = None;
        }
    }

    pub fn holder(&self) -> Option<Channel> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Channel>> {
        self.holder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_exclusive() {
        let token = ActiveChannel::new();
        token.acquire(Channel::Achievement).unwrap();

        let err = token.acquire(Channel::Excuse).unwrap_err();
        assert_eq!(err, CaptureError::ChannelBusy { active: Channel::Achievement });

        // Releasing from the non-holder changes nothing
        token.release(Channel::Excuse);
        assert_eq!(token.holder(), Some(Channel::Achievement));

        token.release(Channel::Achievement);
        assert_eq!(token.holder(), None);
        token.acquire(Channel::Excuse).unwrap();
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("Achievement".parse::<Channel>(), Ok(Channel::Achievement));
        assert_eq!("problem".parse::<Channel>(), Ok(Channel::Excuse));
        assert!("other".parse::<Channel>().is_err());
    }
}
