use anyhow::{anyhow, Result};
use serde_json::json;
use tracing::info;

use crate::config::SlackConfig;

/// Minimal Slack client for posting transcripts to a channel
#[derive(Debug, Clone)]
pub struct SlackPoster {
    client: reqwest::Client,
    bot_token: String,
    channel: String,
}

impl SlackPoster {
    /// Build a poster from config; `None` when Slack is not configured,
    /// in which case posting is skipped.
    pub fn from_config(config: &SlackConfig) -> Option<Self> {
        match (&config.bot_token, &config.channel) {
            (Some(token), Some(channel)) => Some(Self {
                client: reqwest::Client::new(),
                bot_token: token.clone(),
                channel: channel.clone(),
            }),
            _ => None,
        }
    }

    /// Post a transcript to the configured channel, with the display
    /// name overridden per message.
    pub async fn post_transcript(&self, text: &str, username: &str) -> Result<()> {
        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.bot_token)
            .json(&json!({
                "channel": self.channel,
                "text": text,
                "username": username,
            }))
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;
        if !body["ok"].as_bool().unwrap_or(false) {
            return Err(anyhow!(
                "Slack chat.postMessage failed: {}",
                body["error"].as_str().unwrap_or("unknown error")
            ));
        }

        info!("💬 Posted transcript to #{} as {}", self.channel, username);
        Ok(())
    }
}

/// Derive a display username from a dropped file's name: the first
/// three underscore-separated parts, or the whole stem when there are
/// fewer.
pub fn username_from_filename(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(s, _)| s);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 3 {
        parts[..3].join("_")
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_extraction() {
        assert_eq!(
            username_from_filename("jane_doe_0412_take2.mp3"),
            "jane_doe_0412"
        );
        assert_eq!(username_from_filename("shortname.mp3"), "shortname");
        assert_eq!(username_from_filename("a_b.mp3"), "a_b");
    }
}
