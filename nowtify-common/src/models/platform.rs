// File: nowtify-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Add sqlx::Type so that SQLx knows how to decode this enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Youtube,
    Kick,
}

impl Platform {
    /// Canonical watch-page URL for a channel on this platform.
    pub fn stream_url(&self, handle: &str) -> String {
        match self {
            Platform::Twitch => format!("https://twitch.tv/{}", handle),
            Platform::Youtube => format!("https://youtube.com/@{}/live", handle.trim_start_matches('@')),
            Platform::Kick => format!("https://kick.com/{}", handle),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Twitch => write!(f, "twitch"),
            Platform::Youtube => write!(f, "youtube"),
            Platform::Kick => write!(f, "kick"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::Youtube),
            "kick" => Ok(Platform::Kick),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

fn strip_handle(input: &str, extra: &[char]) -> Option<String> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || extra.contains(c))
        .collect();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

fn handle_after(input: &str, marker: &str, extra: &[char]) -> Option<String> {
    let rest = &input[input.find(marker)? + marker.len()..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || extra.contains(&c)))
        .unwrap_or(rest.len());
    if end == 0 { None } else { Some(rest[..end].to_string()) }
}

/// Parse a free-form user input (channel URL or bare name) into a platform
/// and handle. Bare alphanumeric names default to Twitch.
pub fn parse_stream_reference(input: &str) -> Option<(Platform, String)> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }

    if input.contains("twitch.tv/") {
        return handle_after(&input, "twitch.tv/", &[]).map(|h| (Platform::Twitch, h));
    }
    if input.contains("youtube.com/@") {
        return handle_after(&input, "youtube.com/@", &['-']).map(|h| (Platform::Youtube, h));
    }
    if input.contains("youtube.com/channel/") {
        return handle_after(&input, "youtube.com/channel/", &['-']).map(|h| (Platform::Youtube, h));
    }
    if input.contains("youtube.com/c/") {
        return handle_after(&input, "youtube.com/c/", &['-']).map(|h| (Platform::Youtube, h));
    }
    if input.contains("kick.com/") {
        return handle_after(&input, "kick.com/", &['-']).map(|h| (Platform::Kick, h));
    }

    // Plain-word hints, e.g. "twitch alice" or "youtube somechannel"
    if input.contains("twitch") {
        let rest = input.replace("twitch", "");
        return strip_handle(&rest, &[]).map(|h| (Platform::Twitch, h));
    }
    if input.contains("youtube") || input.contains("yt ") {
        let rest = input.replace("youtube", "").replace("yt ", "");
        return strip_handle(&rest, &['-']).map(|h| (Platform::Youtube, h));
    }
    if input.contains("kick") {
        let rest = input.replace("kick", "");
        return strip_handle(&rest, &['-']).map(|h| (Platform::Kick, h));
    }

    // A bare name is assumed to be a Twitch login.
    if input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Some((Platform::Twitch, input));
    }

    None
}
