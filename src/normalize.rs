use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::extract::ExtractedFields;
use crate::markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Online,
    Offline,
}

/// The one response shape the player understands, whatever the upstream
/// format was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioStatus {
    pub locutor: String,
    pub programa: String,
    pub musica: String,
    pub unicos: u32,
    pub bitrate: Option<u32>,
    pub status: StreamState,
    /// Candidate URL the data came from.
    pub fonte: String,
}

/// Values used when the upstream page leaves a field blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallbacks {
    pub station_name: String,
    pub program: String,
    pub song: String,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            station_name: "Radio Habblive".to_string(),
            program: "Tocando as Melhores".to_string(),
            song: "Música não identificada".to_string(),
        }
    }
}

pub struct Normalizer {
    fallbacks: Fallbacks,
    online: Option<Regex>,
}

impl Normalizer {
    pub fn new(fallbacks: Fallbacks, online_phrases: &[String]) -> Result<Self, regex::Error> {
        let online = if online_phrases.is_empty() {
            None
        } else {
            let parts: Vec<String> = online_phrases
                .iter()
                .map(|p| markup::label_pattern(p))
                .collect();
            Some(
                RegexBuilder::new(&format!(r"\b(?:{})\b", parts.join("|")))
                    .case_insensitive(true)
                    .build()?,
            )
        };
        Ok(Self { fallbacks, online })
    }

    pub fn normalize(&self, fields: &ExtractedFields, source: &str) -> RadioStatus {
        let unicos = fields.current_listeners.unwrap_or(0);
        let status_says_up = match (&self.online, &fields.status_text) {
            (Some(re), Some(text)) => re.is_match(text),
            _ => false,
        };
        let online = status_says_up || unicos > 0 || fields.stream_up == Some(true);

        RadioStatus {
            locutor: or_fallback(&fields.title, &self.fallbacks.station_name),
            programa: or_fallback(&fields.genre, &self.fallbacks.program),
            musica: or_fallback(&fields.current_song, &self.fallbacks.song),
            unicos,
            bitrate: fields.bitrate,
            status: if online { StreamState::Online } else { StreamState::Offline },
            fonte: source.to_string(),
        }
    }
}

fn or_fallback(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
