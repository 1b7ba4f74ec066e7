//! The upstream label vocabulary.
//!
//! Shoutcast panels are localized inconsistently, so the labels the HTML
//! extractor looks for are data rather than literals. The built-in table covers
//! the English and Portuguese pages seen in the wild; a TOML file with the same
//! shape replaces it wholesale.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTable {
    /// Text whose presence marks a body as a tabular HTML status page.
    pub html_markers: Vec<String>,
    pub title: Vec<String>,
    pub genre: Vec<String>,
    pub status: Vec<String>,
    pub current_song: Vec<String>,
    pub current_listeners: Vec<String>,
    pub max_listeners: Vec<String>,
    /// Regexes with two capture groups: current and maximum listeners.
    pub listener_phrases: Vec<String>,
    /// Phrases in the status text that mean the stream is live.
    pub online_phrases: Vec<String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            html_markers: strings(&[
                "Stream Status",
                "Stream Information",
                "Status do Stream",
                "Informações do Stream",
            ]),
            title: strings(&[
                "Stream Title",
                "Stream Name",
                "Título do Stream",
                "Nome do Stream",
            ]),
            genre: strings(&["Stream Genre", "Content Genre", "Gênero do Stream", "Gênero"]),
            status: strings(&["Stream Status", "Status do Stream"]),
            current_song: strings(&[
                "Current Song",
                "Playing Now",
                "Música Atual",
                "Tocando Agora",
            ]),
            current_listeners: strings(&["Current Listeners", "Ouvintes Atuais"]),
            max_listeners: strings(&[
                "Maximum Listeners",
                "Max Listeners",
                "Máximo de Ouvintes",
            ]),
            listener_phrases: strings(&[
                r"with\s+(\d+)\s+of\s+(\d+)\s+listeners",
                r"com\s+(\d+)\s+de\s+(\d+)\s+ouvintes",
            ]),
            online_phrases: strings(&["stream is up", "is currently up", "online", "no ar"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl LabelTable {
    /// Reads a replacement table from TOML. Keys missing from the file keep
    /// their built-in values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading label table {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing label table {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
