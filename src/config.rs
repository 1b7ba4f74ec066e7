use anyhow::Context;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

use crate::labels::LabelTable;
use crate::normalize::Fallbacks;

const DEFAULT_STATUS_BASE_URL: &str = "http://sonicpanel.oficialserver.com:8342";
const DEFAULT_CANDIDATES: &str = "/index.html?sid=1,/index.html,/,/stats?sid=1,/7.html";
const DEFAULT_STREAM_URL: &str = "https://sonicpanel.oficialserver.com/8342/;";
const DEFAULT_AVATAR_API_URL: &str = "https://habblive.in/api/user";
const DEFAULT_AVATAR_IMAGER_URL: &str = "https://habblive.in/imager.php";
// Some panels answer non-browser agents with the raw audio stream.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/114 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// Absolute status page URLs, in priority order.
    pub candidates: Vec<String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub fallbacks: Fallbacks,
    pub stream_url: String,
    pub avatar_api_url: String,
    pub avatar_imager_url: String,
    pub labels_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port: u16 = get_or("PORT", "3000")
            .parse()
            .context("PORT must be a number")?;
        let timeout_secs: f64 = get_or("STATUS_TIMEOUT_SECS", "5")
            .parse()
            .context("STATUS_TIMEOUT_SECS must be a number")?;
        if !(timeout_secs > 0.0 && timeout_secs.is_finite()) {
            anyhow::bail!("STATUS_TIMEOUT_SECS must be positive");
        }
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .context("STATUS_TIMEOUT_SECS out of range")?;

        let base = get_or("STATUS_BASE_URL", DEFAULT_STATUS_BASE_URL);
        let candidates = resolve_candidates(&base, &get_or("STATUS_CANDIDATES", DEFAULT_CANDIDATES))?;

        let defaults = Fallbacks::default();
        let fallbacks = Fallbacks {
            station_name: get("STATION_NAME").unwrap_or(defaults.station_name),
            program: get("PROGRAM_FALLBACK").unwrap_or(defaults.program),
            song: get("SONG_FALLBACK").unwrap_or(defaults.song),
        };

        Ok(Self {
            bind_address: get_or("BIND_ADDRESS", "0.0.0.0"),
            port,
            candidates,
            timeout,
            user_agent: get_or("STATUS_USER_AGENT", DEFAULT_USER_AGENT),
            fallbacks,
            stream_url: get_or("STREAM_URL", DEFAULT_STREAM_URL),
            avatar_api_url: get_or("AVATAR_API_URL", DEFAULT_AVATAR_API_URL),
            avatar_imager_url: get_or("AVATAR_IMAGER_URL", DEFAULT_AVATAR_IMAGER_URL),
            labels_file: get("STATUS_LABELS_FILE").map(PathBuf::from),
        })
    }

    pub fn labels(&self) -> anyhow::Result<LabelTable> {
        match &self.labels_file {
            Some(path) => LabelTable::load(path),
            None => Ok(LabelTable::default()),
        }
    }
}

/// Resolves a comma separated list of paths or URLs against `base`.
fn resolve_candidates(base: &str, list: &str) -> anyhow::Result<Vec<String>> {
    let base = Url::parse(base).with_context(|| format!("invalid STATUS_BASE_URL {:?}", base))?;
    let candidates = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            base.join(entry)
                .map(String::from)
                .with_context(|| format!("invalid status candidate {:?}", entry))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if candidates.is_empty() {
        anyhow::bail!("STATUS_CANDIDATES must name at least one status page");
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.fallbacks, Fallbacks::default());
        assert_eq!(
            cfg.candidates,
            vec![
                "http://sonicpanel.oficialserver.com:8342/index.html?sid=1",
                "http://sonicpanel.oficialserver.com:8342/index.html",
                "http://sonicpanel.oficialserver.com:8342/",
                "http://sonicpanel.oficialserver.com:8342/stats?sid=1",
                "http://sonicpanel.oficialserver.com:8342/7.html",
            ]
        );
        assert!(cfg.labels_file.is_none());
    }

    #[test]
    fn candidates_resolve_against_base_and_keep_absolute_urls() {
        let cfg = config(&[
            ("STATUS_BASE_URL", "http://radio.example:8000/panel/"),
            ("STATUS_CANDIDATES", " /7.html , stats?sid=2, https://mirror.example/status ,"),
        ])
        .unwrap();
        assert_eq!(
            cfg.candidates,
            vec![
                "http://radio.example:8000/7.html",
                "http://radio.example:8000/panel/stats?sid=2",
                "https://mirror.example/status",
            ]
        );
    }

    #[test]
    fn overrides_and_blank_values() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("STATUS_TIMEOUT_SECS", "2.5"),
            ("STATION_NAME", "Rádio Teste"),
            ("PROGRAM_FALLBACK", "   "),
            ("STATUS_LABELS_FILE", "/etc/radio/labels.toml"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout, Duration::from_millis(2500));
        assert_eq!(cfg.fallbacks.station_name, "Rádio Teste");
        assert_eq!(cfg.fallbacks.program, "Tocando as Melhores");
        assert_eq!(cfg.labels_file, Some(PathBuf::from("/etc/radio/labels.toml")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("STATUS_TIMEOUT_SECS", "0")]).is_err());
        assert!(config(&[("STATUS_TIMEOUT_SECS", "1e30")]).is_err());
        assert!(config(&[("STATUS_CANDIDATES", " , ")]).is_err());
        assert!(config(&[("STATUS_BASE_URL", "not a url")]).is_err());
    }

    #[test]
    fn missing_label_file_is_an_error() {
        let cfg = config(&[("STATUS_LABELS_FILE", "/nonexistent/labels.toml")]).unwrap();
        assert!(cfg.labels().is_err());
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.labels().unwrap(), LabelTable::default());
    }
}
