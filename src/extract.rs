//! Field extraction, one strategy per upstream [`Format`].
//!
//! Every strategy produces the same [`ExtractedFields`]; anything it cannot
//! find stays `None` and is resolved later by the normalizer. Each field is
//! read through an ordered list of rules and the first rule that yields a
//! non-empty value wins.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::labels::LabelTable;
use crate::markup;
use crate::sniff::{Format, ACK_TOKEN};

static BITRATE_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*kbps").unwrap());
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

/// Inline formatting that Shoutcast wraps around labels inside a cell.
const INLINE_TAGS: &str = r"(?:</?(?:font|b|strong|span|i|em)[^>]*>\s*)*";
/// Text allowed between a label and its colon. Never crosses a tag or a line.
const LABEL_SUFFIX: &str = r"[^:<\n]{0,16}";

/// Whatever one upstream body told us. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub status_text: Option<String>,
    pub current_song: Option<String>,
    pub current_listeners: Option<u32>,
    pub max_listeners: Option<u32>,
    pub peak_listeners: Option<u32>,
    pub unique_listeners: Option<u32>,
    pub bitrate: Option<u32>,
    /// Explicit stream status flag, when the format carries one.
    pub stream_up: Option<bool>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An ordered list of patterns whose first capture group is the value.
struct Rules(Vec<Regex>);

impl Rules {
    fn first_text(&self, haystack: &str) -> Option<String> {
        self.0.iter().find_map(|re| {
            re.captures(haystack)
                .and_then(|caps| caps.get(1))
                .and_then(|m| markup::clean_value(m.as_str()))
        })
    }

    fn first_number(&self, haystack: &str) -> Option<u32> {
        self.0.iter().find_map(|re| {
            re.captures(haystack)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().trim().parse().ok())
        })
    }
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

fn alternation(labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let parts: Vec<String> = labels.iter().map(|l| markup::label_pattern(l)).collect();
    Some(format!("(?:{})", parts.join("|")))
}

/// Two-cell row first, then the inline `label: value` form. A label may carry
/// a short suffix before its colon, as in `Stream Genre(s):`.
fn text_rules(labels: &[String]) -> Result<Rules, regex::Error> {
    let Some(alt) = alternation(labels) else {
        return Ok(Rules(Vec::new()));
    };
    Ok(Rules(vec![
        build(&format!(
            r"{alt}{LABEL_SUFFIX}:\s*{INLINE_TAGS}</t[dh]>\s*<t[dh][^>]*>(.*?)</t[dh]>"
        ))?,
        build(&format!(
            r"{alt}{LABEL_SUFFIX}:\s*(.*?)(?:<br[^>]*>|</td>|</tr>|</p>|<hr|\n)"
        ))?,
    ]))
}

fn count_rules(labels: &[String]) -> Result<Rules, regex::Error> {
    let Some(alt) = alternation(labels) else {
        return Ok(Rules(Vec::new()));
    };
    Ok(Rules(vec![
        build(&format!(
            r"{alt}[^:<]*:\s*{INLINE_TAGS}</t[dh]>\s*<t[dh][^>]*>\s*(?:<[^>]+>\s*)*(\d+)"
        ))?,
        build(&format!(r"{alt}[^:<]*:\s*(\d+)"))?,
    ]))
}

fn xml_rules(tags: &[&str]) -> Result<Rules, regex::Error> {
    tags.iter()
        .map(|tag| build(&format!(r"<{tag}\s*>(.*?)</{tag}\s*>")))
        .collect::<Result<Vec<_>, _>>()
        .map(Rules)
}

struct HtmlRules {
    title: Rules,
    genre: Rules,
    status: Rules,
    current_song: Rules,
    current_listeners: Rules,
    max_listeners: Rules,
    listener_phrases: Vec<Regex>,
}

struct XmlRules {
    title: Rules,
    genre: Rules,
    current_song: Rules,
    current_listeners: Rules,
    max_listeners: Rules,
    peak_listeners: Rules,
    unique_listeners: Rules,
    stream_status: Rules,
    bitrate: Rules,
}

pub struct Extractor {
    html: HtmlRules,
    xml: XmlRules,
}

impl Extractor {
    pub fn new(labels: &LabelTable) -> Result<Self, regex::Error> {
        let listener_phrases = labels
            .listener_phrases
            .iter()
            .map(|p| build(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            html: HtmlRules {
                title: text_rules(&labels.title)?,
                genre: text_rules(&labels.genre)?,
                status: text_rules(&labels.status)?,
                current_song: text_rules(&labels.current_song)?,
                current_listeners: count_rules(&labels.current_listeners)?,
                max_listeners: count_rules(&labels.max_listeners)?,
                listener_phrases,
            },
            xml: XmlRules {
                title: xml_rules(&["STREAMTITLE", "SERVERTITLE"])?,
                genre: xml_rules(&["SERVERGENRE", "STREAMGENRE"])?,
                current_song: xml_rules(&["SONGTITLE", "CURRENTSONG"])?,
                current_listeners: xml_rules(&["CURRENTLISTENERS"])?,
                max_listeners: xml_rules(&["MAXLISTENERS"])?,
                peak_listeners: xml_rules(&["PEAKLISTENERS"])?,
                unique_listeners: xml_rules(&["UNIQUELISTENERS"])?,
                stream_status: xml_rules(&["STREAMSTATUS"])?,
                bitrate: xml_rules(&["BITRATE"])?,
            },
        })
    }

    /// Runs the strategy for `format`. Returns `None` when nothing usable was
    /// found, which the fetcher treats as a failed candidate.
    pub fn extract(&self, format: Format, body: &str) -> Option<ExtractedFields> {
        let fields = match format {
            Format::TabularHtml => self.extract_html(body),
            Format::XmlStats => self.extract_xml(body),
            Format::LegacyCsv => extract_csv(body),
        };
        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }

    fn extract_html(&self, html: &str) -> ExtractedFields {
        let rules = &self.html;
        let status_text = rules.status.first_text(html);

        let phrase_counts = status_text.as_deref().and_then(|status| {
            rules.listener_phrases.iter().find_map(|re| {
                let caps = re.captures(status)?;
                let current: u32 = caps.get(1)?.as_str().parse().ok()?;
                let max: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
                Some((current, max))
            })
        });
        let (current_listeners, max_listeners) = match phrase_counts {
            Some((current, max)) => (Some(current), max),
            None => (
                rules.current_listeners.first_number(html),
                rules.max_listeners.first_number(html),
            ),
        };

        let bitrate = status_text
            .as_deref()
            .and_then(|status| BITRATE_PHRASE.captures(status))
            .and_then(|caps| caps[1].parse().ok());

        ExtractedFields {
            title: rules.title.first_text(html),
            genre: rules.genre.first_text(html),
            current_song: rules.current_song.first_text(html),
            status_text,
            current_listeners,
            max_listeners,
            bitrate,
            ..ExtractedFields::default()
        }
    }

    fn extract_xml(&self, body: &str) -> ExtractedFields {
        let xml = CDATA.replace_all(body, "$1");
        let rules = &self.xml;

        let stream_status = rules.stream_status.first_number(&xml);
        let bitrate = rules.bitrate.first_number(&xml);
        let status_text = match (stream_status, bitrate) {
            (Some(flag), Some(kbps)) => Some(format!(
                "Stream is {} at {} kbps",
                if flag > 0 { "up" } else { "down" },
                kbps
            )),
            _ => None,
        };

        ExtractedFields {
            title: rules.title.first_text(&xml),
            genre: rules.genre.first_text(&xml),
            status_text,
            current_song: rules.current_song.first_text(&xml),
            current_listeners: rules.current_listeners.first_number(&xml),
            max_listeners: rules.max_listeners.first_number(&xml),
            peak_listeners: rules.peak_listeners.first_number(&xml),
            unique_listeners: rules.unique_listeners.first_number(&xml),
            bitrate,
            stream_up: stream_status.map(|flag| flag > 0),
        }
    }
}

/// `7.html` row: current, status, peak, max, unique, bitrate, song. The song
/// is everything after the sixth comma, commas included.
fn extract_csv(body: &str) -> ExtractedFields {
    let Some(visible) = markup::clean_value(body) else {
        return ExtractedFields::default();
    };
    let row = match ACK_TOKEN.find(&visible) {
        Some(ack) => &visible[ack.end()..],
        None => visible.as_str(),
    };

    let parts: Vec<&str> = row.split(',').collect();
    if parts.len() < 6 {
        return ExtractedFields::default();
    }
    let number = |i: usize| parts[i].trim().parse::<u32>().ok();
    let song = parts[6..].join(",");
    let song = song.trim();

    ExtractedFields {
        current_listeners: number(0),
        stream_up: number(1).map(|flag| flag > 0),
        peak_listeners: number(2),
        max_listeners: number(3),
        unique_listeners: number(4),
        bitrate: number(5),
        current_song: (!song.is_empty()).then(|| song.to_string()),
        ..ExtractedFields::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOUTCAST_HTML: &str = r#"<html><body>
<table cellpadding=2 cellspacing=0 border=0 align=center>
<tr><td width=100 nowrap><font class=default>Server Status: </font></td><td><font class=default><b>Server is currently up and public.</b></td></tr>
<tr><td width=100 nowrap><font class=default>Stream Status: </font></td><td><font class=default><b>Stream is up at 128 kbps with 41 of 1000 listeners (38 unique)</b></td></tr>
<tr><td width=100 nowrap><font class=default>Stream Title: </font></td><td><font class=default><b>DJ Fulano &amp; Amigos</b></td></tr>
<tr><td width=100 nowrap><font class=default>Stream Genre: </font></td><td><font class=default><b>Pop &lt;Hits&gt;</b></td></tr>
<tr><td width=100 nowrap><font class=default>Current Song: </font></td><td><font class=default><b>Caf&#233; - Ao Vivo</b></td></tr>
</table></body></html>"#;

    fn extractor() -> Extractor {
        Extractor::new(&LabelTable::default()).unwrap()
    }

    #[test]
    fn html_table_rows() {
        let fields = extractor()
            .extract(Format::TabularHtml, SHOUTCAST_HTML)
            .unwrap();

        assert_eq!(fields.title.as_deref(), Some("DJ Fulano & Amigos"));
        assert_eq!(fields.genre.as_deref(), Some("Pop <Hits>"));
        assert_eq!(fields.current_song.as_deref(), Some("Café - Ao Vivo"));
        assert_eq!(
            fields.status_text.as_deref(),
            Some("Stream is up at 128 kbps with 41 of 1000 listeners (38 unique)")
        );
        assert_eq!(fields.current_listeners, Some(41));
        assert_eq!(fields.max_listeners, Some(1000));
        assert_eq!(fields.bitrate, Some(128));
        assert_eq!(fields.stream_up, None);
    }

    #[test]
    fn shoutcast_v2_index_page() {
        let html = r#"<table cellpadding="2" cellspacing="0" border="0">
<tr><td width="140" valign="top">Stream Status: </td><td><b>Stream is up (MP3 @ 128 kbps) with 41 of 1000 listeners</b></td></tr>
<tr><td valign="top">Listener Peak: </td><td><b>60</b></td></tr>
<tr><td valign="top">Stream Name: </td><td><b>DJ Fulano</b></td></tr>
<tr><td valign="top">Stream Genre(s): </td><td><b>Pop</b></td></tr>
<tr><td valign="top">Playing Now: </td><td><b><a href="currentsong?sid=1">Artist - Song</a></b></td></tr>
</table>"#;
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();

        assert_eq!(fields.title.as_deref(), Some("DJ Fulano"));
        assert_eq!(fields.genre.as_deref(), Some("Pop"));
        assert_eq!(fields.current_song.as_deref(), Some("Artist - Song"));
        assert_eq!(fields.current_listeners, Some(41));
        assert_eq!(fields.max_listeners, Some(1000));
        assert_eq!(fields.bitrate, Some(128));
    }

    #[test]
    fn label_suffix_stops_at_line_end() {
        let html = "Stream Title is unknown\nStream Genre: Rock\n";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();
        assert_eq!(fields.title, None);
        assert_eq!(fields.genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn portuguese_listener_cell() {
        let html = "<tr><td>Status do Stream: </td><td>Servidor no ar</td></tr>\
                    <tr><td>Ouvintes Atuais: </td><td>9</td></tr>";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();
        assert_eq!(fields.current_listeners, Some(9));
        assert_eq!(fields.max_listeners, None);
    }

    #[test]
    fn html_inline_labels() {
        let html = "<p>Stream Status: Stream is up at 64 kbps with 2 of 50 listeners<br>\
                    Stream Title: Rádio Teste<br/>Current Song: Artist - Song</p>";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();

        assert_eq!(fields.title.as_deref(), Some("Rádio Teste"));
        assert_eq!(fields.current_song.as_deref(), Some("Artist - Song"));
        assert_eq!(fields.current_listeners, Some(2));
        assert_eq!(fields.max_listeners, Some(50));
        assert_eq!(fields.genre, None);
    }

    #[test]
    fn portuguese_listener_phrase() {
        let html = "<tr><td>Status do Stream: </td><td>No ar a 96 kbps com 7 de 200 ouvintes</td></tr>";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();

        assert_eq!(fields.current_listeners, Some(7));
        assert_eq!(fields.max_listeners, Some(200));
        assert_eq!(fields.bitrate, Some(96));
    }

    #[test]
    fn listener_cells_when_no_phrase() {
        let html = "<tr><td>Stream Status: </td><td>Stream is up</td></tr>\
                    <tr><td>Current Listeners: </td><td><b>12</b></td></tr>\
                    <tr><td>Máximo de Ouvintes: </td><td>300</td></tr>";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();

        assert_eq!(fields.current_listeners, Some(12));
        assert_eq!(fields.max_listeners, Some(300));
    }

    #[test]
    fn table_row_preferred_over_inline() {
        let html = "<tr><td>Stream Title:</td><td>From Row</td></tr>\nStream Title: From Inline\n";
        let fields = extractor().extract(Format::TabularHtml, html).unwrap();
        assert_eq!(fields.title.as_deref(), Some("From Row"));
    }

    #[test]
    fn html_without_known_labels_is_unusable() {
        let html = "<h1>Stream Information</h1><p>Nothing to see here</p>";
        assert_eq!(extractor().extract(Format::TabularHtml, html), None);
    }

    #[test]
    fn xml_stats_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<SHOUTCASTSERVER>
<CURRENTLISTENERS>41</CURRENTLISTENERS>
<PEAKLISTENERS>60</PEAKLISTENERS>
<MAXLISTENERS>1000</MAXLISTENERS>
<UNIQUELISTENERS>38</UNIQUELISTENERS>
<SERVERGENRE>Pop</SERVERGENRE>
<SERVERTITLE>DJ Fulano</SERVERTITLE>
<SONGTITLE><![CDATA[Rock & Roll]]></SONGTITLE>
<STREAMSTATUS>1</STREAMSTATUS>
<BITRATE>128</BITRATE>
</SHOUTCASTSERVER>"#;
        let fields = extractor().extract(Format::XmlStats, xml).unwrap();

        assert_eq!(fields.title.as_deref(), Some("DJ Fulano"));
        assert_eq!(fields.genre.as_deref(), Some("Pop"));
        assert_eq!(fields.current_song.as_deref(), Some("Rock & Roll"));
        assert_eq!(fields.current_listeners, Some(41));
        assert_eq!(fields.max_listeners, Some(1000));
        assert_eq!(fields.peak_listeners, Some(60));
        assert_eq!(fields.unique_listeners, Some(38));
        assert_eq!(fields.bitrate, Some(128));
        assert_eq!(fields.stream_up, Some(true));
        assert_eq!(fields.status_text.as_deref(), Some("Stream is up at 128 kbps"));
    }

    #[test]
    fn xml_stream_title_beats_server_title() {
        let xml = "<SERVERTITLE>Server</SERVERTITLE><STREAMTITLE>Stream</STREAMTITLE>";
        let fields = extractor().extract(Format::XmlStats, xml).unwrap();
        assert_eq!(fields.title.as_deref(), Some("Stream"));
    }

    #[test]
    fn xml_current_song_tag_when_songtitle_missing() {
        let xml = "<SHOUTCASTSERVER><CURRENTSONG>Artist - Song</CURRENTSONG></SHOUTCASTSERVER>";
        let fields = extractor().extract(Format::XmlStats, xml).unwrap();
        assert_eq!(fields.current_song.as_deref(), Some("Artist - Song"));
    }

    #[test]
    fn xml_down_stream_without_bitrate_has_no_phrase() {
        let xml = "<SHOUTCASTSERVER><STREAMSTATUS>0</STREAMSTATUS></SHOUTCASTSERVER>";
        let fields = extractor().extract(Format::XmlStats, xml).unwrap();
        assert_eq!(fields.stream_up, Some(false));
        assert_eq!(fields.status_text, None);

        let xml = "<STREAMSTATUS>0</STREAMSTATUS><BITRATE>64</BITRATE>";
        let fields = extractor().extract(Format::XmlStats, xml).unwrap();
        assert_eq!(fields.status_text.as_deref(), Some("Stream is down at 64 kbps"));
    }

    #[test]
    fn csv_keeps_commas_in_song_title() {
        let fields = extractor()
            .extract(Format::LegacyCsv, "1,1,5,100,3,128,Track Name, feat. Someone")
            .unwrap();

        assert_eq!(fields.current_listeners, Some(1));
        assert_eq!(fields.stream_up, Some(true));
        assert_eq!(fields.peak_listeners, Some(5));
        assert_eq!(fields.max_listeners, Some(100));
        assert_eq!(fields.unique_listeners, Some(3));
        assert_eq!(fields.bitrate, Some(128));
        assert_eq!(
            fields.current_song.as_deref(),
            Some("Track Name, feat. Someone")
        );
    }

    #[test]
    fn csv_with_ack_token_and_html_wrapper() {
        let body = "<html><body>OK2,0,1,9,50,2,,</body></html>";
        let fields = extractor().extract(Format::LegacyCsv, body).unwrap();

        assert_eq!(fields.current_listeners, Some(0));
        assert_eq!(fields.stream_up, Some(true));
        assert_eq!(fields.bitrate, None);
        assert_eq!(fields.current_song, None);
    }

    #[test]
    fn csv_non_numeric_fields_are_absent_not_zero() {
        let fields = extractor()
            .extract(Format::LegacyCsv, "x,1,?,100,,128,Song")
            .unwrap();
        assert_eq!(fields.current_listeners, None);
        assert_eq!(fields.peak_listeners, None);
        assert_eq!(fields.unique_listeners, None);
        assert_eq!(fields.max_listeners, Some(100));
    }

    #[test]
    fn short_csv_is_unusable() {
        assert_eq!(extractor().extract(Format::LegacyCsv, "OK"), None);
        assert_eq!(extractor().extract(Format::LegacyCsv, "1,1,5"), None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let e = extractor();
        let first = e.extract(Format::TabularHtml, SHOUTCAST_HTML);
        let second = e.extract(Format::TabularHtml, SHOUTCAST_HTML);
        assert_eq!(first, second);
    }
}
