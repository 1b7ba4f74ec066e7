use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::LazyLock;

use crate::labels::LabelTable;
use crate::markup;

static XML_STATS_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:shoutcastserver|streamtitle|servertitle|currentlisteners|songtitle)\s*>")
        .unwrap()
});
/// `OK`, `OK2`... followed by a separator or the end of the text.
pub(crate) static ACK_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^OK\d*(?:[,\s]+|$)").unwrap());
/// A bare `7.html` row: numeric first field and at least six fields.
static BARE_CSV_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:,[^,]*){5,}").unwrap());

/// The upstream body formats we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    XmlStats,
    TabularHtml,
    LegacyCsv,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::XmlStats => "xml",
            Format::TabularHtml => "html",
            Format::LegacyCsv => "csv",
        };
        f.write_str(name)
    }
}

pub struct Sniffer {
    html_marker: Option<Regex>,
}

impl Sniffer {
    pub fn new(labels: &LabelTable) -> Result<Self, regex::Error> {
        let html_marker = if labels.html_markers.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = labels
                .html_markers
                .iter()
                .map(|m| markup::label_pattern(m))
                .collect();
            Some(
                RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
                    .case_insensitive(true)
                    .build()?,
            )
        };
        Ok(Self { html_marker })
    }

    /// Classifies a body. Rules are checked in order and the first hit wins;
    /// `None` means the body is not worth extracting.
    pub fn sniff(&self, body: &str) -> Option<Format> {
        if XML_STATS_TAG.is_match(body) {
            return Some(Format::XmlStats);
        }
        if self
            .html_marker
            .as_ref()
            .is_some_and(|re| re.is_match(body))
        {
            return Some(Format::TabularHtml);
        }
        let visible = markup::clean_value(body)?;
        if ACK_TOKEN.is_match(&visible) || BARE_CSV_ROW.is_match(&visible) {
            return Some(Format::LegacyCsv);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniffer() -> Sniffer {
        Sniffer::new(&LabelTable::default()).unwrap()
    }

    #[test]
    fn xml_stats_wins_over_everything() {
        let body = "<?xml version=\"1.0\"?><SHOUTCASTSERVER><CURRENTLISTENERS>3</CURRENTLISTENERS>\
                    <STREAMSTATUS>1</STREAMSTATUS></SHOUTCASTSERVER>";
        assert_eq!(sniffer().sniff(body), Some(Format::XmlStats));

        let mixed = "<p>Stream Status: up</p><streamtitle>x</streamtitle>";
        assert_eq!(sniffer().sniff(mixed), Some(Format::XmlStats));
    }

    #[test]
    fn html_marker_in_either_language() {
        assert_eq!(
            sniffer().sniff("<td>Stream Status: </td><td>Stream is up</td>"),
            Some(Format::TabularHtml)
        );
        assert_eq!(
            sniffer().sniff("<h2>Informações do Stream</h2>"),
            Some(Format::TabularHtml)
        );
    }

    #[test]
    fn csv_with_ack_token() {
        assert_eq!(sniffer().sniff("OK2,1,1,5,100,3,128,Song"), Some(Format::LegacyCsv));
        assert_eq!(sniffer().sniff("OK"), Some(Format::LegacyCsv));
    }

    #[test]
    fn csv_wrapped_in_seven_html() {
        let body = "<html><meta http-equiv=\"Pragma\" content=\"no-cache\"></head>\
                    <body>1,1,5,100,3,128,Track Name, feat. Someone</body></html>";
        assert_eq!(sniffer().sniff(body), Some(Format::LegacyCsv));
    }

    #[test]
    fn unrecognized_bodies() {
        let s = sniffer();
        assert_eq!(s.sniff(""), None);
        assert_eq!(s.sniff("<html><body>Not Found</body></html>"), None);
        assert_eq!(s.sniff("1,2,3"), None);
        assert_eq!(s.sniff("OKAY then"), None);
    }

    #[test]
    fn empty_marker_list_disables_html_rule() {
        let labels = LabelTable {
            html_markers: Vec::new(),
            ..LabelTable::default()
        };
        let s = Sniffer::new(&labels).unwrap();
        assert_eq!(s.sniff("<td>Stream Status: </td>"), None);
    }
}
