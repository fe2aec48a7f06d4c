//! Playback-intent event extraction
//!
//! Recognizes playback-intent records inside raw logcat text and pulls out
//! the embedded `dat=` source path. Pure and stateless: the same line and
//! pattern always yield the same result.

use regex::Regex;

use adbwatch_core::prelude::*;
use adbwatch_core::{PlaybackEvent, RawLine};

/// Intent parameters that terminate the `dat=` value when present.
///
/// ActivityTaskManager prints the intent as a single line with
/// space-separated `key=value` segments; any of these marks the end of the
/// data URI.
const DAT_TERMINATORS: &[&str] = &[" cmp=", " typ=", " flg=", " act=", " cat=", " pkg="];

/// Stateless matcher turning raw lines into [`PlaybackEvent`]s.
#[derive(Debug, Clone)]
pub struct EventExtractor {
    pattern: Regex,
}

impl EventExtractor {
    /// Compile the configured pattern. An invalid expression is a
    /// configuration error, surfaced before monitoring starts.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::config_invalid(format!("Invalid logcat pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// The pattern source this extractor was compiled from
    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Extract a playback event from a raw line.
    ///
    /// Returns `None` for lines that do not match the pattern, and for
    /// lines that match but carry no isolatable `dat=` path (logged only,
    /// never an error).
    pub fn extract(&self, line: &RawLine) -> Option<PlaybackEvent> {
        if !self.pattern.is_match(&line.text) {
            return None;
        }

        match extract_dat_path(&line.text) {
            Some(path) => Some(PlaybackEvent::new(path, line.read_at)),
            None => {
                debug!("Pattern matched but no dat= path found: {}", line.text);
                None
            }
        }
    }
}

/// Isolate the `dat=` value from an intent line.
///
/// The value runs from after `dat=` to the first trailing intent parameter
/// (or end of line). A `file://` scheme prefix is stripped so mapping rules
/// can be written against plain paths.
fn extract_dat_path(text: &str) -> Option<String> {
    let dat_pos = text.find("dat=")?;
    let mut value = &text[dat_pos + "dat=".len()..];

    for terminator in DAT_TERMINATORS {
        if let Some(pos) = value.find(terminator) {
            value = &value[..pos];
        }
    }

    let value = value.trim().trim_end_matches('}');
    let value = value.strip_prefix("file://").unwrap_or(value);

    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_LINE: &str = "05-12 20:14:05.123  1534  2101 I ActivityTaskManager: \
        START u0 {act=android.intent.action.VIEW \
        dat=file:///storage/emulated/0/Movies/show/e01.mkv typ=video/x-matroska \
        flg=0x10000000 cmp=org.videolan.vlc/.StartActivity} from uid 10145";

    fn extractor() -> EventExtractor {
        EventExtractor::new("START .*cmp=").unwrap()
    }

    fn line(text: &str) -> RawLine {
        RawLine::new(text)
    }

    #[test]
    fn test_extracts_path_from_start_line() {
        let event = extractor().extract(&line(START_LINE)).unwrap();
        assert_eq!(event.source_path, "/storage/emulated/0/Movies/show/e01.mkv");
    }

    #[test]
    fn test_non_matching_line_yields_none() {
        let text = "05-12 20:14:06.001  1534  2101 I ActivityTaskManager: \
                    Displayed org.videolan.vlc/.StartActivity";
        assert!(extractor().extract(&line(text)).is_none());
    }

    #[test]
    fn test_matching_line_without_dat_yields_none() {
        let text = "START u0 {act=android.intent.action.MAIN cmp=com.example/.Main}";
        assert!(extractor().extract(&line(text)).is_none());
    }

    #[test]
    fn test_content_uri_is_preserved() {
        let text = "START u0 {act=android.intent.action.VIEW \
                    dat=content://com.nas.provider/external_files/Movies/e01.mkv \
                    typ=video/mp4 cmp=org.videolan.vlc/.StartActivity}";
        let event = extractor().extract(&line(text)).unwrap();
        assert_eq!(
            event.source_path,
            "content://com.nas.provider/external_files/Movies/e01.mkv"
        );
    }

    #[test]
    fn test_dat_value_at_end_of_intent() {
        let text = "START u0 {cmp=org.videolan.vlc/.StartActivity dat=/storage/x.mkv}";
        // cmp= precedes dat= here, so the value runs to the closing brace
        let event = extractor().extract(&line(text)).unwrap();
        assert_eq!(event.source_path, "/storage/x.mkv");
    }

    #[test]
    fn test_terminator_order_does_not_matter() {
        let text = "START u0 {dat=/storage/a.mkv pkg=org.videolan.vlc typ=video/mp4 cmp=x/.Y}";
        let event = extractor().extract(&line(text)).unwrap();
        assert_eq!(event.source_path, "/storage/a.mkv");
    }

    #[test]
    fn test_empty_dat_value_yields_none() {
        let text = "START u0 {dat= cmp=org.videolan.vlc/.StartActivity}";
        assert!(extractor().extract(&line(text)).is_none());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = EventExtractor::new("START [unclosed").unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ex = extractor();
        let l = line(START_LINE);
        assert_eq!(ex.extract(&l), ex.extract(&l));
    }
}
