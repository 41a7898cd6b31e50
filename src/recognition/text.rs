use regex::Regex;
use std::sync::OnceLock;

/// Strip recognizer noise markers and collapse whitespace. Incremental
/// decodes of a rolling window love to emit `[BLANK_AUDIO]`, bracketed noise
/// annotations, and ragged spacing; matching runs on the cleaned text only.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|blank_audio|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|blank audio|music|laughter|applause|cough|breath(?:ing)?|wind|background|wind blowing)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_clean_text_through() {
        assert_eq!(sanitize_transcript("下一站 国贸"), "下一站 国贸");
    }

    #[test]
    fn strips_blank_audio_markers() {
        assert_eq!(sanitize_transcript("[BLANK_AUDIO] next station Central"), "next station Central");
    }

    #[test]
    fn strips_noise_annotations_and_collapses_whitespace() {
        assert_eq!(
            sanitize_transcript("  (noise)  arriving   at  [music] Guomao "),
            "arriving at Guomao"
        );
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_transcript("   "), "");
        assert_eq!(sanitize_transcript("[silence]"), "");
    }
}
