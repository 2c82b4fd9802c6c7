use serde::Deserialize;

/// Han ideographs plus the Japanese syllabaries that travel with them.
pub fn is_logographic(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{2A700}'..='\u{2EBEF}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{3007}'
    )
}

pub fn is_native_punctuation(c: char) -> bool {
    matches!(
        c,
        '。' | '，' | '、' | '？' | '！' | '：' | '；' | '“' | '”' | '‘' | '’' | '（' | '）'
            | '《' | '》' | '【' | '】' | '「' | '」' | '『' | '』' | '…' | '—' | '～' | '·'
    )
}

/// Punctuation that closes a sentence.
pub fn is_sentence_terminal(c: char) -> bool {
    matches!(c, '。' | '？' | '！' | '?' | '!')
}

/// Punctuation that already ends a segment acceptably.
pub fn is_segment_terminal(c: char) -> bool {
    matches!(
        c,
        '。' | '？' | '！' | '，' | '、' | '；' | '：' | '…' | '.' | '?' | '!' | ',' | ';' | ':'
    )
}

pub fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}')
}

/// Characters that carry content (letters, ideographs, digits) rather than
/// punctuation or spacing.
pub fn content_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DominancePolicy {
    /// Primary language subtags written in a logographic script.
    pub languages: Vec<String>,
    pub min_logographic_chars: usize,
    /// Logographic characters must outnumber Latin letters by this factor.
    pub ratio: f64,
}

impl Default for DominancePolicy {
    fn default() -> Self {
        Self {
            languages: ["zh", "ja", "yue", "cmn", "wuu", "chinese", "japanese"]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            min_logographic_chars: 4,
            ratio: 2.0,
        }
    }
}

impl DominancePolicy {
    pub fn language_matches(&self, language: Option<&str>) -> bool {
        let Some(language) = language else {
            return false;
        };
        let primary = language
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        self.languages.iter().any(|l| l.eq_ignore_ascii_case(&primary))
    }

    /// Both the language tag and the character mix must agree, so mixed
    /// content mislabelled by a provider is left alone.
    pub fn holds(&self, text: &str, language: Option<&str>) -> bool {
        if !self.language_matches(language) {
            return false;
        }
        let logographic = text.chars().filter(|c| is_logographic(*c)).count();
        let latin = text.chars().filter(|c| is_latin_letter(*c)).count();
        logographic >= self.min_logographic_chars
            && logographic as f64 >= latin as f64 * self.ratio
    }
}

/// Joins segment texts without separators except between two Latin or
/// digit characters, where a space keeps words apart.
pub fn join_script_aware<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let needs_space = match (joined.chars().last(), part.chars().next()) {
            (Some(prev), Some(next)) => prev.is_ascii_alphanumeric() && next.is_ascii_alphanumeric(),
            _ => false,
        };
        if needs_space {
            joined.push(' ');
        }
        joined.push_str(part);
    }
    joined
}
