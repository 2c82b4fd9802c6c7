use regex::{Captures, Regex};
use serde::Deserialize;

/// A literal, case-insensitive phrase replaced when it stands alone as a
/// Latin token sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionRule {
    pub pattern: String,
    pub replacement: String,
}

const KNOWN_PROPER_NOUNS: &[(&str, &str)] = &[
    (r"chat\s*gpt", "ChatGPT"),
    (r"open\s*ai", "OpenAI"),
    (r"git\s*hub", "GitHub"),
    (r"you\s*tube", "YouTube"),
    (r"java\s*script", "JavaScript"),
    (r"i\s*phone", "iPhone"),
    (r"mac\s*book", "MacBook"),
    (r"wi\s*fi", "Wi-Fi"),
];

/// Fixes recognizer noise inside Latin tokens embedded in logographic text:
/// 0/1 standing in for o/l between letters, and split or mis-cased product
/// names.
pub struct TransliterationFixer {
    digit_confusion: Regex,
    corrections: Vec<(Regex, String)>,
}

impl TransliterationFixer {
    pub fn new(extra: &[CorrectionRule]) -> Result<Self, regex::Error> {
        let mut corrections = Vec::with_capacity(KNOWN_PROPER_NOUNS.len() + extra.len());
        for (pattern, replacement) in KNOWN_PROPER_NOUNS {
            corrections.push((case_insensitive(pattern)?, (*replacement).to_string()));
        }
        for rule in extra {
            corrections.push((
                case_insensitive(&regex::escape(&rule.pattern))?,
                rule.replacement.clone(),
            ));
        }
        Ok(Self {
            digit_confusion: Regex::new(r"[A-Za-z0-9]*[A-Za-z][01]+[A-Za-z][A-Za-z0-9]*")?,
            corrections,
        })
    }

    pub fn fix(&self, text: &str) -> String {
        let mut fixed = self
            .digit_confusion
            .replace_all(text, |caps: &Captures| fix_digit_confusion(&caps[0]))
            .into_owned();
        for (pattern, replacement) in &self.corrections {
            fixed = replace_standalone(pattern, &fixed, replacement);
        }
        fixed
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){}", pattern))
}

/// Replaces matches that do not touch other Latin letters or digits. The
/// neighbours are inspected rather than matched, so adjacent occurrences
/// separated by one character are both replaced. `\b` cannot be used:
/// ideographs count as word characters.
fn replace_standalone(pattern: &Regex, text: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for found in pattern.find_iter(text) {
        let before = text[..found.start()].chars().next_back();
        let after = text[found.end()..].chars().next();
        if before.is_some_and(|c| c.is_ascii_alphanumeric())
            || after.is_some_and(|c| c.is_ascii_alphanumeric())
        {
            continue;
        }
        out.push_str(&text[copied..found.start()]);
        out.push_str(replacement);
        copied = found.end();
    }
    out.push_str(&text[copied..]);
    out
}

fn fix_digit_confusion(token: &str) -> String {
    let letters = token.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    // Tokens that are at least half digits, such as model numbers or
    // H1N1, are left alone.
    if letters < 2 || digits >= letters || token.chars().any(|c| matches!(c, '2'..='9')) {
        return token.to_string();
    }
    let chars: Vec<char> = token.chars().collect();
    let mut out = String::with_capacity(token.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let next = chars.get(i + 1).copied();
        let between_letters = prev.is_some_and(|p| p.is_ascii_alphabetic() || p == '0' || p == '1')
            && next.is_some_and(|n| n.is_ascii_alphabetic() || n == '0' || n == '1');
        let upper = prev.is_some_and(|p| p.is_ascii_uppercase())
            && next.is_some_and(|n| n.is_ascii_uppercase());
        match c {
            '0' if between_letters => out.push(if upper { 'O' } else { 'o' }),
            '1' if between_letters => out.push(if upper { 'I' } else { 'l' }),
            _ => out.push(c),
        }
    }
    out
}
