use serde::Deserialize;

use crate::domain::Segment;

use super::script::is_segment_terminal;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalRules {
    /// A pause at least this long before the next segment ends a sentence.
    pub gap_full_stop_secs: f64,
    /// Segments at least this long end a sentence regardless of the gap.
    pub long_segment_secs: f64,
    pub interrogative_particles: Vec<char>,
}

impl Default for TerminalRules {
    fn default() -> Self {
        Self {
            gap_full_stop_secs: 1.0,
            long_segment_secs: 8.0,
            interrogative_particles: vec!['吗', '呢', '么'],
        }
    }
}

/// Appends "。", "，" or "？" to every segment that does not already end in
/// punctuation.
pub fn apply_terminal_punctuation(segments: &mut [Segment], rules: &TerminalRules) {
    let count = segments.len();
    for i in 0..count {
        let text = segments[i].text.trim_end();
        let Some(last) = text.chars().last() else {
            continue;
        };
        if is_segment_terminal(last) || !last.is_alphanumeric() {
            continue;
        }

        let next_start = segments[i + 1..]
            .iter()
            .find(|s| !s.text.trim().is_empty())
            .map(|s| s.start);
        let mark = choose_mark(last, &segments[i], next_start, rules);

        let mut text = text.to_string();
        text.push(mark);
        segments[i].text = text;
    }
}

fn choose_mark(last: char, segment: &Segment, next_start: Option<f64>, rules: &TerminalRules) -> char {
    if rules.interrogative_particles.contains(&last) {
        return '？';
    }
    let ends_sentence = match next_start {
        None => true,
        Some(start) => {
            start - segment.end >= rules.gap_full_stop_secs
                || segment.duration() >= rules.long_segment_secs
        }
    };
    if ends_sentence { '。' } else { '，' }
}
