use crate::domain::{Segment, WordTiming};

use super::script::{content_len, is_sentence_terminal};

/// A timed span of text whose timing is trusted: provider word timings, or
/// the segments as they were before refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl From<&WordTiming> for Anchor {
    fn from(word: &WordTiming) -> Self {
        Self {
            text: word.text.clone(),
            start: word.start,
            end: word.end,
        }
    }
}

impl From<&Segment> for Anchor {
    fn from(segment: &Segment) -> Self {
        Self {
            text: segment.text.clone(),
            start: segment.start,
            end: segment.end,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RealignError {
    #[error("no timing anchors supplied")]
    NoAnchors,
    #[error("refined text has no content")]
    EmptyText,
    #[error("{sentences} sentences cannot share {anchors} anchors")]
    AnchorsExhausted { sentences: usize, anchors: usize },
}

/// Splits after every sentence-terminal mark, keeping trailing closing
/// quotes with their sentence. Concatenating the result yields `text`.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if is_sentence_terminal(c) {
            while let Some(&next) = chars.peek() {
                if is_sentence_terminal(next) || matches!(next, '”' | '’' | '」' | '』' | '）' | '"') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    } else if let Some(last) = sentences.last_mut() {
        last.push_str(&current);
    }
    sentences
}

/// Re-derives segment timing from anchors for a re-split text.
///
/// Each sentence greedily consumes anchors until their content length
/// reaches `match_ratio` of the sentence's share of the total. One anchor is
/// held back per remaining sentence and the final sentence takes whatever is
/// left, so every anchor is used and times never run backwards.
pub fn realign(text: &str, anchors: &[Anchor], match_ratio: f64) -> Result<Vec<Segment>, RealignError> {
    let anchors: Vec<&Anchor> = anchors.iter().filter(|a| !a.text.trim().is_empty()).collect();
    if anchors.is_empty() {
        return Err(RealignError::NoAnchors);
    }
    let sentences: Vec<String> = split_sentences(text)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return Err(RealignError::EmptyText);
    }
    if sentences.len() > anchors.len() {
        return Err(RealignError::AnchorsExhausted {
            sentences: sentences.len(),
            anchors: anchors.len(),
        });
    }

    let text_total = sentences.iter().map(|s| content_len(s)).sum::<usize>().max(1) as f64;
    let anchor_total = anchors.iter().map(|a| content_len(&a.text)).sum::<usize>() as f64;
    // Anchor text may differ in length from refined text; scale targets to it.
    let scale = anchor_total / text_total;

    let mut segments = Vec::with_capacity(sentences.len());
    let mut cursor = 0usize;
    let mut floor = 0.0_f64;
    for (index, sentence) in sentences.iter().enumerate() {
        let remaining_sentences = sentences.len() - index - 1;
        let first = cursor;
        let last = if remaining_sentences == 0 {
            anchors.len() - 1
        } else {
            let limit = anchors.len() - remaining_sentences - 1;
            let target = content_len(sentence) as f64 * scale * match_ratio;
            let mut consumed = 0.0;
            let mut end = first;
            loop {
                consumed += content_len(&anchors[end].text) as f64;
                if consumed >= target || end >= limit {
                    break;
                }
                end += 1;
            }
            end
        };

        let start = anchors[first].start.max(floor);
        let end = anchors[last].end.max(start);
        segments.push(Segment::new(start, end, sentence.clone()));
        floor = end;
        cursor = last + 1;
    }
    Ok(segments)
}
