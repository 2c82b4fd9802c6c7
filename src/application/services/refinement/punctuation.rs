use super::script::{is_logographic, is_native_punctuation};

/// Deterministic per-segment cleanup: ASCII punctuation next to
/// logographic text becomes its full-width form, stray spaces around
/// full-width text are removed, Latin runs are spaced off from ideographs,
/// and runs of pause/stop marks collapse into the strongest one.
pub fn normalize_punctuation(text: &str) -> String {
    let collapsed = collapse_whitespace(text.trim());
    let native = map_ascii_punctuation(&collapsed);
    let tightened = tighten_spacing(&native);
    let spaced = space_script_boundaries(&tightened);
    collapse_duplicate_punctuation(&spaced)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

fn native_form(c: char) -> Option<char> {
    match c {
        ',' => Some('，'),
        '.' => Some('。'),
        '?' => Some('？'),
        '!' => Some('！'),
        ':' => Some('：'),
        ';' => Some('；'),
        _ => None,
    }
}

fn map_ascii_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let Some(native) = native_form(c) else {
            out.push(c);
            continue;
        };
        let prev = chars[..i].iter().rev().find(|p| !p.is_whitespace()).copied();
        let next = chars.get(i + 1).copied();
        // "3.5" and "e.g." stay as they are.
        let inside_number = c == '.' && next.is_some_and(|n| n.is_ascii_digit());
        if prev.is_some_and(is_logographic) && !inside_number {
            out.push(native);
        } else {
            out.push(c);
        }
    }
    out
}

fn is_wide(c: char) -> bool {
    is_logographic(c) || is_native_punctuation(c)
}

fn tighten_spacing(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            let around_punct =
                prev.is_some_and(is_native_punctuation) || next.is_some_and(is_native_punctuation);
            let between_wide = prev.is_some_and(is_wide) && next.is_some_and(is_wide);
            if around_punct || between_wide {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn space_script_boundaries(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev {
            let boundary = (is_logographic(p) && c.is_ascii_alphanumeric())
                || (p.is_ascii_alphanumeric() && is_logographic(c));
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn pause_strength(c: char) -> Option<u8> {
    match c {
        '？' | '！' => Some(6),
        '。' => Some(5),
        '；' => Some(4),
        '：' => Some(3),
        '，' => Some(2),
        '、' => Some(1),
        _ => None,
    }
}

fn collapse_duplicate_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run: Option<char> = None;
    for c in text.chars() {
        match (pause_strength(c), run) {
            (Some(strength), Some(current)) => {
                if pause_strength(current).is_some_and(|s| strength > s) {
                    run = Some(c);
                }
            }
            (Some(_), None) => run = Some(c),
            (None, _) => {
                if let Some(mark) = run.take() {
                    out.push(mark);
                }
                out.push(c);
            }
        }
    }
    if let Some(mark) = run {
        out.push(mark);
    }
    out
}
