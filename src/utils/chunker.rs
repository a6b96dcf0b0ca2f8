//! Splits oversized text into pieces the upstream accepts.
//!
//! Boundaries prefer sentence terminators, then whitespace, and only cut
//! inside a word when a single word is longer than the limit. Lengths are
//! counted in chars.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("sentence pattern is valid"));

/// Split `text` into ordered chunks of at most `max_len` chars.
///
/// Text that already fits is returned whole and unchanged. Joining the
/// chunks with single spaces gives back the text with its spacing
/// normalized.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if char_len(&sentence) > max_len {
            flush(&mut chunks, &mut current);
            split_words(&sentence, max_len, &mut chunks, &mut current);
        } else {
            accumulate(&sentence, max_len, &mut chunks, &mut current);
        }
    }
    flush(&mut chunks, &mut current);

    chunks
}

/// Sentences with their terminators kept and inner whitespace collapsed
fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        push_collapsed(&text[start..m.end()], &mut out);
        start = m.end();
    }
    push_collapsed(&text[start..], &mut out);
    out
}

fn push_collapsed(piece: &str, out: &mut Vec<String>) {
    let collapsed = piece.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        out.push(collapsed);
    }
}

fn split_words(sentence: &str, max_len: usize, chunks: &mut Vec<String>, current: &mut String) {
    for word in sentence.split_whitespace() {
        if char_len(word) <= max_len {
            accumulate(word, max_len, chunks, current);
            continue;
        }

        // no boundary inside the limit, hard cut
        flush(chunks, current);
        let chars: Vec<char> = word.chars().collect();
        let mut pieces = chars.chunks(max_len).peekable();
        while let Some(piece) = pieces.next() {
            let piece: String = piece.iter().collect();
            if pieces.peek().is_some() {
                chunks.push(piece);
            } else {
                *current = piece;
            }
        }
    }
}

fn accumulate(piece: &str, max_len: usize, chunks: &mut Vec<String>, current: &mut String) {
    if current.is_empty() {
        current.push_str(piece);
    } else if char_len(current) + 1 + char_len(piece) <= max_len {
        current.push(' ');
        current.push_str(piece);
    } else {
        flush(chunks, current);
        current.push_str(piece);
    }
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn short_text_is_returned_whole() {
        assert_eq!(split("Hola mundo", 10), vec!["Hola mundo"]);
        assert_eq!(split("Hola", 50), vec!["Hola"]);
    }

    #[test]
    fn sentences_are_packed_up_to_the_limit() {
        let text = "One two. Three four! Five six? Seven.";
        let chunks = split(text, 20);
        assert_eq!(chunks, vec!["One two. Three four!", "Five six? Seven."]);
    }

    #[test]
    fn decimal_points_are_not_sentence_ends() {
        let text = "Pi is 3.14 roughly. Done now.";
        let chunks = split(text, 20);
        assert_eq!(chunks, vec!["Pi is 3.14 roughly.", "Done now."]);
    }

    #[test]
    fn long_sentence_falls_back_to_words() {
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = split(text, 12);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta", "epsilon zeta"]);
    }

    #[test]
    fn long_word_is_hard_cut() {
        let chunks = split("abcdefghij xy", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn chunks_respect_limit_and_keep_content_in_order() {
        let text = "Lorem ipsum dolor sit amet. Consectetur adipiscing elit, sed do eiusmod! \
                    Tempor incididunt ut labore et dolore magna aliqua? Ut enim ad minim veniam, \
                    quis nostrud exercitationullamcolaborisnisiutaliquip ex ea commodo.";
        for max in [5, 11, 17, 40, 64] {
            let chunks = split(text, max);
            assert!(chunks.len() > 1);
            for chunk in &chunks {
                assert!(chunk.chars().count() <= max, "{chunk:?} exceeds {max}");
                assert!(!chunk.is_empty());
            }
            assert_eq!(non_whitespace(&chunks.join(" ")), non_whitespace(text));
        }
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let text = "día año niño. más acción aquí.";
        let chunks = split(text, 14);
        assert_eq!(chunks, vec!["día año niño.", "más acción", "aquí."]);
    }
}
