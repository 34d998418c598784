//! Pure text-diff utility (spec §4.3). Produces the minimal set of
//! find-and-replace ops a client can hand to the Change Engine to turn
//! `old` into `new`.

use serde::{Deserialize, Serialize};

/// One `{textToReplace, newText, position}` record, as accepted by the
/// Change Engine's single-change request shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOp {
    #[serde(rename = "textToReplace")]
    pub text_to_replace: String,
    #[serde(rename = "newText")]
    pub new_text: String,
    pub position: i64,
}

/// Diffs `old` against `new`, returning an op list such that applying each
/// op left-to-right against `old` (first-occurrence replace) yields `new`.
pub fn diff(old: &str, new: &str) -> Vec<ChangeOp> {
    if old == new {
        return Vec::new();
    }

    if let Some(op) = word_level_diff(old, new) {
        return vec![op];
    }

    if let Some(op) = char_level_diff(old, new) {
        return vec![op];
    }

    vec![ChangeOp {
        text_to_replace: old.to_string(),
        new_text: new.to_string(),
        position: 0,
    }]
}

/// Splits `s` into maximal runs of whitespace/non-whitespace, preserving
/// every byte — no content is discarded, only grouped.
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        let is_ws = c.is_whitespace();
        let mut end = start + c.len_utf8();
        chars.next();
        while let Some(&(idx, c2)) = chars.peek() {
            if c2.is_whitespace() != is_ws {
                break;
            }
            end = idx + c2.len_utf8();
            chars.next();
        }
        tokens.push(&s[start..end]);
    }
    tokens
}

fn word_level_diff(old: &str, new: &str) -> Option<ChangeOp> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    let max_overlap = old_tokens.len().min(new_tokens.len());

    let mut prefix = 0;
    while prefix < max_overlap && old_tokens[prefix] == new_tokens[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < max_overlap - prefix
        && old_tokens[old_tokens.len() - 1 - suffix] == new_tokens[new_tokens.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let (mut prefix, mut suffix) = (prefix, suffix);
    let mid_range = |prefix: usize, suffix: usize, tokens: &[&str]| -> (usize, usize) {
        (prefix, tokens.len() - suffix)
    };

    let (old_start, old_end) = mid_range(prefix, suffix, &old_tokens);
    let (new_start, new_end) = mid_range(prefix, suffix, &new_tokens);

    if old_start == old_end && new_start == new_end {
        // Tokens identical start-to-end; nothing to express at word level.
        return None;
    }

    // An insertion (empty textToReplace) only round-trips correctly through
    // first-occurrence search when it lands at position 0. Otherwise pull
    // in one adjacent matching token as an anchor so the search is
    // unambiguous.
    if old_start == old_end && prefix > 0 {
        if suffix > 0 {
            suffix -= 1;
        } else {
            prefix -= 1;
        }
    }

    let (old_start, old_end) = mid_range(prefix, suffix, &old_tokens);
    let (new_start, new_end) = mid_range(prefix, suffix, &new_tokens);

    let position: i64 = old_tokens[..old_start].iter().map(|t| t.len() as i64).sum();
    let text_to_replace = old_tokens[old_start..old_end].concat();
    let new_text = new_tokens[new_start..new_end].concat();

    if text_to_replace.is_empty() && new_text.is_empty() {
        return None;
    }

    Some(ChangeOp {
        text_to_replace,
        new_text,
        position,
    })
}

fn char_level_diff(old: &str, new: &str) -> Option<ChangeOp> {
    let old_chars: Vec<(usize, char)> = old.char_indices().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let max_overlap = old_chars.len().min(new_chars.len());

    let mut prefix = 0;
    while prefix < max_overlap && old_chars[prefix].1 == new_chars[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < max_overlap - prefix
        && old_chars[old_chars.len() - 1 - suffix].1 == new_chars[new_chars.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mut prefix_byte = old_chars.get(prefix).map(|&(i, _)| i).unwrap_or(old.len());
    let old_suffix_start = if suffix == 0 {
        old.len()
    } else {
        old_chars[old_chars.len() - suffix].0
    };
    let new_prefix_chars = prefix;
    let new_suffix_start = new_chars.len() - suffix;

    if prefix_byte == old_suffix_start && new_prefix_chars == new_suffix_start {
        return None;
    }

    // Same anchor-token rule as the word-level pass, at character
    // granularity.
    let mut new_suffix_start = new_suffix_start;
    let mut old_suffix_start = old_suffix_start;
    if prefix_byte == old_suffix_start && prefix > 0 {
        if suffix > 0 {
            old_suffix_start = old_chars[old_chars.len() - suffix].0;
            new_suffix_start += 1;
        } else {
            prefix_byte = old_chars[prefix - 1].0;
        }
    }

    let text_to_replace = old[prefix_byte..old_suffix_start].to_string();
    let new_text: String = new_chars[new_prefix_chars.min(new_suffix_start)..new_suffix_start]
        .iter()
        .collect();

    if text_to_replace.is_empty() && new_text.is_empty() {
        return None;
    }

    Some(ChangeOp {
        text_to_replace,
        new_text,
        position: prefix_byte as i64,
    })
}

/// Applies `ops` to `text` left-to-right using first-occurrence replace,
/// mirroring the Change Engine's own replacement rule. Used by tests to
/// check the `diff` round-trip invariant, and available to callers that
/// want to preview a diff locally before submitting it.
pub fn apply(text: &str, ops: &[ChangeOp]) -> String {
    let mut body = text.to_string();
    for op in ops {
        if let Some(idx) = body.find(op.text_to_replace.as_str()) {
            body.replace_range(idx..idx + op.text_to_replace.len(), &op.new_text);
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips(old: &str, new: &str) {
        let ops = diff(old, new);
        assert_eq!(apply(old, &ops), new, "diff({old:?}, {new:?}) = {ops:?}");
    }

    #[test]
    fn identical_inputs_produce_no_ops() {
        assert_eq!(diff("same text", "same text"), Vec::new());
    }

    #[test]
    fn single_word_replacement() {
        round_trips("I love reading books", "I love reading emails");
        let ops = diff("I love reading books", "I love reading emails");
        assert_eq!(ops.len(), 1);
        assert!(!ops[0].text_to_replace.is_empty());
        assert!(!ops[0].new_text.is_empty());
    }

    #[test]
    fn all_deletion() {
        let ops = diff("goodbye", "");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].new_text, "");
        round_trips("goodbye", "");
    }

    #[test]
    fn all_insertion() {
        let ops = diff("", "hello");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].text_to_replace, "");
        assert_eq!(ops[0].position, 0);
        round_trips("", "hello");
    }

    #[test]
    fn mid_document_insertion_anchors_on_context() {
        round_trips("ab cd", "ab X cd");
        let ops = diff("ab cd", "ab X cd");
        assert_eq!(ops.len(), 1);
        assert!(
            !ops[0].text_to_replace.is_empty(),
            "insertion away from position 0 must anchor on non-empty context: {ops:?}"
        );
    }

    #[test]
    fn multi_byte_unicode_positions_are_byte_offsets() {
        round_trips("caf\u{e9} time", "caf\u{e9} zone");
        let ops = diff("héllo world", "héllo there");
        round_trips("héllo world", "héllo there");
        assert!(ops[0].position >= 0);
    }

    #[test]
    fn whitespace_only_change() {
        round_trips("a  b", "a b");
    }

    #[test]
    fn disjoint_single_token_strings_round_trip() {
        // No shared prefix/suffix at all; falls out of the word-level pass
        // as a single whole-string replacement.
        round_trips("xyz", "qrs");
    }
}
