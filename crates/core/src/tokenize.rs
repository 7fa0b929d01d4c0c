use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
          \d+(?:[.,:]\d+)+            # 3.14  1,000  10:30
        | \w+(?:-\w+)*(?:'\w+)*       # words, hyphenated words, contractions
        | \.{2,} | -{2,}              # ellipsis, dashes
        | [^\w\s]                     # any other symbol on its own
        ",
    )
    .expect("token pattern should compile")
});

const CLITICS: &[&str] = &["'s", "'re", "'ve", "'ll", "'d", "'m"];

/// Split text into word and punctuation tokens, Penn-Treebank style.
///
/// Punctuation becomes separate tokens; numbers keep their separators;
/// clitics split off (`don't` → `do n't`, `it's` → `it 's`).
#[must_use]
pub fn word_tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for m in TOKEN.find_iter(text) {
        split_clitic(m.as_str(), &mut tokens);
    }
    tokens
}

fn split_clitic(word: &str, out: &mut Vec<String>) {
    let lower = word.to_lowercase();
    if lower.len() > 3 && lower.ends_with("n't") && lower.is_char_boundary(lower.len() - 3) {
        let cut = word.len() - 3;
        if word.is_char_boundary(cut) {
            out.push(word[..cut].to_string());
            out.push(word[cut..].to_string());
            return;
        }
    }
    if let Some(idx) = word.rfind('\'') {
        if idx > 0 && CLITICS.contains(&word[idx..].to_lowercase().as_str()) {
            out.push(word[..idx].to_string());
            out.push(word[idx..].to_string());
            return;
        }
    }
    out.push(word.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        word_tokenize(s)
    }

    #[test]
    fn splits_trailing_punctuation() {
        assert_eq!(toks("The cat sat on the mat."), [
            "The", "cat", "sat", "on", "the", "mat", "."
        ]);
    }

    #[test]
    fn splits_contractions() {
        assert_eq!(toks("I don't know"), ["I", "do", "n't", "know"]);
        assert_eq!(toks("it's here"), ["it", "'s", "here"]);
        assert_eq!(toks("we'll go"), ["we", "'ll", "go"]);
    }

    #[test]
    fn keeps_numbers_and_hyphenated_words() {
        assert_eq!(toks("pi is 3.14, state-of-the-art"), [
            "pi",
            "is",
            "3.14",
            ",",
            "state-of-the-art"
        ]);
    }

    #[test]
    fn ellipsis_is_one_token() {
        assert_eq!(toks("wait... what?"), ["wait", "...", "what", "?"]);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(toks("").is_empty());
        assert!(toks("   ").is_empty());
    }
}
