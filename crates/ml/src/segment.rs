//! Splitting documents into the blocks an NLI model compares.

use std::fmt;
use std::str::FromStr;

use deepscore_core::{Result, ScoreError};

/// How finely source and summary are split before pairwise NLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Granularity {
    #[default]
    Sentence,
    Paragraph,
    Document,
}

impl Granularity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            "document" => Ok(Self::Document),
            other => Err(ScoreError::invalid(format!(
                "granularity '{other}' is not one of sentence, paragraph, document"
            ))),
        }
    }
}

/// Split `text` into non-empty, trimmed blocks.
#[must_use]
pub fn blocks(text: &str, granularity: Granularity) -> Vec<&str> {
    match granularity {
        Granularity::Sentence => sentences(text),
        Granularity::Paragraph => paragraphs(text),
        Granularity::Document => {
            let t = text.trim();
            if t.is_empty() {
                Vec::new()
            } else {
                vec![t]
            }
        }
    }
}

/// Words that take a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "corp", "fig", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec", "u.s", "u.k",
];

/// Whether the word ending just before a period is an abbreviation or an initial.
fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"')
        .next()
        .unwrap_or_default();
    let mut letters = word.chars();
    let initial = matches!((letters.next(), letters.next()), (Some(c), None) if c.is_uppercase());
    initial
        || ABBREVIATIONS
            .iter()
            .any(|abbr| word.eq_ignore_ascii_case(abbr))
}

/// Sentences end at `.`, `!` or `?` followed by whitespace, or at a newline.
/// A period after a common abbreviation (`Dr.`, `e.g.`) or a single capital
/// initial does not end a sentence.
#[must_use]
pub fn sentences(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        let boundary = match ch {
            '\n' => Some(i),
            '.' if is_abbreviation(&text[start..i]) => None,
            '.' | '!' | '?' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(i + ch.len_utf8()),
                None => Some(i + ch.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            push_trimmed(&text[start..end], &mut result);
            start = end;
        }
    }
    push_trimmed(&text[start..], &mut result);
    result
}

/// Paragraphs are separated by blank lines.
#[must_use]
pub fn paragraphs(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    let mut previous_blank = false;

    for line in text.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        if blank && !previous_blank {
            push_trimmed(&text[start..offset], &mut result);
            start = offset;
        }
        previous_blank = blank;
        offset += line.len();
    }
    push_trimmed(&text[start..], &mut result);
    result
}

fn push_trimmed<'a>(block: &'a str, out: &mut Vec<&'a str>) {
    let block = block.trim();
    if !block.is_empty() {
        out.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences() {
        let s = sentences("The cat sat. The dog ran! Did it? Yes");
        assert_eq!(s, ["The cat sat.", "The dog ran!", "Did it?", "Yes"]);
    }

    #[test]
    fn decimal_points_do_not_split() {
        let s = sentences("Pi is 3.14 roughly. Next.");
        assert_eq!(s, ["Pi is 3.14 roughly.", "Next."]);
    }

    #[test]
    fn abbreviations_do_not_split() {
        let s = sentences("Dr. Smith arrived. He met J. Doe, e.g. at noon. Done.");
        assert_eq!(s, ["Dr. Smith arrived.", "He met J. Doe, e.g. at noon.", "Done."]);
    }

    #[test]
    fn newlines_split_sentences() {
        let s = sentences("first line\nsecond line");
        assert_eq!(s, ["first line", "second line"]);
    }

    #[test]
    fn splits_paragraphs_on_blank_lines() {
        let p = paragraphs("one a.\none b.\n\n\ntwo.\n  \nthree.");
        assert_eq!(p, ["one a.\none b.", "two.", "three."]);
    }

    #[test]
    fn document_is_one_block() {
        assert_eq!(blocks("  a. b.  ", Granularity::Document), ["a. b."]);
        assert!(blocks("   ", Granularity::Document).is_empty());
    }

    #[test]
    fn empty_text_has_no_blocks() {
        assert!(sentences("").is_empty());
        assert!(paragraphs("\n\n").is_empty());
    }

    #[test]
    fn unknown_granularity_is_invalid() {
        assert!("mixed".parse::<Granularity>().is_err());
        assert_eq!(
            "paragraph".parse::<Granularity>().unwrap(),
            Granularity::Paragraph
        );
    }
}
