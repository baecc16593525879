//! Extraction of MCQ blocks from free-form model output.
//!
//! Two layouts are understood. The labeled layout is what the strict backend
//! asks for:
//!
//! ```text
//! Question: ...
//! Options:
//! A. ...
//! B. ...
//! C. ...
//! D. ...
//! Answer: B
//! ```
//!
//! The loose layout is what local chat models tend to produce: a
//! `Question N:` header line, lettered option lines and an `Answer:` line
//! holding either a letter or the answer text. Anything that does not fit is
//! dropped; an empty result means "nothing usable", not an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::mcq::{LooseBlock, McqDraft, OptionLetter, ParsedBlock};

static LABELED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)Question:\s*(.*?)\s*Options:\s*A\.\s*(.*?)\s*B\.\s*(.*?)\s*C\.\s*(.*?)\s*D\.\s*(.*?)\s*Answer:\s*([ABCD])\b",
    )
    .unwrap()
});

static QUESTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[\s*#]*Question\b[ \t]*\d*[ \t]*[:.)\-]?[ \t*]*").unwrap());

static OPTION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Da-d])\.\s*(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    Labeled,
    Loose,
}

pub fn parse_labeled(raw: &str) -> Vec<ParsedBlock> {
    LABELED_BLOCK
        .captures_iter(raw)
        .filter_map(|caps| {
            let field = |i: usize| caps.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            let answer_letter = OptionLetter::parse(&field(6))?;
            let block = ParsedBlock {
                question: field(1),
                options: [field(2), field(3), field(4), field(5)],
                answer_letter,
            };
            if block.is_valid() {
                Some(block)
            } else {
                tracing::debug!(question = %block.question, "dropping labeled block with empty fields");
                None
            }
        })
        .collect()
}

pub fn parse_loose(raw: &str) -> Vec<LooseBlock> {
    // the text before the first header never holds a question
    QUESTION_HEADER
        .split(raw)
        .skip(1)
        .filter_map(parse_loose_block)
        .collect()
}

fn parse_loose_block(block: &str) -> Option<LooseBlock> {
    let mut lines = block.trim().lines().map(str::trim);
    let question = lines.next()?.to_string();
    if question.is_empty() {
        return None;
    }

    let mut options = Vec::new();
    let mut answer: Option<String> = None;
    for line in lines {
        if let Some(caps) = OPTION_LINE.captures(line) {
            let letter = OptionLetter::parse(&caps[1])?;
            let text = caps[2].trim();
            if !text.is_empty() {
                options.push((letter, text.to_string()));
            }
        } else if answer.is_none() && line.to_lowercase().starts_with("answer:") {
            answer = line.split_once(':').map(|(_, rest)| rest.trim().to_string());
        }
    }

    match answer {
        Some(answer) if !options.is_empty() && !answer.is_empty() => Some(LooseBlock {
            question,
            options,
            answer,
        }),
        _ => None,
    }
}

pub fn parse_drafts(raw: &str, layout: OutputLayout) -> Vec<McqDraft> {
    match layout {
        OutputLayout::Labeled => parse_labeled(raw).into_iter().map(ParsedBlock::into_draft).collect(),
        OutputLayout::Loose => parse_loose(raw).into_iter().filter_map(LooseBlock::into_draft).collect(),
    }
}
