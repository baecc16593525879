use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::text::eq_ignore_case;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            "C" | "c" => Some(Self::C),
            "D" | "d" => Some(Self::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        };
        write!(f, "{}", c)
    }
}

/// A finished multiple-choice question.
///
/// `options[answer_letter.index()] == answer` holds for every record built by
/// [`McqRecord::from_shuffled`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqRecord {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub answer_letter: OptionLetter,
}

impl McqRecord {
    pub fn from_shuffled(question: String, options: Vec<String>, correct_idx: usize) -> Option<Self> {
        let answer_letter = OptionLetter::from_index(correct_idx)?;
        let answer = options.get(correct_idx)?.clone();
        Some(Self {
            question,
            options,
            answer,
            answer_letter,
        })
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.answer_letter.index()).map(String::as_str)
    }
}

/// One block matched by the labeled ("Question:/Options:/A.-D./Answer:") format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub question: String,
    pub options: [String; 4],
    pub answer_letter: OptionLetter,
}

impl ParsedBlock {
    pub fn is_valid(&self) -> bool {
        !self.question.trim().is_empty() && self.options.iter().all(|o| !o.trim().is_empty())
    }

    pub fn correct_answer(&self) -> &str {
        &self.options[self.answer_letter.index()]
    }

    pub fn into_draft(self) -> McqDraft {
        let idx = self.answer_letter.index();
        let answer = self.options[idx].clone();
        let candidates = self
            .options
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, o)| o)
            .collect();
        McqDraft {
            question: self.question,
            answer,
            candidates,
        }
    }
}

/// One block from the loose "Question N:" format: any number of lettered
/// options and a free-form answer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseBlock {
    pub question: String,
    pub options: Vec<(OptionLetter, String)>,
    pub answer: String,
}

impl LooseBlock {
    /// Resolves the answer line to an option: a bare letter selects by label,
    /// otherwise a case-insensitive text match, otherwise the answer text as given.
    /// A letter naming no parsed option drops the block.
    pub fn into_draft(self) -> Option<McqDraft> {
        let letter = answer_letter_prefix(&self.answer);
        let by_letter = letter.and_then(|l| self.options.iter().position(|(ol, _)| *ol == l));
        let by_text = || {
            self.options
                .iter()
                .position(|(_, text)| eq_ignore_case(text, &self.answer))
        };

        match by_letter.or_else(by_text) {
            Some(idx) => {
                let answer = self.options[idx].1.clone();
                let candidates = self
                    .options
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, (_, text))| text)
                    .collect();
                Some(McqDraft {
                    question: self.question,
                    answer,
                    candidates,
                })
            }
            None if letter.is_some() => None,
            None => Some(McqDraft {
                question: self.question,
                answer: self.answer,
                candidates: self.options.into_iter().map(|(_, text)| text).collect(),
            }),
        }
    }
}

/// Reads `B`, `b.`, `(C)`, `D) text` or `A: text` as a letter reference.
fn answer_letter_prefix(answer: &str) -> Option<OptionLetter> {
    let trimmed = answer.trim().trim_start_matches('(');
    let mut chars = trimmed.chars();
    let letter = OptionLetter::parse(&chars.next()?.to_string())?;
    match chars.next() {
        None => Some(letter),
        Some('.') | Some(')') | Some(':') => Some(letter),
        Some(_) => None,
    }
}

/// A question with its correct answer and whatever wrong options the model
/// already proposed, before distractor synthesis and shuffling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McqDraft {
    pub question: String,
    pub answer: String,
    pub candidates: Vec<String>,
}
