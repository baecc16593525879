use once_cell::sync::Lazy;
use regex::Regex;

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-•*–]+\s*|\(?\d+[.):](?:\s+|$))+").unwrap());

/// Placeholder answer used when a question's answer is empty or a bare boolean.
pub const ANSWER_SENTINEL: &str = "Not available";

pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn is_boolean_literal(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "false")
}

/// Questions under three words or equal to a boolean literal are unusable.
pub fn is_trivial_question(question: &str) -> bool {
    question.split_whitespace().count() < 3 || is_boolean_literal(question)
}

pub fn sanitize_answer(raw: &str) -> String {
    let answer = raw.trim();
    if answer.is_empty() || is_boolean_literal(answer) || eq_ignore_case(answer, "n/a") {
        ANSWER_SENTINEL.to_string()
    } else {
        answer.to_string()
    }
}

/// For sentence-style model answers; option texts keep their punctuation.
pub fn sanitize_free_answer(raw: &str) -> String {
    sanitize_answer(raw.trim().trim_end_matches('.'))
}

pub fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn first_word(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivial_questions() {
        assert!(is_trivial_question("True"));
        assert!(is_trivial_question("What year?"));
        assert!(is_trivial_question("   "));
        assert!(!is_trivial_question("What is photosynthesis?"));
    }

    #[test]
    fn answers_fall_back_to_sentinel() {
        assert_eq!(sanitize_answer(""), ANSWER_SENTINEL);
        assert_eq!(sanitize_answer(" FALSE "), ANSWER_SENTINEL);
        assert_eq!(sanitize_answer("N/A"), ANSWER_SENTINEL);
        assert_eq!(sanitize_answer("Washington D.C."), "Washington D.C.");
    }

    #[test]
    fn free_answers_lose_the_closing_period() {
        assert_eq!(sanitize_free_answer("Chlorophyll."), "Chlorophyll");
        assert_eq!(sanitize_free_answer(" false. "), ANSWER_SENTINEL);
        assert_eq!(sanitize_free_answer("."), ANSWER_SENTINEL);
    }

    #[test]
    fn strips_bullets_and_numbering() {
        assert_eq!(strip_list_marker("- respiration"), "respiration");
        assert_eq!(strip_list_marker("• Calvin cycle"), "Calvin cycle");
        assert_eq!(strip_list_marker("2. fermentation"), "fermentation");
        assert_eq!(strip_list_marker("3) glycolysis"), "glycolysis");
        assert_eq!(strip_list_marker("  oxidation  "), "oxidation");
    }

    #[test]
    fn keeps_numbers_that_are_content() {
        assert_eq!(strip_list_marker("1990s"), "1990s");
        assert_eq!(strip_list_marker("World War 2"), "World War 2");
        assert_eq!(strip_list_marker("2.5 meters"), "2.5 meters");
        assert_eq!(strip_list_marker("1 mole of gas"), "1 mole of gas");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn first_word_of_answer() {
        assert_eq!(first_word("  light reaction"), Some("light"));
        assert_eq!(first_word(""), None);
    }
}
