pub const STRICT_PASSAGE_CHARS: usize = 1500;
pub const QUESTION_PASSAGE_CHARS: usize = 3000;

/// Loose layout: `Question N:` headers, lettered options, free-form answer line.
pub fn local_mcq_prompt(num_questions: usize, passage: &str) -> String {
    format!(
        r#"You are a quiz-making assistant. From the following passage, generate {n} multiple-choice questions.
Each question must have four options labeled A. B. C. D. and an answer line like "Answer: <text or letter>".
Use this format:

Question 1: <question>
A. <option A>
B. <option B>
C. <option C>
D. <option D>
Answer: <correct option letter or full text>

Passage:
{passage}"#,
        n = num_questions,
        passage = passage.trim()
    )
}

/// Labeled layout: `Question:`, `Options:`, `A.`-`D.`, `Answer: <letter>`.
pub fn strict_mcq_prompt(num_questions: usize, passage: &str) -> String {
    format!(
        r#"Generate {n} multiple-choice questions (MCQs) from the following passage.
Each MCQ should be structured as follows:

Question: [Your question here]
Options:
A. [Option A]
B. [Option B]
C. [Option C]
D. [Option D]
Answer: [Letter of the correct answer]

Repeat this format exactly {n} times. Only output the questions in this exact format.

Passage:
{passage}
"#,
        n = num_questions,
        passage = passage.trim()
    )
}

pub fn question_list_prompt(num_questions: usize, passage: &str) -> String {
    format!(
        "Generate {} short factual quiz questions (not full MCQs) from this passage.\n\
         Write one question per line. Only return the questions.\n\n{}",
        num_questions,
        passage.trim()
    )
}

pub fn answer_prompt(question: &str) -> String {
    format!(
        "Answer this question accurately in one short sentence:\n\n{}",
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_prompt_spells_out_labels() {
        let p = strict_mcq_prompt(2, "  Plants need light.  ");
        assert!(p.starts_with("Generate 2 multiple-choice questions"));
        for label in ["Question:", "Options:", "A.", "B.", "C.", "D.", "Answer:"] {
            assert!(p.contains(label), "missing {label}");
        }
        assert!(p.contains("Repeat this format exactly 2 times."));
        assert!(p.trim_end().ends_with("Plants need light."));
    }

    #[test]
    fn local_prompt_uses_numbered_headers() {
        let p = local_mcq_prompt(3, "Cells divide.");
        assert!(p.contains("generate 3 multiple-choice questions"));
        assert!(p.contains("Question 1: <question>"));
        assert!(p.ends_with("Passage:\nCells divide."));
    }

    #[test]
    fn stepwise_prompts() {
        assert!(question_list_prompt(4, "text").starts_with("Generate 4 short factual quiz questions"));
        assert!(answer_prompt(" Why? ").ends_with("\n\nWhy?"));
    }
}
