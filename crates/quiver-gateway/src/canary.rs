//! Fixed canary prompt/answer table (spec §4.5 steps 3 and 7, §9 "the
//! canary prompt hidden path"). Ported verbatim from the Go source's
//! `canaryPrompts`/`canaryAnswers` package-level tables.
//!
//! The documented ambiguity in §9 over what the client sees on a canary
//! hit is resolved in favor of the **placeholder** behavior: `completion`
//! is replaced with a fixed string and never leaks the real canary answer.

pub const CANARY_PROMPTS: &[&str] = &[
    "What is the capital of France?",
    "Calculate 2 + 2",
    "Who wrote Romeo and Juliet?",
];

pub const CANARY_PLACEHOLDER: &str = "Canary response hidden";

pub fn expected_answer(prompt: &str) -> Option<&'static str> {
    match prompt {
        "What is the capital of France?" => Some("Paris"),
        "Calculate 2 + 2" => Some("4"),
        "Who wrote Romeo and Juliet?" => Some("William Shakespeare"),
        _ => None,
    }
}

/// Case-insensitive substring check of the expected answer in `completion`
/// (spec §4.5 step 7).
pub fn check_answer(prompt: &str, completion: &str) -> bool {
    match expected_answer(prompt) {
        Some(expected) => completion.to_lowercase().contains(&expected.to_lowercase()),
        None => false,
    }
}

pub fn sample_prompt(rng: &mut impl rand::Rng) -> &'static str {
    CANARY_PROMPTS[rng.gen_range(0..CANARY_PROMPTS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_passes() {
        assert!(check_answer("What is the capital of France?", "The answer is Paris."));
    }

    #[test]
    fn case_insensitive_match_passes() {
        assert!(check_answer("Calculate 2 + 2", "the result is 4"));
    }

    #[test]
    fn wrong_answer_fails() {
        assert!(!check_answer("What is the capital of France?", "London"));
    }

    #[test]
    fn unknown_prompt_never_passes() {
        assert!(!check_answer("not a canary prompt", "anything"));
    }
}
