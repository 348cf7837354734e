//! Answer sources for clarification questions: `--answer` flags first, then
//! the terminal.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use quill_skills::ClarificationQuestion;

/// Parse an `--answer` flag of the form `key=value`.
pub fn parse_answer(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(format!("expected key=value, got \"{raw}\""));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Answers supplied up front, each used at most once.
#[derive(Debug, Default)]
pub struct PresetAnswers {
    answers: Vec<(String, String)>,
}

impl PresetAnswers {
    pub fn new(answers: Vec<(String, String)>) -> Self {
        Self { answers }
    }

    /// Take the answer whose key names the question's topic.
    pub fn take(&mut self, question: &ClarificationQuestion) -> Option<String> {
        let label = question.topic.label();
        let idx = self
            .answers
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(label))?;
        Some(self.answers.remove(idx).1)
    }
}

/// Prompt text with numbered options. A re-asked question's prompt already
/// names the rejected answer.
pub fn format_question(question: &ClarificationQuestion) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", question.prompt);
    for (i, option) in question.options.iter().enumerate() {
        let _ = writeln!(out, "  {}) {option}", i + 1);
    }
    out
}

/// Ask on stderr, read the answer from stdin. `None` on end of input.
pub fn ask(question: &ClarificationQuestion) -> Result<Option<String>> {
    let stdin = io::stdin();
    ask_with(question, &mut stdin.lock(), &mut io::stderr())
}

fn ask_with<R: BufRead, W: Write>(
    question: &ClarificationQuestion,
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>> {
    write!(output, "{}> ", format_question(question)).context("failed to write prompt")?;
    output.flush().context("failed to write prompt")?;

    let mut line = String::new();
    if input.read_line(&mut line).context("failed to read answer")? == 0 {
        return Ok(None);
    }
    Ok(Some(pick(&question.options, line.trim())))
}

/// A number in range selects that option; anything else passes through.
fn pick(options: &[String], input: &str) -> String {
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_skills::QuestionTopic;
    use std::io::Cursor;

    fn question() -> ClarificationQuestion {
        ClarificationQuestion {
            topic: QuestionTopic::Axis {
                package: "scaffold".into(),
                axis: "uiFramework".into(),
            },
            prompt: "Which uiFramework should scaffold use?".into(),
            options: vec!["A".into(), "B".into(), "C".into()],
            attempt: 0,
            rejected: None,
        }
    }

    #[test]
    fn parse_answer_flag() {
        assert_eq!(
            parse_answer(" uiFramework = B ").unwrap(),
            ("uiFramework".to_string(), "B".to_string())
        );
        assert!(parse_answer("uiFramework").is_err());
        assert!(parse_answer("=B").is_err());
        assert!(parse_answer("uiFramework=").is_err());
    }

    #[test]
    fn preset_answers_are_consumed_once() {
        let mut preset = PresetAnswers::new(vec![
            ("language".into(), "rust".into()),
            ("uiframework".into(), "B".into()),
        ]);
        assert_eq!(preset.take(&question()).as_deref(), Some("B"));
        assert_eq!(preset.take(&question()), None);
    }

    #[test]
    fn package_question_uses_package_key() {
        let mut q = question();
        q.topic = QuestionTopic::Package;
        let mut preset = PresetAnswers::new(vec![("package".into(), "lint-one".into())]);
        assert_eq!(preset.take(&q).as_deref(), Some("lint-one"));
    }

    #[test]
    fn numbered_options() {
        let options = question().options;
        assert_eq!(pick(&options, "2"), "B");
        assert_eq!(pick(&options, "0"), "0");
        assert_eq!(pick(&options, "4"), "4");
        assert_eq!(pick(&options, "c"), "c");
    }

    #[test]
    fn format_lists_options_and_rejection_once() {
        let mut q = question();
        q.prompt = "\"Z\" is not a valid uiFramework for scaffold. Choose one of: A, B, C".into();
        q.rejected = Some("Z".into());
        let text = format_question(&q);
        assert!(text.starts_with("\"Z\" is not a valid uiFramework"));
        assert_eq!(text.matches("\"Z\"").count(), 1);
        assert!(text.contains("  1) A\n  2) B\n  3) C\n"));
    }

    #[test]
    fn ask_reads_one_line() {
        let mut input = Cursor::new("3\n");
        let mut output = Vec::new();
        let answer = ask_with(&question(), &mut input, &mut output).unwrap();
        assert_eq!(answer.as_deref(), Some("C"));
        assert!(String::from_utf8(output).unwrap().ends_with("> "));
    }

    #[test]
    fn ask_end_of_input() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert_eq!(ask_with(&question(), &mut input, &mut output).unwrap(), None);
    }
}
