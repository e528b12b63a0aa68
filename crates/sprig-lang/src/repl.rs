use std::borrow::Cow;
use std::io;
use std::path::PathBuf;

use nu_ansi_term::Color;
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    Reedline, Signal, ValidationResult, Validator,
};

use sprig_core::error::format_error;
use sprig_core::Interpreter;

const HISTORY_CAPACITY: usize = 500;

struct SprigPrompt;

impl Prompt for SprigPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(">>> ")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        match history_search.status {
            PromptHistorySearchStatus::Passing => {
                Cow::Owned(format!("(search: {}) ", history_search.term))
            }
            PromptHistorySearchStatus::Failing => {
                Cow::Owned(format!("(failing search: {}) ", history_search.term))
            }
        }
    }
}

/// Defers submission until parentheses balance, so multi-line forms can
/// be typed naturally.
struct BalancedValidator;

impl Validator for BalancedValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if input_complete(line) {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

fn input_complete(src: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    for ch in src.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            ';' => in_comment = true,
            '(' => depth += 1,
            // An extra ')' is complete; the reader reports it properly.
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_string
}

fn history_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".sprig_history"))
}

fn make_editor() -> Reedline {
    let mut editor = Reedline::create().with_validator(Box::new(BalancedValidator));
    if let Some(path) = history_path() {
        if let Ok(history) = FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
            editor = editor.with_history(Box::new(history));
        }
    }
    editor
}

pub fn run(interp: &Interpreter) -> io::Result<()> {
    println!(
        "{} (Ctrl-D to quit)",
        Color::Green
            .bold()
            .paint(format!("sprig {}", env!("CARGO_PKG_VERSION")))
    );
    let mut editor = make_editor();
    let prompt = SprigPrompt;
    loop {
        match editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                if buffer.trim().is_empty() {
                    continue;
                }
                match interp.eval_named(&buffer, Some("<repl>")) {
                    Ok(value) => println!("{}", value),
                    Err(err) => {
                        for line in format_error(&err) {
                            eprintln!("{}", line);
                        }
                    }
                }
            }
            Ok(Signal::CtrlC) => continue,
            Ok(Signal::CtrlD) => {
                println!("Quit");
                break;
            }
            Err(err) => {
                eprintln!("input error: {}", err);
                break;
            }
        }
    }
    Ok(())
}
