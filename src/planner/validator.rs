//! Strict validation of reasoning-service replies.
//!
//! The reply is untrusted text. Anything that does not fit the closed action
//! schema is rejected as a whole; a partially valid reply never becomes an
//! intervention. Pure: the same text and timestamp always give the same
//! result.

use serde_json::{Map, Value};

use crate::error::ResponseSchemaError;
use crate::kernel::time::Millis;
use crate::planner::types::{InterventionAction, InterventionRecord, Quiz, QUIZ_OPTION_COUNT};

pub const MAX_MESSAGE_CHARS: usize = 200;
pub const MAX_QUESTION_CHARS: usize = 200;
pub const MAX_OPTION_CHARS: usize = 100;
pub const MAX_EXPLANATION_CHARS: usize = 300;
pub const MAX_REASON_CHARS: usize = 200;
pub const MAX_REASONING_CHARS: usize = 300;
/// Replies longer than this are not inspected at all.
pub const MAX_REPLY_BYTES: usize = 64 * 1024;

pub const DEFAULT_BREAK_MESSAGE: &str =
    "Time for a short break. Stand up, stretch, and rest your eyes for a few minutes.";

const LOCAL_BREAK_REASONING: &str = "attention below direct-break threshold";

/// `Ok(None)` means the service chose no intervention.
pub fn validate(raw: &str, now: Millis) -> Result<Option<InterventionRecord>, ResponseSchemaError> {
    let root = parse_object(raw)?;

    let action_type = match root.get("type") {
        None | Some(Value::Null) => return Err(ResponseSchemaError::MissingAction),
        Some(Value::String(s)) => s.as_str(),
        Some(_) => return Err(ResponseSchemaError::InvalidField("type")),
    };

    let action = match action_type {
        "none" => return Ok(None),
        "message" => InterventionAction::Message {
            message: required_text(&root, "message", MAX_MESSAGE_CHARS)?,
        },
        "quiz" => InterventionAction::Quiz { quiz: validate_quiz(&root)? },
        "break" => InterventionAction::Break {
            message: optional_text(&root, "message", MAX_MESSAGE_CHARS)?
                .unwrap_or_else(|| DEFAULT_BREAK_MESSAGE.to_string()),
        },
        "show_relevance_warning" => InterventionAction::RelevanceWarning {
            reason: required_text(&root, "reason", MAX_REASON_CHARS)?,
        },
        _ => return Err(ResponseSchemaError::UnknownAction),
    };

    // Diagnostic only; a malformed value is dropped rather than fatal.
    let reasoning = match root.get("reasoning") {
        Some(Value::String(s)) => Some(cap(s, MAX_REASONING_CHARS)).filter(|s| !s.is_empty()),
        _ => None,
    };

    Ok(Some(InterventionRecord::new(action, reasoning, now)))
}

/// Break issued by the gate's direct path, without a service round-trip.
pub fn local_break(now: Millis) -> InterventionRecord {
    InterventionRecord::new(
        InterventionAction::Break {
            message: DEFAULT_BREAK_MESSAGE.to_string(),
        },
        Some(LOCAL_BREAK_REASONING.to_string()),
        now,
    )
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ResponseSchemaError> {
    if raw.len() > MAX_REPLY_BYTES {
        return Err(ResponseSchemaError::Unparseable);
    }

    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => return Ok(map),
        // Valid JSON of the wrong shape is never searched for nested objects.
        Ok(_) => return Err(ResponseSchemaError::NotAnObject),
        Err(_) => {}
    }

    // Models like to wrap JSON in prose or code fences. Only the object that
    // opens at the first brace is tried.
    match first_balanced_object(raw).map(|candidate| serde_json::from_str::<Value>(candidate)) {
        Some(Ok(Value::Object(map))) => Ok(map),
        _ => Err(ResponseSchemaError::Unparseable),
    }
}

/// The `{ ... }` substring opening at the first `{`, if its braces balance.
/// Braces inside JSON strings are ignored.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    balanced_end(&text.as_bytes()[start..]).map(|len| &text[start..start + len])
}

/// Length of the balanced object starting at `bytes[0] == b'{'`.
fn balanced_end(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate_quiz(root: &Map<String, Value>) -> Result<Quiz, ResponseSchemaError> {
    let quiz = match root.get("quiz") {
        Some(Value::Object(map)) => map,
        _ => return Err(ResponseSchemaError::InvalidField("quiz")),
    };

    let question = required_text(quiz, "question", MAX_QUESTION_CHARS)?;

    let raw_options = match quiz.get("options") {
        Some(Value::Array(items)) => items,
        _ => return Err(ResponseSchemaError::InvalidField("options")),
    };
    if raw_options.len() != QUIZ_OPTION_COUNT {
        return Err(ResponseSchemaError::OptionCount(raw_options.len()));
    }
    let mut options: [String; QUIZ_OPTION_COUNT] = Default::default();
    for (slot, item) in options.iter_mut().zip(raw_options) {
        let text = item.as_str().ok_or(ResponseSchemaError::InvalidField("options"))?;
        let text = cap(text, MAX_OPTION_CHARS);
        if text.is_empty() {
            return Err(ResponseSchemaError::EmptyField("options"));
        }
        *slot = text;
    }

    let correct_index = quiz
        .get("correctIndex")
        .and_then(Value::as_i64)
        .ok_or(ResponseSchemaError::InvalidField("correctIndex"))?;
    if !(0..QUIZ_OPTION_COUNT as i64).contains(&correct_index) {
        return Err(ResponseSchemaError::CorrectIndexOutOfRange(correct_index));
    }

    let explanation = optional_text(quiz, "explanation", MAX_EXPLANATION_CHARS)?.unwrap_or_default();

    Ok(Quiz::new(question, options, correct_index as u8, explanation))
}

fn required_text(map: &Map<String, Value>, field: &'static str, max_chars: usize) -> Result<String, ResponseSchemaError> {
    match optional_text(map, field, max_chars)? {
        Some(text) => Ok(text),
        None => match map.get(field) {
            None | Some(Value::Null) => Err(ResponseSchemaError::InvalidField(field)),
            Some(_) => Err(ResponseSchemaError::EmptyField(field)),
        },
    }
}

/// Absent, null or blank yields `None`; a non-string is an error.
fn optional_text(map: &Map<String, Value>, field: &'static str, max_chars: usize) -> Result<Option<String>, ResponseSchemaError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(cap(s, max_chars)).filter(|s| !s.is_empty())),
        Some(_) => Err(ResponseSchemaError::InvalidField(field)),
    }
}

/// Trim, then keep at most `max_chars` characters. Idempotent.
fn cap(text: &str, max_chars: usize) -> String {
    let taken: String = text.trim().chars().take(max_chars).collect();
    taken.trim_end().to_string()
}
