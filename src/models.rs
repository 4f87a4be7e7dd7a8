use chrono::{DateTime, Local, TimeZone};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LearningLevel {
    #[default]
    Beginner,
    Basic,
    Advanced,
}

impl LearningLevel {
    pub const ALL: [LearningLevel; 3] = [
        LearningLevel::Beginner,
        LearningLevel::Basic,
        LearningLevel::Advanced,
    ];

    pub fn next(self) -> Self {
        match self {
            LearningLevel::Beginner => LearningLevel::Basic,
            LearningLevel::Basic => LearningLevel::Advanced,
            LearningLevel::Advanced => LearningLevel::Beginner,
        }
    }
}

/// The interactive study controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StudyMode {
    Explain,
    Practice,
    Simplify,
    Translate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeProblemData {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: i32,
    pub explanation: String,
}

pub const PRACTICE_OPTION_COUNT: usize = 4;

impl PracticeProblemData {
    /// Stand-in problem used when generation fails; `correct_answer_index` is -1
    pub fn error_problem() -> Self {
        Self {
            question: "Could not generate a practice problem.".to_string(),
            options: vec![
                "Sorry, an error occurred.".to_string(),
                "Please try again.".to_string(),
                "Check console for details.".to_string(),
                "N/A".to_string(),
            ],
            correct_answer_index: -1,
            explanation:
                "There was an issue communicating with the AI service to generate a problem."
                    .to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.correct_answer_index == -1
    }

    /// The correct option text, if this is a real problem
    pub fn correct_option(&self) -> Option<&str> {
        usize::try_from(self.correct_answer_index)
            .ok()
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }

    /// Check untrusted structured output from the AI service.
    ///
    /// Requires a non-empty question and explanation, exactly four string
    /// options and an integer answer index that points into them.
    pub fn validate(value: Value) -> Result<Self, AiError> {
        let malformed = |reason: &str| AiError::MalformedProblem(reason.to_string());

        let obj = value.as_object().ok_or_else(|| malformed("not an object"))?;

        let question = obj
            .get("question")
            .and_then(Value::as_str)
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| malformed("missing question"))?;

        let options = obj
            .get("options")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("options is not an array"))?;
        if options.len() != PRACTICE_OPTION_COUNT {
            return Err(malformed("expected exactly 4 options"));
        }
        let options = options
            .iter()
            .map(|o| o.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| malformed("options must be strings"))?;

        let index = obj
            .get("correctAnswerIndex")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("correctAnswerIndex is not an integer"))?;
        if !(0..PRACTICE_OPTION_COUNT as i64).contains(&index) {
            return Err(malformed("correctAnswerIndex out of range"));
        }

        let explanation = obj
            .get("explanation")
            .and_then(Value::as_str)
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| malformed("missing explanation"))?;

        Ok(Self {
            question: question.to_string(),
            options,
            correct_answer_index: index as i32,
            explanation: explanation.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_problem: Option<PracticeProblemData>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_key_point: bool,
}

impl Message {
    pub fn user_text(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: Some(text.into()),
            practice_problem: None,
            is_key_point: false,
        }
    }

    pub fn ai_text(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::Ai,
            text: Some(text.into()),
            practice_problem: None,
            is_key_point: false,
        }
    }

    pub fn ai_problem(id: i64, problem: PracticeProblemData) -> Self {
        Self {
            id,
            sender: Sender::Ai,
            text: None,
            practice_problem: Some(problem),
            is_key_point: false,
        }
    }
}

/// One topic-study conversation, persisted as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub topic: String,
    pub learning_level: LearningLevel,
    pub chat_history: Vec<Message>,
    /// Milliseconds since the unix epoch
    pub last_accessed: i64,
}

impl StudySession {
    pub fn last_accessed_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.last_accessed).single()
    }

    /// Most recent AI message that carries text (practice problems are skipped)
    pub fn last_ai_text(&self) -> Option<&str> {
        last_ai_text(&self.chat_history)
    }
}

pub fn last_ai_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|m| m.sender == Sender::Ai)
        .find_map(|m| m.text.as_deref())
}
