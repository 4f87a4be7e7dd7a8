//! Boundary to the conversational AI service.
//!
//! The tutor only ever talks to [`ChatCollaborator`] and [`ChatSession`];
//! [`gemini::GeminiClient`] is the production implementation and tests plug
//! in scripted fakes.

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AiError;
use crate::models::{LearningLevel, PracticeProblemData};

pub use gemini::GeminiClient;

/// One ongoing conversation; keeps its own transcript
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<String, AiError>;
}

#[async_trait]
pub trait ChatCollaborator: Send + Sync {
    /// Open a conversation primed with the tutor instruction for `level`
    fn start_chat(&self, level: LearningLevel) -> Arc<dyn ChatSession>;

    /// One-shot generation constrained to the practice problem schema
    async fn generate_structured(&self, prompt: &str) -> Result<Value, AiError>;
}

pub fn system_instruction(level: LearningLevel) -> String {
    let level_description = match level {
        LearningLevel::Beginner => "The user is a beginner. Explain concepts simply, using analogies, and avoid jargon where possible. Build from the ground up.",
        LearningLevel::Basic => "The user has a basic understanding. You can introduce some core terminology but should still explain it clearly. Focus on building on foundational knowledge.",
        LearningLevel::Advanced => "The user is an advanced learner. You can use technical terminology and delve into complex details. Assume they have a foundational understanding.",
    };

    format!(
        "You are an expert tutor AI, named 'Study Buddy'. Your goal is to help users understand complex topics. {level_description}
- Your explanations should be clear, concise, and accurate.
- Start with fundamental concepts and build up to more advanced ones.
- Use analogies and real-world examples to make topics relatable.
- When asked for practice problems, create relevant multiple-choice questions with appropriate difficulty.
- When asked to simplify, break down the concept into its simplest terms, as if explaining to someone with even less knowledge than the user's stated level.
- Maintain a friendly, encouraging, and supportive tone throughout the conversation.
- After an explanation, ask a follow-up question to check for the user's understanding. This makes the session interactive.
- The user can also ask you questions at any time. Answer them directly and thoroughly before continuing with the study plan."
    )
}

pub fn practice_problem_prompt(topic: &str, level: LearningLevel) -> String {
    format!(
        "Generate a single, unique, multiple-choice practice problem about \"{topic}\". The difficulty should be appropriate for a {level} learner. The question should test a key concept. Provide four distinct options. One option must be correct. Also provide a brief explanation for why the correct answer is right."
    )
}

/// Ask for a practice problem and validate it.
///
/// Never fails: transport errors and malformed output both turn into
/// [`PracticeProblemData::error_problem`].
pub async fn generate_practice_problem(
    collaborator: &dyn ChatCollaborator,
    topic: &str,
    level: LearningLevel,
) -> PracticeProblemData {
    let prompt = practice_problem_prompt(topic, level);
    let result = collaborator
        .generate_structured(&prompt)
        .await
        .and_then(PracticeProblemData::validate);

    match result {
        Ok(problem) => problem,
        Err(e) => {
            tracing::error!(topic, error = %e, "error generating practice problem");
            PracticeProblemData::error_problem()
        }
    }
}
