//! Scripted stand-in for the generative-text capability, shared by unit tests
//! here and by the server and cli test suites.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{GenerationError, GenerationRequest, GeneratorMode, TextGenerator};

/// Plays back replies in order. The last reply repeats once the script runs out.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), seen: Mutex::new(Vec::new()) }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::new([Err(error)])
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Live
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        let mut replies = match self.replies.lock() {
            Ok(replies) => replies,
            Err(poisoned) => poisoned.into_inner(),
        };
        if replies.len() > 1 {
            return replies.pop_front().unwrap_or(Err(GenerationError::EmptyResponse));
        }
        replies.front().cloned().unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ScriptedGenerator;
    use crate::llm::{GenerationError, GenerationRequest, ResponseFormat, TextGenerator};

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "system".to_owned(),
            instruction: "instruction".to_owned(),
            context: json!({}),
            format: ResponseFormat::Text,
        }
    }

    #[tokio::test]
    async fn plays_script_in_order_then_repeats_last_reply() {
        let generator = ScriptedGenerator::new([
            Ok("first".to_owned()),
            Err(GenerationError::EmptyResponse),
            Ok("last".to_owned()),
        ]);

        assert_eq!(generator.generate(&request()).await, Ok("first".to_owned()));
        assert_eq!(generator.generate(&request()).await, Err(GenerationError::EmptyResponse));
        assert_eq!(generator.generate(&request()).await, Ok("last".to_owned()));
        assert_eq!(generator.generate(&request()).await, Ok("last".to_owned()));
        assert_eq!(generator.requests().len(), 4);
    }
}
