use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
}

impl ChatCompletionRequest {
    /// System prompt first, then the text to rewrite.
    pub fn refinement(model: &str, system_prompt: &str, input: &str) -> Self {
        Self {
            model: model.to_owned(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system_prompt.to_owned(),
                },
                ChatMessage {
                    role: Role::User,
                    content: input.to_owned(),
                },
            ],
        }
    }
}

// Unknown fields (id, usage, finish_reason, ...) are ignored by serde.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}
