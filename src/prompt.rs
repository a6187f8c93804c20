const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional communication assistant for \
support agents. Support agents often struggle to find the right words when dealing with \
frustrated clients; your job is to help them express themselves in a professional, \
empathetic, and concise way. Rewrite the following text to be professional, empathetic, \
and concise while preserving the original meaning and intent.";

/// Instruction sent as the system message of every refinement request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemPrompt(String);

impl Default for SystemPrompt {
    fn default() -> Self {
        Self(DEFAULT_SYSTEM_PROMPT.to_owned())
    }
}

impl SystemPrompt {
    /// Uses `custom` unless it is missing or blank.
    pub fn with_override(custom: Option<&str>) -> Self {
        match custom {
            Some(text) if !text.trim().is_empty() => Self(text.to_owned()),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
