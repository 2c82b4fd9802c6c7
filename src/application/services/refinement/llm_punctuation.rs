use std::sync::Arc;

use serde::Deserialize;

use crate::application::ports::LlmClient;

use super::script::is_native_punctuation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmPunctuationMode {
    #[default]
    Off,
    PerSegment,
    FullText,
}

const PUNCTUATION_PROMPT: &str = "Add punctuation to the following transcript. \
Use full-width punctuation for Chinese or Japanese text. \
Do not add, remove, reorder or translate any words. \
Return only the punctuated text.";

/// Asks a language model to punctuate text, accepting the answer only when
/// every content character survives unchanged and in order.
pub struct LlmPunctuator {
    client: Arc<dyn LlmClient>,
}

impl LlmPunctuator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn punctuate(&self, text: &str) -> Result<String, String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let answer = self
            .client
            .complete(PUNCTUATION_PROMPT, text)
            .await
            .map_err(|e| e.to_string())?;
        let answer = answer.trim();
        if content_chars(answer) != content_chars(text) {
            return Err("model altered transcript content".to_string());
        }
        Ok(answer.to_string())
    }
}

fn content_chars(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| c.is_alphanumeric() && !is_native_punctuation(*c))
        .collect()
}
