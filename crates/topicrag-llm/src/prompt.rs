use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides accurate and concise answers based on the given context.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// User prompt with the context chunks in the order given, then the query.
pub fn build_prompt(query: &str, context: &[String]) -> String {
    format!(
        "Use the following context to answer the query. \
         If the context doesn't contain relevant information, say so.\n\n\
         Context:\n{}\n\nQuery: {}\n\nAnswer:",
        context.join("\n\n"),
        query
    )
}

pub fn build_request(model: &str, temperature: f32, max_tokens: u32, query: &str, context: &[String]) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
            ChatMessage { role: "user".to_string(), content: build_prompt(query, context) },
        ],
        temperature,
        max_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_precedes_query_in_order() {
        let prompt = build_prompt("why?", &["first".to_string(), "second".to_string()]);
        let first = prompt.find("first").unwrap();
        let second = prompt.find("second").unwrap();
        let query = prompt.find("Query: why?").unwrap();
        assert!(first < second && second < query);
        assert!(prompt.contains("Context:\nfirst\n\nsecond\n\nQuery:"));
        assert!(prompt.ends_with("Answer:"));
    }
}
