use serde::{Deserialize, Serialize};

pub const INSIGHT_SYSTEM_ROLE: &str =
    "You are an expert in PCOD and women's health providing deep insights.";

pub const CHAT_SYSTEM_ROLE: &str =
    "You are an expert in health-related issues, especially PCOD and menstrual health.";

/// Returned in place of generated insights when the service fails.
pub const FALLBACK_INSIGHT: &str = "Error generating AI insights. Please try again later.";

/// One chat-completions message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// System and user messages asking for insights about one cluster.
pub fn cluster_insight_messages(cluster: i64) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(INSIGHT_SYSTEM_ROLE),
        ChatMessage::user(format!(
            "Provide detailed medical insights for someone in PCOD Risk Cluster {cluster}. \
             Include recommendations on diet, exercise, stress management, and hormonal balance."
        )),
    ]
}

/// System and user messages wrapping a free-form chat question.
pub fn chat_messages(message: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CHAT_SYSTEM_ROLE),
        ChatMessage::user(format!(
            "Give deep insights on health-related issues, especially PCOD and menstrual health:\n\n'{message}'"
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_prompt_names_the_cluster() {
        let messages = cluster_insight_messages(3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(
            messages[1].content,
            "Provide detailed medical insights for someone in PCOD Risk Cluster 3. Include \
             recommendations on diet, exercise, stress management, and hormonal balance."
        );
    }

    #[test]
    fn chat_prompt_quotes_the_message() {
        let messages = chat_messages("cramps?");
        assert_eq!(messages[0].content, CHAT_SYSTEM_ROLE);
        assert!(messages[1].content.ends_with("\n\n'cramps?'"));
    }
}
