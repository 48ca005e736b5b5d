use crate::config::AgentConfig;

use super::agui::{AgentMessage, AgentRunInput, AgentState};
use super::openai_chat::ChatCompletionRequest;

/// Thread/run identifiers assigned to one relayed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIds {
    pub thread_id: String,
    pub run_id: String,
}

/// Model the run is attributed to: the request's model, or the configured
/// fallback when the request omits it or sends a blank string.
#[must_use]
pub fn effective_model<'a>(request: &'a ChatCompletionRequest, agent: &'a AgentConfig) -> &'a str {
    request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(agent.default_model.as_str())
}

/// Translate a chat completion request into the agent backend's run input.
///
/// Messages are mapped one-to-one in order; missing content becomes `""`.
/// Each message gets an id derived from the run id and its position.
/// Sampling parameters travel in `forwardedProps` so workflows can honour them.
#[must_use]
pub fn translate_chat_request(
    request: &ChatCompletionRequest,
    agent: &AgentConfig,
    ids: RunIds,
) -> AgentRunInput {
    let messages = request
        .messages
        .iter()
        .enumerate()
        .map(|(index, message)| AgentMessage {
            id: format!("{}-{index}", ids.run_id),
            role: message.role.as_str().to_string(),
            content: message
                .content
                .as_ref()
                .map(super::openai_chat::MessageContent::to_text)
                .unwrap_or_default(),
        })
        .collect();

    let mut forwarded_props = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        forwarded_props.insert("temperature".into(), temperature.into());
    }
    if let Some(top_p) = request.top_p {
        forwarded_props.insert("top_p".into(), top_p.into());
    }
    if let Some(max_tokens) = request.max_tokens {
        forwarded_props.insert("max_tokens".into(), max_tokens.into());
    }

    AgentRunInput {
        thread_id: ids.thread_id,
        run_id: ids.run_id,
        messages,
        tools: Vec::new(),
        context: Vec::new(),
        state: AgentState {
            selected_model: effective_model(request, agent).to_string(),
            workflow_type: agent.workflow_type.clone(),
        },
        forwarded_props,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::openai_chat::{ChatMessage, ChatRole, MessageContent};

    fn ids() -> RunIds {
        RunIds {
            thread_id: "t".into(),
            run_id: "r".into(),
        }
    }

    fn message(role: ChatRole, content: Option<&str>) -> ChatMessage {
        ChatMessage {
            role,
            content: content.map(|text| MessageContent::Text(text.to_string())),
        }
    }

    fn request(model: Option<&str>, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.map(str::to_string),
            messages,
            stream: false,
            temperature: None,
            top_p: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_messages_are_order_preserving_and_elementwise_equal() {
        let req = request(
            Some("gpt-4o"),
            vec![
                message(ChatRole::System, Some("be brief")),
                message(ChatRole::User, Some("Hi")),
                message(ChatRole::Assistant, None),
                message(ChatRole::Tool, Some("{\"ok\":true}")),
                message(ChatRole::User, Some("again")),
            ],
        );
        let input = translate_chat_request(&req, &AgentConfig::default(), ids());

        assert_eq!(input.messages.len(), req.messages.len());
        for (out, inbound) in input.messages.iter().zip(&req.messages) {
            assert_eq!(out.role, inbound.role.as_str());
            let expected = inbound
                .content
                .as_ref()
                .map(MessageContent::to_text)
                .unwrap_or_default();
            assert_eq!(out.content, expected);
        }
        assert_eq!(input.messages[2].content, "");
        let ids: Vec<&str> = input.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["r-0", "r-1", "r-2", "r-3", "r-4"]);
    }

    #[test]
    fn test_state_and_tools() {
        let req = request(Some("gpt-4o"), vec![message(ChatRole::User, Some("Hi"))]);
        let agent = AgentConfig {
            workflow_type: "research".into(),
            ..AgentConfig::default()
        };
        let input = translate_chat_request(&req, &agent, ids());
        assert!(input.tools.is_empty());
        assert!(input.context.is_empty());
        assert_eq!(input.state.selected_model, "gpt-4o");
        assert_eq!(input.state.workflow_type, "research");
        assert_eq!(input.thread_id, "t");
        assert_eq!(input.run_id, "r");
    }

    #[test]
    fn test_missing_or_blank_model_uses_fallback() {
        let agent = AgentConfig::default();
        let req = request(None, vec![]);
        let input = translate_chat_request(&req, &agent, ids());
        assert_eq!(input.state.selected_model, agent.default_model);

        let req = request(Some("  "), vec![]);
        assert_eq!(effective_model(&req, &agent), agent.default_model);
    }

    #[test]
    fn test_sampling_parameters_are_forwarded_when_present() {
        let mut req = request(None, vec![message(ChatRole::User, Some("Hi"))]);
        let input = translate_chat_request(&req, &AgentConfig::default(), ids());
        assert!(input.forwarded_props.is_empty());

        req.temperature = Some(0.5);
        req.max_tokens = Some(256);
        let input = translate_chat_request(&req, &AgentConfig::default(), ids());
        assert_eq!(input.forwarded_props["temperature"], 0.5);
        assert_eq!(input.forwarded_props["max_tokens"], 256);
        assert!(!input.forwarded_props.contains_key("top_p"));
    }

    #[test]
    fn test_serialized_run_input_has_every_agui_field() {
        let req = request(Some("gpt-4o-mini"), vec![message(ChatRole::User, Some("Hi"))]);
        let input = translate_chat_request(&req, &AgentConfig::default(), ids());
        let body = serde_json::to_value(&input).unwrap();
        assert_eq!(body["threadId"], "t");
        assert_eq!(body["runId"], "r");
        assert_eq!(body["context"], serde_json::json!([]));
        assert_eq!(body["forwardedProps"], serde_json::json!({}));
        assert_eq!(
            body["messages"],
            serde_json::json!([{"id": "r-0", "role": "user", "content": "Hi"}])
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let req = request(Some("m"), vec![message(ChatRole::User, Some("Hi"))]);
        let agent = AgentConfig::default();
        assert_eq!(
            translate_chat_request(&req, &agent, ids()),
            translate_chat_request(&req, &agent, ids())
        );
    }
}
