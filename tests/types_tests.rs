//! Tests for core types.

use pretty_assertions::assert_eq;
use serde_json::json;
use toolmesh::types::*;

#[test]
fn conversation_turn_constructors() {
    let system = ConversationTurn::system("You are helpful.");
    assert_eq!(system.role, Role::System);
    assert_eq!(system.text(), "You are helpful.");

    let user = ConversationTurn::user("Hello");
    assert_eq!(user.role, Role::User);
    assert!(!user.has_tool_calls());

    let tool = ConversationTurn::tool("call_1", "{}");
    assert_eq!(tool.role, Role::Tool);
    assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
}

#[test]
fn assistant_turn_without_text_has_empty_text() {
    let turn = ConversationTurn::assistant(
        None,
        vec![ToolCallRequest::new("call_1", "search", json!({"q": "rust"}))],
    );
    assert_eq!(turn.text(), "");
    assert!(turn.has_tool_calls());
}

#[test]
fn conversation_turn_serializes_without_empty_fields() {
    let value = serde_json::to_value(ConversationTurn::user("test")).unwrap();
    assert_eq!(value, json!({"role": "user", "content": "test"}));

    let restored: ConversationTurn = serde_json::from_value(value).unwrap();
    assert_eq!(restored, ConversationTurn::user("test"));
}

#[test]
fn tool_result_parses_server_content() {
    let result: ToolCallResult = serde_json::from_value(json!({
        "content": [
            {"type": "text", "text": "line one"},
            {"type": "image", "data": "aGk=", "mimeType": "image/png"},
            {"type": "resource", "uri": "file:///notes.md", "text": "line two"}
        ]
    }))
    .unwrap();

    assert!(!result.is_error);
    assert_eq!(result.content.len(), 3);
    assert_eq!(result.text_content().as_deref(), Some("line one\nline two"));
}

#[test]
fn error_result_is_flagged_and_structured() {
    let result = ToolCallResult::error("disk full");
    assert!(result.is_error);
    assert_eq!(
        result.content,
        vec![ContentItem::Json {
            value: json!({"error": "disk full"})
        }]
    );
    assert_eq!(result.text_content(), None);
    assert!(ToolCallResult::new(Vec::new()).is_empty());
}

#[test]
fn finish_reason_wire_names() {
    assert_eq!(FinishReason::ToolCalls.to_string(), "tool_calls");
    assert_eq!(
        "function_call".parse::<FinishReason>().unwrap(),
        FinishReason::FunctionCall
    );
    assert!(FinishReason::FunctionCall.requests_tools());
    assert!(!FinishReason::Length.requests_tools());
}

#[test]
fn generation_settings_builder() {
    let settings = GenerationSettings::builder()
        .temperature(0.2)
        .max_tokens(256)
        .response_format(ResponseFormat::JsonObject)
        .build();

    assert_eq!(settings.temperature, Some(0.2));
    assert_eq!(settings.max_tokens, Some(256));
    assert_eq!(settings.seed, None);
    assert_eq!(
        serde_json::to_value(&settings.response_format).unwrap(),
        json!({"type": "json_object"})
    );
}
