//! OpenAI provider wire format tests.

use std::time::Duration;

use crm_narrator::providers::openai::{build_request, chat_endpoint, parse_response, OpenAiProvider};
use crm_narrator::providers::{CompletionRequest, LlmProvider, Message, ProviderError};

fn simple_request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user("본문을 작성하세요.")],
        system: Some("당신은 카피라이터입니다.".to_owned()),
        max_tokens: Some(256),
        temperature: Some(0.4),
    }
}

#[test]
fn build_request_puts_system_message_first() {
    let req = build_request("gpt-4o-mini", &simple_request());
    assert_eq!(req.model, "gpt-4o-mini");
    assert_eq!(req.max_tokens, Some(256));
    assert_eq!(req.temperature, Some(0.4));
    assert_eq!(req.messages.len(), 2);
    assert_eq!(req.messages[0].role, "system");
    assert_eq!(req.messages[0].content, "당신은 카피라이터입니다.");
    assert_eq!(req.messages[1].role, "user");
    assert_eq!(req.messages[1].content, "본문을 작성하세요.");
}

#[test]
fn build_request_without_system_defaults_max_tokens() {
    let request = CompletionRequest {
        messages: vec![Message::user("hi")],
        system: None,
        max_tokens: None,
        temperature: None,
    };
    let req = build_request("gpt-4o-mini", &request);
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.messages[0].role, "user");
    assert_eq!(req.max_tokens, Some(1024));

    let json = serde_json::to_value(&req).expect("request should serialize");
    assert!(json.get("temperature").is_none());
}

#[test]
fn parse_response_extracts_trimmed_text_and_usage() {
    let body = r#"{
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{"message": {"role": "assistant", "content": "  바쁜 아침이에요.\n"}}],
        "usage": {"prompt_tokens": 120, "completion_tokens": 42}
    }"#;
    let resp = match parse_response(body) {
        Ok(resp) => resp,
        Err(err) => panic!("response should parse: {err}"),
    };
    assert_eq!(resp.text, "바쁜 아침이에요.");
    assert_eq!(resp.model, "gpt-4o-mini-2024-07-18");
    assert_eq!(resp.usage.input_tokens, 120);
    assert_eq!(resp.usage.output_tokens, 42);
}

#[test]
fn parse_response_null_content_is_empty_text() {
    let body = r#"{"choices": [{"message": {"content": null}}]}"#;
    let resp = match parse_response(body) {
        Ok(resp) => resp,
        Err(err) => panic!("response should parse: {err}"),
    };
    assert!(resp.text.is_empty());
    assert_eq!(resp.usage.input_tokens, 0);
}

#[test]
fn parse_response_without_choices_is_parse_error() {
    match parse_response(r#"{"choices": []}"#) {
        Err(ProviderError::Parse(msg)) => assert!(msg.contains("choices")),
        other => panic!("expected parse error, got: {other:?}"),
    }
    assert!(matches!(parse_response("not json"), Err(ProviderError::Parse(_))));
}

#[test]
fn chat_endpoint_joins_path_with_or_without_trailing_slash() {
    let with_slash = chat_endpoint("https://api.openai.com/").expect("valid base");
    let without_slash = chat_endpoint("https://proxy.internal/openai").expect("valid base");
    assert_eq!(with_slash.as_str(), "https://api.openai.com/v1/chat/completions");
    assert_eq!(without_slash.as_str(), "https://proxy.internal/openai/v1/chat/completions");
}

#[test]
fn chat_endpoint_rejects_relative_base() {
    assert!(matches!(chat_endpoint("not a url"), Err(ProviderError::Unavailable(_))));
}

#[test]
fn provider_debug_redacts_api_key() {
    let provider = OpenAiProvider::new(
        "gpt-4o-mini".to_owned(),
        "sk-secret-value".to_owned(),
        "https://api.openai.com/",
        Duration::from_secs(5),
    )
    .expect("provider should build");
    let debug = format!("{provider:?}");
    assert!(!debug.contains("sk-secret-value"));
    assert!(debug.contains("__REDACTED__"));
    assert_eq!(provider.model_id(), "gpt-4o-mini");
    assert!(!provider.is_offline());
}
