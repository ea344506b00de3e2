//! Streaming call behaviour: framing, sink delivery, accumulation, and the
//! no-retry-after-output rule.

mod common;

use common::*;
use genai_engine::{Content, FinishReason, GenerateContentRequest, PayloadBuilder};
use serde_json::json;

fn request() -> GenerateContentRequest {
    PayloadBuilder::new(vec![Content::user_text("Say hello")]).build()
}

async fn collect_stream(
    client: &genai_engine::Client,
) -> (genai_engine::GenerationResult, Vec<String>) {
    let mut fragments = Vec::new();
    let result = client
        .stream_generate_content("gemini-2.5-flash", &request(), |text| {
            fragments.push(text.to_string());
        })
        .await;
    (result, fragments)
}

#[tokio::test(start_paused = true)]
async fn test_fragments_delivered_in_order_and_accumulated() {
    let transport = MockTransport::new(vec![Reply::stream(vec![
        Chunk::text(&text_frame("Hel")),
        Chunk::text(&text_frame("lo")),
        Chunk::text(&final_frame(4, 2)),
    ])]);
    let client = mock_client(transport.clone());

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["Hel", "lo"]);
    assert!(result.is_success(), "{}", result.error_message());
    assert_eq!(result.text(), "Hello");
    assert_eq!(result.content().parts.len(), 1);
    assert_eq!(*result.finish_reason(), FinishReason::Stop);
    assert_eq!(result.input_tokens(), 4);
    assert_eq!(result.output_tokens(), 2);
    assert_eq!(result.total_tokens(), 6);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_streaming_url_requests_sse() {
    let transport = MockTransport::new(vec![Reply::stream(vec![])]);
    let client = mock_client(transport.clone());

    collect_stream(&client).await;

    assert_eq!(
        transport.calls()[0].url,
        "http://mock.local/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
    );
}

#[tokio::test(start_paused = true)]
async fn test_frames_split_across_chunks() {
    let body = format!("{}{}", text_frame("one "), text_frame("two"));
    let bytes = body.as_bytes();
    let chunks = bytes
        .chunks(7)
        .map(|c| Chunk::Bytes(c.to_vec()))
        .collect();
    let transport = MockTransport::new(vec![Reply::stream(chunks)]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["one ", "two"]);
    assert_eq!(result.text(), "one two");
}

#[tokio::test(start_paused = true)]
async fn test_crlf_terminated_frames() {
    let body = format!(
        "{}{}",
        text_frame("a").replace("\n\n", "\r\n\r\n"),
        text_frame("b").replace("\n\n", "\r\n\r\n")
    );
    let transport = MockTransport::new(vec![Reply::stream(vec![Chunk::text(&body)])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["a", "b"]);
    assert_eq!(result.text(), "ab");
}

#[tokio::test(start_paused = true)]
async fn test_noise_past_ceiling_is_discarded_without_output() {
    let noise = "x".repeat(70 * 1024);
    let transport = MockTransport::new(vec![Reply::stream(vec![
        Chunk::text(&noise),
        Chunk::text(&noise),
    ])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert!(fragments.is_empty());
    assert!(result.is_success());
    assert!(result.content().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_valid_frame_after_noise_still_decodes() {
    let noise = ": comment\n".repeat(8 * 1024);
    let transport = MockTransport::new(vec![Reply::stream(vec![
        Chunk::text(&noise),
        Chunk::text(&text_frame("survived")),
    ])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["survived"]);
    assert_eq!(result.text(), "survived");
}

#[tokio::test(start_paused = true)]
async fn test_zero_frames_is_empty_success() {
    let transport = MockTransport::new(vec![Reply::stream(vec![])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert!(fragments.is_empty());
    assert!(result.is_success());
    assert_eq!(result.status_code(), 200);
    assert!(result.content().is_empty());
    assert_eq!(result.total_tokens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_skipped() {
    let transport = MockTransport::new(vec![Reply::stream(vec![
        Chunk::text(&text_frame("before ")),
        Chunk::text("data: {not json at all\n\n"),
        Chunk::text(&text_frame("after")),
    ])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["before ", "after"]);
    assert!(result.is_success());
    assert_eq!(result.text(), "before after");
}

#[tokio::test(start_paused = true)]
async fn test_trailing_frame_without_terminator_is_flushed() {
    let last = text_frame("end");
    let transport = MockTransport::new(vec![Reply::stream(vec![
        Chunk::text(&text_frame("the ")),
        Chunk::text(last.trim_end()),
    ])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["the ", "end"]);
    assert_eq!(result.text(), "the end");
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_output_is_not_retried() {
    let transport = MockTransport::new(vec![
        Reply::stream(vec![
            Chunk::text(&text_frame("partial")),
            Chunk::Error("connection reset by peer".to_string()),
        ]),
        Reply::stream(vec![Chunk::text(&text_frame("should not be requested"))]),
    ]);
    let client = mock_client(transport.clone());

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["partial"]);
    assert!(!result.is_success());
    assert!(result.error_message().contains("Stream interrupted after partial output"));
    assert!(result.error_message().contains("connection reset by peer"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_before_output_is_retried() {
    let transport = MockTransport::new(vec![
        Reply::stream(vec![Chunk::Error("connection reset".to_string())]),
        Reply::Stream {
            status: 503,
            retry_after: None,
            chunks: vec![Chunk::text(&error_body(503, "overloaded", "UNAVAILABLE"))],
        },
        Reply::stream(vec![Chunk::text(&text_frame("ok"))]),
    ]);
    let client = mock_client(transport.clone());

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["ok"]);
    assert!(result.is_success());
    assert_eq!(result.text(), "ok");
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_stream_status() {
    let transport = MockTransport::new(vec![
        Reply::status(403, error_body(403, "API key not valid", "PERMISSION_DENIED")),
        Reply::stream(vec![Chunk::text(&text_frame("never"))]),
    ]);
    let client = mock_client(transport.clone());

    let (result, fragments) = collect_stream(&client).await;

    assert!(fragments.is_empty());
    assert!(!result.is_success());
    assert_eq!(result.status_code(), 403);
    assert!(result.error_message().contains("API key not valid"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_in_band_error_frame_before_output_is_retried() {
    let transport = MockTransport::new(vec![
        Reply::stream(vec![Chunk::text(&format!(
            "data: {}\n\n",
            error_body(503, "overloaded", "UNAVAILABLE")
        ))]),
        Reply::stream(vec![Chunk::text(&text_frame("second try"))]),
    ]);
    let client = mock_client(transport.clone());

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["second try"]);
    assert!(result.is_success());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_thought_parts_are_not_forwarded() {
    let frame = json!({
        "candidates": [{"content": {"role": "model", "parts": [
            {"text": "Let me think...", "thought": true},
            {"text": "Answer"},
        ]}}],
    });
    let transport = MockTransport::new(vec![Reply::stream(vec![Chunk::text(&format!(
        "data: {frame}\n\n"
    ))])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert_eq!(fragments, vec!["Answer"]);
    assert_eq!(result.text(), "Answer");
}

#[tokio::test(start_paused = true)]
async fn test_blocked_prompt_in_stream() {
    let frame = json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}});
    let transport = MockTransport::new(vec![Reply::stream(vec![Chunk::text(&format!(
        "data: {frame}\n\n"
    ))])]);
    let client = mock_client(transport);

    let (result, fragments) = collect_stream(&client).await;

    assert!(fragments.is_empty());
    assert!(!result.is_success());
    assert_eq!(*result.finish_reason(), FinishReason::PromptBlocked);
    assert!(result.error_message().contains("PROHIBITED_CONTENT"));
}

#[tokio::test(start_paused = true)]
async fn test_stream_text_convenience() {
    let transport = MockTransport::new(vec![Reply::stream(vec![Chunk::text(&text_frame("hi!"))])]);
    let client = mock_client(transport.clone());

    let mut out = String::new();
    let result = client
        .stream_text("gemini-2.5-flash", "greet me", |t| out.push_str(t))
        .await;

    assert!(result.is_success());
    assert_eq!(out, "hi!");
    assert_eq!(
        transport.calls()[0].body["contents"][0]["parts"][0]["text"],
        "greet me"
    );
}
