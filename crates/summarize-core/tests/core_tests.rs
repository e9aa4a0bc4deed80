use summarize_core::*;

#[test]
fn message_text_constructor() {
    let msg = Message::text(Role::User, "hello");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.text_content(), "hello");
}

#[test]
fn message_text_joins_blocks() {
    let mut msg = Message::text(Role::Assistant, "Hello ");
    msg.content.push(MessageContent::Text { text: "world".to_string() });
    assert_eq!(msg.text_content(), "Hello \nworld");
}

#[test]
fn message_serde_roundtrip() {
    let msg = Message::text(Role::User, "test message");
    let json = serde_json::to_string(&msg).unwrap();
    let restored: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.role, Role::User);
    assert_eq!(restored.text_content(), "test message");
}

#[test]
fn message_content_variants_serde() {
    let blocks = vec![
        MessageContent::Text { text: "hello".into() },
        MessageContent::Image { media_type: "image/png".into(), data: "base64data".into() },
        MessageContent::File { path: "/tmp/test.txt".into(), media_type: Some("text/plain".into()) },
    ];
    for block in blocks {
        let json = serde_json::to_string(&block).unwrap();
        let _restored: MessageContent = serde_json::from_str(&json).unwrap();
    }
}

#[test]
fn input_target_parses_http() {
    let t = InputTarget::parse("https://example.com/a").unwrap();
    assert!(matches!(t, InputTarget::Url { payload } if payload == "https://example.com/a"));
}

#[test]
fn input_target_rescans_embedded_https_last_occurrence() {
    let raw = "weird-scheme://redirect?u=https://example.com/first&again=https://example.com/second";
    let t = InputTarget::parse(raw).unwrap();
    match t {
        InputTarget::Url { payload } => assert_eq!(payload, "https://example.com/second"),
        _ => panic!("expected Url"),
    }
}

#[test]
fn input_target_rejects_unknown_scheme_without_embedded_http() {
    let err = InputTarget::parse("ftp://example.com/file").unwrap_err();
    assert!(matches!(err, Error::InputValidation(_)));
}

#[test]
fn url_kind_classifies_asset_extension() {
    assert_eq!(UrlKind::classify("https://cdn.example.com/video.mp4"), UrlKind::Asset);
    assert_eq!(UrlKind::classify("https://example.com/article"), UrlKind::Website);
}

#[test]
fn extracted_content_normalizes_whitespace() {
    let c = ExtractedContent {
        url: "https://a/".into(),
        title: "t".into(),
        description: None,
        site_name: None,
        content: "hello   \n\n world  ".into(),
        truncated: false,
        total_characters: 0,
        word_count: 0,
        transcript: None,
        video: None,
        is_video_only: false,
        diagnostics: vec![],
    };
    assert_eq!(c.normalized_content(), "hello world");
}

#[test]
fn error_display_messages() {
    let err = Error::RateLimited { retry_after_secs: 30 };
    assert!(err.to_string().contains("30"));

    let err = Error::InputTooLarge { model: "anthropic/claude".into(), estimated: 200_000, cap: 128_000 };
    assert!(err.to_string().contains("200000"));
    assert!(err.to_string().contains("128000"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(err.to_string().contains("file not found"));
}

#[test]
fn error_retryable_and_terminal_classification() {
    assert!(Error::RateLimited { retry_after_secs: 1 }.is_retryable());
    assert!(!Error::Extraction("boilerplate".into()).is_terminal());
    assert!(Error::EmptySummary.is_terminal());
}

#[test]
fn runtime_context_reads_injected_env_not_process_globals() {
    let mut env = std::collections::HashMap::new();
    env.insert("SUMMARIZE_MODEL".to_string(), "openai/gpt-5".to_string());
    let ctx = RuntimeContext::with_env(env);
    assert_eq!(ctx.get("SUMMARIZE_MODEL"), Some("openai/gpt-5"));
    assert_eq!(ctx.get("NOT_SET"), None);
}
