use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chatdesk::chat::ChatInput;
use chatdesk::config::{AppConfig, RetryConfig};
use chatdesk::csv_viewer::{self, FileOutcome};
use chatdesk::offer::{self, OfferInput};
use chatdesk::providers::groq::{ChatRequestBody, ChatResponse};
use chatdesk::{
  ChatTransport
, CompletionRequest
, CompletionRequester
, CompletionResult
, Error
, Message
, RequestOptions
, RetryPolicy
, Role
};

/// Transport that replays a fixed script of outcomes
struct ScriptedTransport
{   script: Mutex<VecDeque<Result<ChatResponse, Error>>>
  , calls: AtomicUsize
  , temperatures: Mutex<Vec<Option<f32>>>
}

impl ScriptedTransport
{   fn new(script: Vec<Result<ChatResponse, Error>>) -> Self
    {   ScriptedTransport
        {   script: Mutex::new(script.into())
          , calls: AtomicUsize::new(0)
          , temperatures: Mutex::new(vec![])
        }
    }

    fn always_failing() -> Self
    {   ScriptedTransport::new(vec![])
    }

    fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }
}

impl ChatTransport for ScriptedTransport
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<ChatResponse, Error>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.temperatures.lock().unwrap().push(request.temperature());
        self.script.lock().unwrap()
          .pop_front()
          .unwrap_or_else(|| {
            Err(Error::HttpError("connection refused".to_string()))
          })
    }
}

fn reply(content: &str) -> Result<ChatResponse, Error>
{   let body = serde_json::json!({
      "id": "chatcmpl-1",
      "object": "chat.completion",
      "choices": [
        { "index": 0
        , "message": { "role": "assistant", "content": content }
        , "finish_reason": "stop"
        }
      ]
    });
    Ok(serde_json::from_value(body).unwrap())
}

fn hello_request(temperature: Option<f32>) -> CompletionRequest
{   CompletionRequest::new(
      vec![Message::user("hello")]
    , "llama3-8b-8192"
    , temperature
    ).unwrap()
}

// ===== Requester =====

#[tokio::test]
async fn test_request_returns_trimmed_text()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply(" hi there ")])
    );
    let result = requester.request(&hello_request(None)).await;
    assert_eq!(result.text(), "hi there");
    assert!(result.is_success());
    assert_eq!(requester.transport().calls(), 1);
}

#[tokio::test]
async fn test_request_makes_exactly_max_attempts_on_failure()
{   let requester = CompletionRequester::new(
      ScriptedTransport::always_failing()
    );
    let result = requester.request(&hello_request(None)).await;

    assert_eq!(result.text(), "");
    assert_eq!(requester.transport().calls(), 3);
    let message = result.failure_message().unwrap();
    assert!(message.contains("3 attempts"), "{}", message);
    assert!(message.contains("connection refused"), "{}", message);
}

#[tokio::test]
async fn test_request_respects_custom_attempt_count()
{   for max_attempts in 1..=5
    {   let requester = CompletionRequester::with_policy(
          ScriptedTransport::always_failing()
        , RetryPolicy::fixed(max_attempts)
        );
        let result = requester.request(&hello_request(None)).await;
        assert_eq!(requester.transport().calls(), max_attempts);
        match result
        {   CompletionResult::Failure { attempts, .. } => {
              assert_eq!(attempts, max_attempts)
            }
          , other => panic!("expected failure, got {:?}", other)
        }
    }
}

#[tokio::test]
async fn test_request_stops_at_first_success()
{   for k in 1..=3
    {   let mut script: Vec<_> = (1..k)
          .map(|_| Err(Error::Timeout))
          .collect();
        script.push(reply("done"));
        script.push(reply("should not be reached"));

        let requester = CompletionRequester::new(
          ScriptedTransport::new(script)
        );
        let result = requester.request(&hello_request(None)).await;
        assert_eq!(result.text(), "done");
        assert_eq!(requester.transport().calls(), k);
    }
}

#[tokio::test]
async fn test_empty_choices_are_retried()
{   let empty: ChatResponse = serde_json::from_str(
      r#"{"choices": []}"#
    ).unwrap();
    let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![Ok(empty), reply("second")])
    );
    let result = requester.request(&hello_request(None)).await;
    assert_eq!(result.text(), "second");
    assert_eq!(requester.transport().calls(), 2);
}

#[tokio::test]
async fn test_last_cause_is_reported()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![
        Err(Error::Timeout)
      , Err(Error::HttpError("reset".to_string()))
      , Err(Error::ApiError { status: 503, body: "overloaded".to_string() })
      ])
    );
    let result = requester.request(&hello_request(None)).await;
    assert_eq!(
      result
    , CompletionResult::Failure
      {   attempts: 3
        , last_cause: Error::ApiError
          {   status: 503
            , body: "overloaded".to_string()
          }
      }
    );
}

#[tokio::test]
async fn test_default_policy_retries_permanent_errors()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![
        Err(Error::ApiError { status: 400, body: "bad".to_string() })
      ])
    );
    let _ = requester.request(&hello_request(None)).await;
    assert_eq!(requester.transport().calls(), 3);
}

#[tokio::test]
async fn test_stop_on_permanent_policy_gives_up_early()
{   let requester = CompletionRequester::with_policy(
      ScriptedTransport::new(vec![
        Err(Error::ApiError { status: 401, body: "bad key".to_string() })
      ])
    , RetryPolicy::fixed(3).with_stop_on_permanent(true)
    );
    let result = requester.request(&hello_request(None)).await;
    assert_eq!(requester.transport().calls(), 1);
    assert!(result.failure_message().unwrap().contains("1 attempt:"));
}

#[tokio::test]
async fn test_temperature_passed_through_unchanged()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply("a"), reply("b")])
    );
    let _ = requester.request(&hello_request(Some(0.25))).await;
    let _ = requester.request(&hello_request(None)).await;
    let seen = requester.transport().temperatures.lock().unwrap().clone();
    assert_eq!(seen, vec![Some(0.25), None]);
}

#[tokio::test]
async fn test_request_with_rejects_empty_messages_without_calling()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply("unused")])
    );
    let result = requester
      .request_with(vec![], &RequestOptions::new("llama3-8b-8192"))
      .await;
    assert!(!result.is_success());
    assert_eq!(requester.transport().calls(), 0);
}

#[tokio::test]
async fn test_blank_reply_counts_as_no_response()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply("   ")])
    );
    let result = requester.request(&hello_request(None)).await;
    assert!(result.is_success());
    assert_eq!(result.reply(), None);
    assert_eq!(result.failure_message(), None);
}

#[test]
fn test_reply_only_for_non_empty_success()
{   let ok = CompletionResult::Success { text: "hi".to_string() };
    assert_eq!(ok.reply(), Some("hi"));
    let blank = CompletionResult::Success { text: String::new() };
    assert_eq!(blank.reply(), None);
    let failed = CompletionResult::Failure
    {   attempts: 3
      , last_cause: Error::Timeout
    };
    assert_eq!(failed.reply(), None);
}

#[test]
fn test_request_with_falls_back_to_requester_policy()
{   let requester = CompletionRequester::with_policy(
      ScriptedTransport::always_failing()
    , RetryPolicy::fixed(5)
    );
    let input = ChatInput
    {   prompt: "question".to_string()
      , ..ChatInput::default()
    };
    let options = RequestOptions::new("llama3-8b-8192");
    let result = tokio_test::block_on(
      chatdesk::chat::run_chat(&requester, &input, &options)
    ).unwrap();
    assert_eq!(requester.transport().calls(), 5);
    assert!(result.failure_message().unwrap().contains("5 attempts"));
}

#[test]
fn test_request_options_policy_overrides_requester()
{   let requester = CompletionRequester::with_policy(
      ScriptedTransport::always_failing()
    , RetryPolicy::fixed(5)
    );
    let options = RequestOptions::new("llama3-8b-8192")
      .with_retry(RetryPolicy::fixed(2));
    let _ = tokio_test::block_on(
      requester.request_with(vec![Message::user("hello")], &options)
    );
    assert_eq!(requester.transport().calls(), 2);
}

// ===== Request types and wire format =====

#[test]
fn test_request_rejects_misplaced_system_message()
{   let result = CompletionRequest::new(
      vec![Message::user("hi"), Message::system("late")]
    , "llama3-8b-8192"
    , None
    );
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_wire_body_omits_missing_temperature()
{   let request = hello_request(None);
    let body = serde_json::to_value(ChatRequestBody::from(&request)).unwrap();
    assert!(body.get("temperature").is_none());
    assert_eq!(body["model"], "llama3-8b-8192");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hello");
}

#[test]
fn test_wire_body_includes_temperature()
{   let request = hello_request(Some(0.25));
    let body = serde_json::to_value(ChatRequestBody::from(&request)).unwrap();
    assert_eq!(body["temperature"].as_f64(), Some(0.25));
}

#[test]
fn test_response_ignores_extra_fields()
{   let text = r#"{
      "id": "x",
      "usage": {"total_tokens": 3},
      "choices": [{"message": {"role": "assistant", "content": " ok "}}]
    }"#;
    let response: ChatResponse = serde_json::from_str(text).unwrap();
    assert_eq!(response.first_content().unwrap(), " ok ");
}

// ===== Retry policy =====

#[test]
fn test_default_policy_has_no_delay()
{   let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    for attempt in 1..=3
    {   assert!(policy.backoff_for_attempt(attempt).is_zero());
    }
}

#[test]
fn test_backoff_grows_by_multiplier()
{   let policy = RetryPolicy::new(4, 2.0, 100);
    assert_eq!(policy.backoff_for_attempt(1).as_millis(), 100);
    assert_eq!(policy.backoff_for_attempt(2).as_millis(), 200);
    assert_eq!(policy.backoff_for_attempt(3).as_millis(), 400);
}

#[test]
fn test_policy_from_retry_config()
{   let config = RetryConfig
    {   max_attempts: 5
      , backoff_multiplier: 1.5
      , initial_backoff_ms: 10
      , stop_on_permanent: true
    };
    let policy = RetryPolicy::from(&config);
    assert_eq!(policy.max_attempts, 5);
    assert!(policy.stop_on_permanent);
}

// ===== Chat =====

#[test]
fn test_chat_requires_prompt_or_file()
{   let input = ChatInput
    {   system_prompt: "be brief".to_string()
      , ..ChatInput::default()
    };
    assert!(matches!(
      input.build_messages()
    , Err(Error::InvalidRequest(_))
    ));
}

#[test]
fn test_chat_omits_blank_system_prompt()
{   let input = ChatInput
    {   prompt: "summarize".to_string()
      , file_content: "report text".to_string()
      , ..ChatInput::default()
    };
    let messages = input.build_messages().unwrap();
    assert_eq!(messages, vec![Message::user("report text\nsummarize")]);
}

#[test]
fn test_chat_puts_system_prompt_first()
{   let input = ChatInput
    {   system_prompt: "be brief".to_string()
      , prompt: "hello".to_string()
      , file_content: String::new()
    };
    let messages = input.build_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content, "\nhello");
}

#[tokio::test]
async fn test_run_chat_sends_through_requester()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply(" answer ")])
    );
    let input = ChatInput
    {   prompt: "question".to_string()
      , ..ChatInput::default()
    };
    let options = RequestOptions::new("llama3-8b-8192");
    let result = chatdesk::chat::run_chat(&requester, &input, &options)
      .await
      .unwrap();
    assert_eq!(result.text(), "answer");
}

// ===== Documents =====

#[test]
fn test_read_text_document()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "line one\nline two").unwrap();
    let text = chatdesk::documents::read_document(&path).unwrap();
    assert_eq!(text, "line one\nline two");
}

#[test]
fn test_read_document_rejects_unknown_extension()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    std::fs::write(&path, [0u8, 1, 2]).unwrap();
    assert!(matches!(
      chatdesk::documents::read_document(&path)
    , Err(Error::Document(_))
    ));
}

#[test]
fn test_text_document_must_be_utf8()
{   let result = chatdesk::documents::decode_document(
      &[0xff, 0xfe, 0x41]
    , chatdesk::documents::DocumentKind::PlainText
    );
    assert!(matches!(result, Err(Error::Document(_))));
}

// ===== Offer evaluator =====

#[test]
fn test_rubric_weights_sum_to_100()
{   let total: u32 = offer::RUBRIC.iter().map(|c| c.weight as u32).sum();
    assert_eq!(total, 100);
}

#[test]
fn test_weighted_score()
{   let mut input = OfferInput::new("Managed backups for small offices");
    assert!((input.weighted_score() - 5.0).abs() < 1e-6);

    for c in offer::RUBRIC.iter()
    {   input.set_score(c.key, 10).unwrap();
    }
    assert!((input.weighted_score() - 10.0).abs() < 1e-6);

    input.set_score("value_proposition", 6).unwrap();
    // 25 * 6 + 75 * 10 = 900
    assert!((input.weighted_score() - 9.0).abs() < 1e-6);
}

#[test]
fn test_score_validation()
{   let mut input = OfferInput::new("offer");
    assert!(input.set_score("pricing", 0).is_err());
    assert!(input.set_score("pricing", 11).is_err());
    assert!(input.set_score("nonsense", 5).is_err());
    assert!(input.apply_score_arg("pricing").is_err());
    assert!(input.apply_score_arg("pricing=high").is_err());
    input.apply_score_arg("pricing = 8").unwrap();
    assert_eq!(input.score("pricing"), Some(8));
}

#[test]
fn test_temperature_clamped_like_slider()
{   let mut input = OfferInput::new("offer");
    assert_eq!(input.temperature(), offer::DEFAULT_TEMPERATURE);
    input.set_temperature(1.7);
    assert_eq!(input.temperature(), 1.0);
    input.set_temperature(-0.2);
    assert_eq!(input.temperature(), 0.0);
}

#[test]
fn test_render_prompt_lists_rubric()
{   let mut input = OfferInput::new("  Annual support contract  ");
    input.set_score("market_demand", 9).unwrap();
    input.notes = Some("Client is a repeat customer".to_string());
    let messages = input.render_prompt().unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    let prompt = &messages[1].content;
    assert!(prompt.contains("Offer:\nAnnual support contract\n"));
    assert!(prompt.contains("2. Market demand (weight 20%): 9/10."));
    assert!(prompt.contains("Weighted overall score: 5.8/10"));
    assert!(prompt.contains("Client is a repeat customer"));
    assert!(prompt.contains("Recommendations"));
}

#[test]
fn test_render_prompt_requires_description()
{   let input = OfferInput::new("   ");
    assert!(input.render_prompt().is_err());
}

#[tokio::test]
async fn test_evaluate_uses_offer_temperature()
{   let requester = CompletionRequester::new(
      ScriptedTransport::new(vec![reply("Verdict: accept")])
    );
    let mut input = OfferInput::new("Consulting retainer");
    input.set_temperature(0.2);
    let options = RequestOptions::new("llama3-8b-8192");

    let evaluation = offer::evaluate(&requester, &input, &options)
      .await
      .unwrap();
    assert_eq!(evaluation.result.text(), "Verdict: accept");
    assert!((evaluation.weighted_score - 5.0).abs() < 1e-6);
    let seen = requester.transport().temperatures.lock().unwrap().clone();
    assert_eq!(seen, vec![Some(0.2)]);
}

#[tokio::test]
async fn test_evaluate_reports_exhausted_retries()
{   let requester = CompletionRequester::new(
      ScriptedTransport::always_failing()
    );
    let input = OfferInput::new("Consulting retainer");
    let options = RequestOptions::new("llama3-8b-8192");
    let evaluation = offer::evaluate(&requester, &input, &options)
      .await
      .unwrap();
    assert_eq!(evaluation.result.text(), "");
    assert_eq!(requester.transport().calls(), 3);
}

// ===== CSV viewer =====

#[test]
fn test_csv_list_has_ten_files()
{   assert_eq!(csv_viewer::CSV_FILES.len(), 10);
}

#[test]
fn test_missing_csv_is_skipped_others_render()
{   let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("a.csv")
    , "name,qty\nwidget,3\n"
    ).unwrap();
    std::fs::write(
      dir.path().join("c.csv")
    , "id\n1\n2\n"
    ).unwrap();

    let loaded = csv_viewer::load_files(
      dir.path()
    , &["a.csv", "missing.csv", "c.csv"]
    );
    assert_eq!(loaded.len(), 3);
    assert!(matches!(loaded[0].outcome, FileOutcome::Loaded(_)));
    assert!(matches!(loaded[1].outcome, FileOutcome::Failed(Error::Csv(_))));
    match &loaded[2].outcome
    {   FileOutcome::Loaded(table) => assert_eq!(table.rows.len(), 2)
      , other => panic!("expected table, got {:?}", other)
    }
}

#[test]
fn test_csv_decodes_windows_1252()
{   // "café" with é as 0xE9
    let bytes = b"item,price\ncaf\xe9,2\n";
    let table = csv_viewer::parse_table(bytes).unwrap();
    assert_eq!(table.headers, vec!["item", "price"]);
    assert_eq!(table.rows[0][0], "café");
}

#[test]
fn test_csv_leading_bom_bytes_stay_windows_1252()
{   let table = csv_viewer::parse_table(b"\xff\xfeA,B\n1,2\n").unwrap();
    assert_eq!(table.headers, vec!["\u{ff}\u{fe}A", "B"]);
    assert_eq!(table.rows, vec![vec!["1".to_string(), "2".to_string()]]);

    let table = csv_viewer::parse_table(b"\xef\xbb\xbfid\n7\n").unwrap();
    assert_eq!(table.headers, vec!["\u{ef}\u{bb}\u{bf}id"]);
}

#[test]
fn test_csv_empty_file_fails()
{   assert!(csv_viewer::parse_table(b"").is_err());
}

#[test]
fn test_table_render_aligns_columns()
{   let table = csv_viewer::parse_table(
      b"name,qty\nwidget,3\nbolt,12\n"
    ).unwrap();
    let rendered = table.render(None);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "name   | qty");
    assert_eq!(lines[1], "-------+----");
    assert_eq!(lines[2], "widget | 3");
    assert_eq!(lines[3], "bolt   | 12");
}

#[test]
fn test_table_render_truncates_rows()
{   let table = csv_viewer::parse_table(b"n\n1\n2\n3\n").unwrap();
    let rendered = table.render(Some(1));
    assert!(rendered.contains("... 2 more row(s)"));
    assert!(!rendered.contains("\n3\n"));
}

// ===== Config =====

#[test]
fn test_api_key_required()
{   let missing = chatdesk::config::api_key_from(|_| None);
    assert_eq!(missing, Err(Error::MissingApiKey("GROQ_API_KEY".to_string())));
    let blank = chatdesk::config::api_key_from(|_| Some("  ".to_string()));
    assert!(blank.is_err());
    let present = chatdesk::config::api_key_from(|_| Some("gsk_x".to_string()));
    assert_eq!(present.unwrap(), "gsk_x");
}

#[test]
fn test_env_overrides_config()
{   let mut config = AppConfig::default();
    config.apply_env(|key| match key
    {   "CHATDESK_MODEL" => Some("mixtral-8x7b-32768".to_string())
      , "CHATDESK_CSV_DIR" => Some("/srv/csv".to_string())
      , _ => None
    });
    assert_eq!(config.model, "mixtral-8x7b-32768");
    assert_eq!(config.csv_dir, std::path::PathBuf::from("/srv/csv"));
    assert_eq!(config.api_base, chatdesk::config::DEFAULT_API_BASE);
}

#[test]
fn test_partial_config_file_uses_defaults()
{   let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.json");
    std::fs::write(&path, r#"{"timeout_secs": 5, "retry": {"max_attempts": 4}}"#).unwrap();
    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config.timeout_secs, 5);
    assert_eq!(config.retry.max_attempts, 4);
    assert_eq!(config.retry.initial_backoff_ms, 0);
    assert_eq!(config.model, chatdesk::config::DEFAULT_MODEL);
}

#[test]
fn test_zero_attempts_config_is_invalid()
{   let mut config = AppConfig::default();
    config.retry.max_attempts = 0;
    assert!(matches!(
      config.validate()
    , Err(Error::InvalidConfiguration(_))
    ));
}

// ===== Live API =====

#[tokio::test]
#[ignore]
async fn test_groq_send_prompt()
{   let api_key = match chatdesk::config::api_key_from_env()
    {   Ok(key) => key
      , Err(_) => {
          println!("Skipping: GROQ_API_KEY not set");
          return;
        }
    };
    let config = AppConfig::default();
    let client = chatdesk::GroqClient::from_config(api_key, &config).unwrap();
    let requester = CompletionRequester::new(client);
    let result = requester.request(&hello_request(Some(0.0))).await;
    match result.failure_message()
    {   None => {
          println!("Response: {}", result.text());
          assert!(!result.text().is_empty());
        }
      , Some(message) => println!("API Error: {}", message)
    }
}

#[tokio::test]
#[ignore]
async fn test_groq_list_models()
{   let api_key = match chatdesk::config::api_key_from_env()
    {   Ok(key) => key
      , Err(_) => {
          println!("Skipping: GROQ_API_KEY not set");
          return;
        }
    };
    let client = chatdesk::GroqClient::from_config(
      api_key
    , &AppConfig::default()
    ).unwrap();
    match client.list_models().await
    {   Ok(models) => {
          println!("Retrieved {} models", models.len());
          assert!(!models.is_empty());
        }
      , Err(e) => println!("Error fetching models: {}", e)
    }
}
