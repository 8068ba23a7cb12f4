//! 主循环集成测试：Mock LLM + 内存回退日历，覆盖文本回复、多次派发、错误数据回写与失败边界

use std::sync::Arc;

use calchat::agent::{create_agent_components_with, process_chat, run_chat, AgentComponents};
use calchat::calendar::InMemoryBookingStore;
use calchat::config::AppConfig;
use calchat::llm::{FunctionCallRequest, LlmError, ModelReply, ScriptedLlmClient};
use calchat::memory::{Message, Role};
use serde_json::{json, Value};

const EMAIL: &str = "ada@example.com";

/// 强制使用回退日历（忽略环境中的 CALCOM_API_KEY）
fn offline_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.calendar.api_key = Some("cal_test_offline".into());
    cfg
}

struct Harness {
    llm: Arc<ScriptedLlmClient>,
    store: Arc<InMemoryBookingStore>,
    components: AgentComponents,
}

fn harness_with(cfg: &AppConfig, llm: ScriptedLlmClient) -> Harness {
    let llm = Arc::new(llm);
    let store = Arc::new(InMemoryBookingStore::new());
    let components = create_agent_components_with(cfg, llm.clone(), store.clone()).unwrap();
    Harness {
        llm,
        store,
        components,
    }
}

fn harness(replies: Vec<ModelReply>) -> Harness {
    harness_with(&offline_config(), ScriptedLlmClient::new(replies))
}

fn function_results(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| m.is_function_result())
        .map(|m| serde_json::from_str(&m.content).unwrap())
        .collect()
}

#[tokio::test]
async fn test_plain_text_reply_needs_one_model_call() {
    let h = harness(vec![ModelReply::text("Hi! How can I help with your calendar?")]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("hello")])
        .await
        .unwrap();

    assert_eq!(result.response, "Hi! How can I help with your calendar?");
    assert_eq!(result.model_calls, 1);
    assert_eq!(result.dispatches, 0);
    assert_eq!(h.llm.call_count(), 1);
}

#[tokio::test]
async fn test_first_message_is_system_instruction_with_identity() {
    let h = harness(vec![ModelReply::text("ok")]);
    run_chat(&h.components, EMAIL, vec![Message::user("hello")])
        .await
        .unwrap();

    let req = &h.llm.requests()[0];
    assert_eq!(req.messages[0].role, Role::System);
    assert!(req.messages[0].content.contains(EMAIL));
    assert_eq!(req.messages[1].content, "hello");
    assert_eq!(
        req.operation_names,
        vec![
            "get_available_slots",
            "book_event",
            "list_events",
            "cancel_event",
            "reschedule_event"
        ]
    );
}

#[tokio::test]
async fn test_availability_for_a_weekday() {
    let h = harness(vec![
        ModelReply::call("get_available_slots", json!({"date": "2024-06-10"})),
        ModelReply::text("You have plenty of free time on June 10."),
    ]);
    let result = run_chat(
        &h.components,
        EMAIL,
        vec![Message::user("What times are free on 2024-06-10?")],
    )
    .await
    .unwrap();

    assert_eq!(result.dispatches, 1);
    assert_eq!(result.model_calls, 2);
    let results = function_results(&result.messages);
    let slots = results[0].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert!(slots.iter().all(|s| s["available"] == true));
    assert_eq!(result.response, "You have plenty of free time on June 10.");
}

#[tokio::test]
async fn test_each_call_is_dispatched_and_fed_back_in_order() {
    let h = harness(vec![
        ModelReply::call("get_available_slots", json!({"date": "2024-06-10"})),
        ModelReply::call(
            "book_event",
            json!({"email": EMAIL, "date": "2024-06-10", "time": "10:00", "reason": "Sync"}),
        ),
        ModelReply::call("list_events", json!({"email": EMAIL})),
        ModelReply::text("Booked your sync at 10:00."),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("book 10am")])
        .await
        .unwrap();

    assert_eq!(result.dispatches, 3);
    assert_eq!(result.model_calls, 4);
    assert_eq!(h.store.len().await, 1);

    let names: Vec<_> = result
        .messages
        .iter()
        .filter(|m| m.is_function_result())
        .filter_map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["get_available_slots", "book_event", "list_events"]);

    let results = function_results(&result.messages);
    let booked = &results[1];
    assert!(booked["id"].as_str().unwrap().starts_with("mock-"));
    assert_eq!(booked["start"], "2024-06-10T10:00:00");
    let listed = results[2].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], booked["id"]);
    assert_eq!(listed[0]["start"], booked["start"]);
    assert_eq!(listed[0]["end"], booked["end"]);
    assert_eq!(booked["end"], "2024-06-10T10:30:00");

    // 每次模型调用都能看到此前全部的调用与结果
    let last = h.llm.requests().pop().unwrap();
    assert_eq!(
        last.messages.iter().filter(|m| m.is_function_result()).count(),
        3
    );
}

#[tokio::test]
async fn test_slot_lookup_is_idempotent() {
    let h = harness(vec![
        ModelReply::call("get_available_slots", json!({"date": "2024-06-11"})),
        ModelReply::call("get_available_slots", json!({"date": "2024-06-11"})),
        ModelReply::text("done"),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("slots?")])
        .await
        .unwrap();

    let results = function_results(&result.messages);
    assert_eq!(results[0], results[1]);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_cancel_unknown_id_reports_not_found_and_keeps_store() {
    let h = harness(vec![
        ModelReply::call(
            "book_event",
            json!({"email": EMAIL, "date": "2024-06-12", "time": "14:00", "reason": "Review"}),
        ),
        ModelReply::call("cancel_event", json!({"event_id": "mock-does-not-exist"})),
        ModelReply::text("I couldn't find that booking."),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("cancel it")])
        .await
        .unwrap();

    let results = function_results(&result.messages);
    assert_eq!(results[1]["not_found"], true);
    assert_eq!(results[1]["event_id"], "mock-does-not-exist");
    assert_eq!(h.store.len().await, 1);
    assert_eq!(result.response, "I couldn't find that booking.");
}

#[tokio::test]
async fn test_operation_error_is_data_and_loop_continues() {
    let h = harness(vec![
        ModelReply::call(
            "book_event",
            json!({"email": EMAIL, "date": "2024-06-10", "time": "25:99", "reason": "Late"}),
        ),
        ModelReply::text("That time doesn't exist, pick another."),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("book 25:99")])
        .await
        .unwrap();

    let results = function_results(&result.messages);
    assert!(results[0].get("error").is_some());
    assert_eq!(result.dispatches, 1);
    assert_eq!(result.model_calls, 2);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_invalid_arguments_are_fed_back_to_the_model() {
    let h = harness(vec![
        ModelReply::call("book_event", json!({"email": EMAIL, "date": "2024-06-10"})),
        ModelReply::text("What time and reason?"),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("book")])
        .await
        .unwrap();

    let results = function_results(&result.messages);
    let err = results[0]["error"].as_str().unwrap();
    assert!(err.starts_with("Invalid arguments for book_event"));
    assert!(h.store.is_empty().await);
    assert_eq!(result.response, "What time and reason?");
}

#[tokio::test]
async fn test_conflicting_booking_is_rejected() {
    let args = json!({"email": EMAIL, "date": "2024-06-10", "time": "09:00", "reason": "Standup"});
    let h = harness(vec![
        ModelReply::call("book_event", args.clone()),
        ModelReply::call("book_event", args),
        ModelReply::text("That slot is taken."),
    ]);
    let result = run_chat(&h.components, EMAIL, vec![Message::user("book twice")])
        .await
        .unwrap();

    let results = function_results(&result.messages);
    assert!(results[0].get("id").is_some());
    assert_eq!(results[1]["error"], "Slot already booked");
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_unknown_operation_becomes_error_text() {
    let h = harness(vec![ModelReply::call("delete_all_events", json!({}))]);
    let reply = process_chat(&h.components, EMAIL, vec![Message::user("wipe it")]).await;

    assert!(reply.response.starts_with("An error occurred:"));
    assert!(reply.response.contains("delete_all_events"));
    assert_eq!(h.llm.call_count(), 1);
}

#[tokio::test]
async fn test_unparseable_arguments_become_error_text() {
    let h = harness(vec![ModelReply::Call(FunctionCallRequest {
        id: None,
        name: "list_events".into(),
        arguments: "{email: nope".into(),
    })]);
    let reply = process_chat(&h.components, EMAIL, vec![Message::user("list")]).await;

    assert!(reply.response.starts_with("An error occurred: JSON parse error"));
}

#[tokio::test]
async fn test_llm_failure_becomes_error_text() {
    let h = harness_with(
        &offline_config(),
        ScriptedLlmClient::new(Vec::<ModelReply>::new()).then_fail(LlmError::Api("rate limited".into())),
    );
    let reply = process_chat(&h.components, EMAIL, vec![Message::user("hello")]).await;

    assert_eq!(
        reply.response,
        "An error occurred: LLM error: API error: rate limited"
    );
}

#[tokio::test]
async fn test_call_limit_stops_a_looping_model() {
    let mut cfg = offline_config();
    cfg.agent.max_steps = 2;
    let replies = (0..5)
        .map(|_| ModelReply::call("list_events", json!({"email": EMAIL})))
        .collect::<Vec<_>>();
    let h = harness_with(&cfg, ScriptedLlmClient::new(replies));

    let reply = process_chat(&h.components, EMAIL, vec![Message::user("loop")]).await;

    assert!(reply.response.starts_with("An error occurred:"));
    assert!(reply.response.contains("maximum of 2"));
    assert_eq!(h.llm.call_count(), 3);
}

#[tokio::test]
async fn test_history_from_caller_is_preserved() {
    let h = harness(vec![ModelReply::text("Sure.")]);
    let history = vec![
        Message::user("I want to meet Tuesday"),
        Message::assistant("Which time?"),
        Message::user("10:00"),
    ];
    run_chat(&h.components, EMAIL, history).await.unwrap();

    let sent = &h.llm.requests()[0].messages;
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[2].role, Role::Assistant);
    assert_eq!(sent[3].content, "10:00");
}
