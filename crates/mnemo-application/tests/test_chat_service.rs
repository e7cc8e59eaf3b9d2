use mnemo_application::ChatService;
use mnemo_core::agent::testing::ScriptedAgent;
use mnemo_core::context::ContextStrategy;
use mnemo_core::session::{SessionStore, Turn, TurnRole};
use mnemo_core::storage::{InMemoryKeyValueStore, KeyValueStore};
use mnemo_core::{MnemoError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
struct SwitchableKeyValueStore {
    inner: InMemoryKeyValueStore,
    failing: AtomicBool,
}

impl SwitchableKeyValueStore {
    fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl KeyValueStore for SwitchableKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MnemoError::io("disk full"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

fn service() -> (ChatService, Arc<ScriptedAgent>) {
    let agent = Arc::new(ScriptedAgent::new());
    let store = SessionStore::load(Arc::new(InMemoryKeyValueStore::new()));
    (ChatService::new(store, agent.clone()), agent)
}

async fn exchange(service: &mut ChatService, agent: &ScriptedAgent, prompt: &str, reply: &str) {
    agent.push_reply(reply);
    service.submit(prompt, |_| {}).await.unwrap();
}

#[tokio::test]
async fn test_first_prompt_in_fresh_session() {
    let (mut service, agent) = service();
    agent.push_chunks(["Hi", " there"]);

    let mut streamed = Vec::new();
    let outcome = service
        .submit("Hello", |chunk| streamed.push(chunk.to_string()))
        .await
        .unwrap();

    assert_eq!(streamed, vec!["Hi", " there"]);
    assert_eq!(outcome.response, "Hi there");
    assert_eq!(outcome.context_len, 0);
    assert_eq!(outcome.strategy, ContextStrategy::Recent);
    assert!(outcome.learned.is_empty());

    let requests = agent.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].turns, vec![Turn::user("Hello")]);

    let session = service.active().unwrap();
    assert_eq!(session.title, "Hello");
    assert_eq!(
        session.turns(),
        &[Turn::user("Hello"), Turn::assistant("Hi there")]
    );
}

#[tokio::test]
async fn test_recent_context_precedes_prompt() {
    let (mut service, agent) = service();
    exchange(&mut service, &agent, "one", "first").await;
    exchange(&mut service, &agent, "two", "second").await;

    agent.push_reply("third");
    let outcome = service.submit("three", |_| {}).await.unwrap();

    assert_eq!(outcome.context_len, 4);
    let last = agent.requests().pop().unwrap();
    assert_eq!(
        last.turns,
        vec![
            Turn::user("one"),
            Turn::assistant("first"),
            Turn::user("two"),
            Turn::assistant("second"),
            Turn::user("three"),
        ]
    );
    assert_eq!(service.active().unwrap().title, "one");
}

#[tokio::test]
async fn test_fast_mode_sends_prompt_alone() {
    let (mut service, agent) = service();
    exchange(&mut service, &agent, "one", "first").await;
    service.update_flags(|f| f.fast_mode = true).unwrap();

    agent.push_reply("quick");
    let outcome = service.submit("two", |_| {}).await.unwrap();

    assert_eq!(outcome.strategy, ContextStrategy::Disabled);
    assert_eq!(agent.requests().pop().unwrap().turns, vec![Turn::user("two")]);
}

#[tokio::test]
async fn test_prioritized_context_uses_selected_turns() {
    let (mut service, agent) = service();
    service
        .update_settings(|s| s.set_field("prioritizedContextCount", "2"))
        .unwrap();
    exchange(&mut service, &agent, "my cat is Tom", "nice").await;
    exchange(&mut service, &agent, "weather?", "sunny").await;
    service.update_flags(|f| f.prioritized_memory = true).unwrap();

    agent.push_reply("[3, 0]");
    agent.push_reply("Tom is a fine name");
    let outcome = service.submit("what is my cat called?", |_| {}).await.unwrap();

    assert_eq!(outcome.strategy, ContextStrategy::Prioritized);
    let requests = agent.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[2].params.temperature, 0.0);
    assert_eq!(
        requests[3].turns,
        vec![
            Turn::user("my cat is Tom"),
            Turn::assistant("sunny"),
            Turn::user("what is my cat called?"),
        ]
    );
}

#[tokio::test]
async fn test_failed_relevance_request_falls_back_to_recent_turns() {
    let (mut service, agent) = service();
    service
        .update_settings(|s| {
            s.set_field("prioritizedContextCount", "1")?;
            s.set_field("contextMessageCount", "2")
        })
        .unwrap();
    exchange(&mut service, &agent, "one", "first").await;
    service.update_flags(|f| f.prioritized_memory = true).unwrap();

    agent.push_error("connection refused");
    agent.push_reply("ok");
    let outcome = service.submit("two", |_| {}).await.unwrap();

    assert!(matches!(outcome.strategy, ContextStrategy::RecentFallback { .. }));
    assert_eq!(outcome.response, "ok");
    assert_eq!(
        agent.requests().pop().unwrap().turns,
        vec![Turn::user("one"), Turn::assistant("first"), Turn::user("two")]
    );
}

#[tokio::test]
async fn test_learning_runs_after_sixth_turn() {
    let (mut service, agent) = service();
    service.update_flags(|f| f.learning_mode = true).unwrap();

    exchange(&mut service, &agent, "I write Rust", "great").await;
    exchange(&mut service, &agent, "at night", "ok").await;
    assert_eq!(agent.request_count(), 2);

    agent.push_reply("third");
    agent.push_reply("Writes Rust\n\nWorks at night\n");
    let outcome = service.submit("mostly CLIs", |_| {}).await.unwrap();

    assert_eq!(outcome.learned, vec!["Writes Rust", "Works at night"]);
    let session = service.active().unwrap();
    assert_eq!(session.insights(), &["Writes Rust", "Works at night"]);
    assert_eq!(session.last_learned_message_count(), 6);

    // Insights lead the next context window
    agent.push_reply("noted");
    service.submit("anything else?", |_| {}).await.unwrap();
    let last = agent.requests().pop().unwrap();
    assert_eq!(last.turns[0].role(), TurnRole::User);
    assert!(last.turns[0].content().contains("- Writes Rust\n- Works at night"));
    assert_eq!(last.turns[1].role(), TurnRole::Assistant);
    assert_eq!(last.turns.last(), Some(&Turn::user("anything else?")));
}

#[tokio::test]
async fn test_failed_extraction_is_retried_on_next_turn() {
    let (mut service, agent) = service();
    service.update_flags(|f| f.learning_mode = true).unwrap();
    exchange(&mut service, &agent, "a", "b").await;
    exchange(&mut service, &agent, "c", "d").await;

    agent.push_reply("f");
    agent.push_error("quota exceeded");
    let outcome = service.submit("e", |_| {}).await.unwrap();

    assert!(outcome.learned.is_empty());
    let session = service.active().unwrap();
    assert!(session.insights().is_empty());
    assert_eq!(session.last_learned_message_count(), 0);

    agent.push_reply("h");
    agent.push_reply("Likes short answers");
    let outcome = service.submit("g", |_| {}).await.unwrap();

    assert_eq!(outcome.learned, vec!["Likes short answers"]);
    assert_eq!(service.active().unwrap().last_learned_message_count(), 8);
    assert_eq!(agent.remaining(), 0);
}

#[tokio::test]
async fn test_duplicate_insights_are_not_stored_twice() {
    let (mut service, agent) = service();
    service.update_flags(|f| f.learning_mode = true).unwrap();
    exchange(&mut service, &agent, "a", "b").await;
    exchange(&mut service, &agent, "c", "d").await;
    agent.push_reply("f");
    agent.push_reply("Likes tea");
    service.submit("e", |_| {}).await.unwrap();

    exchange(&mut service, &agent, "g", "h").await;
    exchange(&mut service, &agent, "i", "j").await;
    agent.push_reply("l");
    agent.push_reply("Likes tea\nOwns a bike");
    let outcome = service.submit("k", |_| {}).await.unwrap();

    assert_eq!(outcome.learned, vec!["Owns a bike"]);
    assert_eq!(
        service.active().unwrap().insights(),
        &["Likes tea", "Owns a bike"]
    );
}

#[tokio::test]
async fn test_model_failure_keeps_user_turn_only() {
    let (mut service, agent) = service();
    agent.push_error("service unavailable");

    let err = service.submit("Hello", |_| {}).await.unwrap_err();

    assert!(err.is_model());
    assert_eq!(service.active().unwrap().turns(), &[Turn::user("Hello")]);
}

#[tokio::test]
async fn test_stream_failure_after_partial_chunks_records_no_reply() {
    let (mut service, agent) = service();
    agent.push_interrupted(["Partial", " answer"], "connection reset");

    let mut streamed = Vec::new();
    let err = service
        .submit("Hello", |chunk| streamed.push(chunk.to_string()))
        .await
        .unwrap_err();

    assert!(err.is_model());
    assert_eq!(streamed, vec!["Partial", " answer"]);
    assert_eq!(service.active().unwrap().turns(), &[Turn::user("Hello")]);
}

#[tokio::test]
async fn test_failed_write_does_not_leak_turn_into_next_context() {
    let kv = Arc::new(SwitchableKeyValueStore::default());
    let agent = Arc::new(ScriptedAgent::new());
    let mut service = ChatService::new(SessionStore::load(kv.clone()), agent.clone());

    kv.fail_writes(true);
    let err = service.submit("Hello", |_| {}).await.unwrap_err();
    assert!(matches!(err, MnemoError::Io { .. }));
    assert_eq!(agent.request_count(), 0);
    assert_eq!(service.active().unwrap().turn_count(), 0);

    kv.fail_writes(false);
    agent.push_reply("Hi");
    service.submit("again", |_| {}).await.unwrap();

    assert_eq!(agent.requests()[0].turns, vec![Turn::user("again")]);
    assert_eq!(
        service.active().unwrap().turns(),
        &[Turn::user("again"), Turn::assistant("Hi")]
    );
}

#[tokio::test]
async fn test_blank_prompt_is_rejected() {
    let (mut service, agent) = service();

    let err = service.submit("   \n", |_| {}).await.unwrap_err();

    assert!(matches!(err, MnemoError::InvalidInput(_)));
    assert_eq!(agent.request_count(), 0);
    assert_eq!(service.active().unwrap().turn_count(), 0);
}

#[tokio::test]
async fn test_summary_is_stored_on_active_session() {
    let (mut service, agent) = service();
    exchange(&mut service, &agent, "Plan a trip to Kyoto", "Sure").await;
    agent.push_reply("Trip planning for Kyoto.");

    let summary = service.summarize_active().await.unwrap();

    assert_eq!(summary, "Trip planning for Kyoto.");
    assert_eq!(
        service.active().unwrap().summary.as_deref(),
        Some("Trip planning for Kyoto.")
    );
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (mut service, agent) = service();
    exchange(&mut service, &agent, "first session", "ok").await;
    let first_id = service.active().unwrap().id.clone();

    let second_id = service.new_session().unwrap().id.clone();
    agent.push_reply("fresh");
    let outcome = service.submit("second session", |_| {}).await.unwrap();

    assert_eq!(outcome.session_id, second_id);
    assert_eq!(outcome.context_len, 0);

    service.switch_session(&first_id).unwrap();
    assert_eq!(service.active().unwrap().turn_count(), 2);

    service.delete_session(&first_id).unwrap();
    assert_eq!(service.active().unwrap().id, second_id);
    assert_eq!(service.sessions().len(), 1);
}
