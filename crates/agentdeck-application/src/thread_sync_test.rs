use super::*;
use crate::testing::{MockApi, thread, wire};
use agentdeck_core::ids::{AgentId, ClientMessageId};
use agentdeck_core::message::MessageRole;

fn setup() -> (Arc<MockApi>, SessionStore, Arc<ThreadSynchronizer>) {
    let api = MockApi::new();
    let store = SessionStore::new();
    let synchronizer = Arc::new(ThreadSynchronizer::new(
        api.clone(),
        store.clone(),
        &PlaygroundConfig::default(),
    ));
    (api, store, synchronizer)
}

fn contents(store: &SessionStore) -> Vec<String> {
    store.read(|state| state.messages.iter().map(|m| m.content.clone()).collect())
}

fn active_id(store: &SessionStore) -> Option<ThreadId> {
    store.read(|state| state.active_thread_id().cloned())
}

async fn wait_for_call(api: &MockApi, call: &str) {
    while !api.called(call) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_empty_recent_thread_is_reused_and_renamed() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Untitled", 0, "2025-02-01T00:00:00Z"));
    api.add_thread(thread("3", "a", "Older", 5, "2025-01-01T00:00:00Z"));

    let active = synchronizer
        .initialize_for_agent(AgentRef::new("a", "A"))
        .await
        .unwrap();

    assert_eq!(active.id, Some(ThreadId::from("7")));
    assert_eq!(active.title, "General Conversation (A)");
    assert_eq!(api.count("create_thread"), 0);
    assert!(api.called("update_thread:7=General Conversation (A)"));

    let state = store.snapshot();
    assert_eq!(state.threads.len(), 2);
    assert_eq!(state.threads[0].title, "General Conversation (A)");
    assert!(state.messages.is_empty());
}

#[tokio::test]
async fn test_reused_thread_with_default_title_is_not_renamed() {
    let (api, _store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "General Conversation (A)", 0, "2025-02-01T00:00:00Z"));

    synchronizer
        .initialize_for_agent(AgentRef::new("a", "A"))
        .await
        .unwrap();

    assert_eq!(api.count("update_thread"), 0);
    assert_eq!(api.count("create_thread"), 0);
}

#[tokio::test]
async fn test_non_empty_recent_thread_creates_default_thread() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Weather chat", 4, "2025-02-01T00:00:00Z"));
    api.add_thread(thread("3", "a", "Untitled", 0, "2025-01-01T00:00:00Z"));

    let active = synchronizer
        .initialize_for_agent(AgentRef::new("a", "A"))
        .await
        .unwrap();

    assert!(api.called("create_thread:General Conversation (A)"));
    assert_eq!(active_id(&store), active.id);
    assert_eq!(store.read(|state| state.threads.len()), 3);
}

#[tokio::test]
async fn test_agent_switch_drops_previous_messages() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Chat", 1, "2025-02-01T00:00:00Z"));
    api.set_messages("7", vec![wire("m1", MessageRole::User, "for A only")]);
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();
    assert_eq!(contents(&store), vec!["for A only"]);

    let active = synchronizer
        .initialize_for_agent(AgentRef::new("b", "B"))
        .await
        .unwrap();

    let state = store.snapshot();
    assert!(state.messages.is_empty());
    assert_eq!(state.selected_agent.map(|a| a.name), Some("B".to_string()));
    assert_eq!(active.agent_id, Some(AgentId::from("b")));
    assert!(state.threads.iter().all(|t| t.agent_id == Some(AgentId::from("b"))));
    // The failed exit of a project session that never existed is not an error.
    assert!(api.called("exit_project_session:a"));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_late_load_of_previous_selection_is_discarded() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 1, "2025-01-02T00:00:00Z"));
    api.add_thread(thread("9", "a", "Nine", 2, "2025-01-01T00:00:00Z"));
    api.set_messages("7", vec![wire("m71", MessageRole::User, "from seven")]);
    api.set_messages(
        "9",
        vec![
            wire("m91", MessageRole::User, "question"),
            wire("m92", MessageRole::Assistant, "answer"),
        ],
    );
    store.select_agent(AgentRef::new("a", "A"));
    api.gate("7");

    let first = {
        let synchronizer = synchronizer.clone();
        tokio::spawn(async move { synchronizer.select_thread(ThreadId::from("7")).await })
    };
    wait_for_call(&api, "get_thread:7").await;
    assert_eq!(active_id(&store), Some(ThreadId::from("7")));
    assert!(store.read(|state| state.is_loading_thread));

    let second = synchronizer.select_thread(ThreadId::from("9")).await.unwrap();
    assert_eq!(second, LoadOutcome::Loaded { message_count: 2 });

    api.release("7");
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);

    assert_eq!(active_id(&store), Some(ThreadId::from("9")));
    assert_eq!(contents(&store), vec!["question", "answer"]);
    assert!(!store.read(|state| state.is_loading_thread));
}

#[tokio::test]
async fn test_load_finishing_after_agent_switch_is_discarded() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 1, "2025-01-02T00:00:00Z"));
    api.set_messages("7", vec![wire("m71", MessageRole::User, "from A")]);
    store.select_agent(AgentRef::new("a", "A"));
    api.gate("7");

    let load = {
        let synchronizer = synchronizer.clone();
        tokio::spawn(async move { synchronizer.select_thread(ThreadId::from("7")).await })
    };
    wait_for_call(&api, "get_thread:7").await;

    synchronizer
        .initialize_for_agent(AgentRef::new("b", "B"))
        .await
        .unwrap();
    api.release("7");

    assert_eq!(load.await.unwrap().unwrap(), LoadOutcome::Superseded);
    assert!(contents(&store).is_empty());
    assert_eq!(
        store.read(|state| state.active_thread.as_ref().map(|t| t.title.clone())),
        Some("General Conversation (B)".to_string())
    );
}

#[tokio::test]
async fn test_missing_message_list_is_a_load_error() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 3, "2025-01-02T00:00:00Z"));
    api.override_detail(
        "7",
        ThreadDetail {
            thread: thread("7", "a", "Seven", 3, "2025-01-02T00:00:00Z"),
            messages: None,
            error_code: None,
            error_message: None,
        },
    );
    store.select_agent(AgentRef::new("a", "A"));

    let result = synchronizer.select_thread(ThreadId::from("7")).await;

    assert!(matches!(result, Err(DeckError::MalformedResponse(_))));
    let state = store.snapshot();
    assert!(state.thread_load_error.is_some());
    assert!(state.messages.is_empty());
    assert!(!state.is_loading_thread);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_error_code_is_a_load_error() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 3, "2025-01-02T00:00:00Z"));
    api.override_detail(
        "7",
        ThreadDetail {
            thread: thread("7", "a", "Seven", 3, "2025-01-02T00:00:00Z"),
            messages: Some(Vec::new()),
            error_code: Some("thread_corrupted".into()),
            error_message: Some("Thread data is corrupted".into()),
        },
    );
    store.select_agent(AgentRef::new("a", "A"));

    let result = synchronizer.select_thread(ThreadId::from("7")).await;

    assert!(result.unwrap_err().is_thread_load_failure());
    assert_eq!(
        store.read(|state| state.thread_load_error.clone()),
        Some("Thread data is corrupted".to_string())
    );
}

#[tokio::test]
async fn test_transport_failure_sets_error_banner() {
    let (api, store, synchronizer) = setup();
    api.fail("get_thread");
    store.select_agent(AgentRef::new("a", "A"));

    let result = synchronizer.select_thread(ThreadId::from("7")).await;

    assert!(result.unwrap_err().is_transport());
    let state = store.snapshot();
    assert!(state.thread_load_error.is_none());
    assert!(state.error.unwrap().starts_with("Failed to load thread"));
}

#[tokio::test]
async fn test_reconcile_confirms_optimistic_messages() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 0, "2025-01-02T00:00:00Z"));
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();

    let optimistic = Message::optimistic_user("hi");
    let client_id: ClientMessageId = optimistic.id.client_id().unwrap();
    store.push_message(optimistic);
    store.push_message(Message::optimistic(MessageRole::Assistant, "hello"));
    api.set_messages(
        "7",
        vec![
            wire("m1", MessageRole::User, "hi"),
            wire("m2", MessageRole::Assistant, "hello"),
        ],
    );

    synchronizer
        .reconcile_after_send(&ThreadId::from("7"))
        .await
        .unwrap();

    let state = store.snapshot();
    assert!(state.messages.iter().all(Message::is_confirmed));
    assert_eq!(state.id_map.get(&client_id), Some(&ServerMessageId::from("m1")));
    assert_eq!(state.active_thread.map(|t| t.message_count), Some(2));
}

#[tokio::test]
async fn test_reconcile_failure_keeps_local_messages() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 0, "2025-01-02T00:00:00Z"));
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();
    store.push_message(Message::optimistic_user("hi"));
    api.fail("get_thread");

    assert!(
        synchronizer
            .reconcile_after_send(&ThreadId::from("7"))
            .await
            .is_err()
    );
    assert_eq!(contents(&store), vec!["hi"]);
    assert!(store.read(|state| state.error.is_none()));
}

#[tokio::test]
async fn test_delete_message_removes_later_messages() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 3, "2025-01-02T00:00:00Z"));
    api.set_messages(
        "7",
        vec![
            wire("m1", MessageRole::User, "one"),
            wire("m2", MessageRole::Assistant, "two"),
            wire("m3", MessageRole::User, "three"),
        ],
    );
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();

    synchronizer
        .delete_message(&MessageId::Server(ServerMessageId::from("m2")))
        .await
        .unwrap();

    assert_eq!(contents(&store), vec!["one"]);
    assert_eq!(
        store.read(|state| state.active_thread.as_ref().map(|t| t.message_count)),
        Some(1)
    );
}

#[tokio::test]
async fn test_unconfirmed_message_cannot_be_deleted() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 0, "2025-01-02T00:00:00Z"));
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();
    let optimistic = Message::optimistic_user("pending");
    let id = optimistic.id.clone();
    store.push_message(optimistic);

    let result = synchronizer.delete_message(&id).await;

    assert!(matches!(result, Err(DeckError::InvalidState(_))));
    assert_eq!(api.count("delete_message"), 0);
}

#[tokio::test]
async fn test_bookmark_updates_message() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 1, "2025-01-02T00:00:00Z"));
    api.set_messages("7", vec![wire("m1", MessageRole::Assistant, "keep this")]);
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();

    synchronizer
        .set_bookmark(&MessageId::Server(ServerMessageId::from("m1")), true)
        .await
        .unwrap();

    assert!(api.called("set_bookmark:m1=true"));
    assert!(store.read(|state| state.messages[0].is_bookmarked));
}

#[tokio::test]
async fn test_deleting_active_thread_activates_another() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 1, "2025-01-02T00:00:00Z"));
    api.add_thread(thread("9", "a", "Nine", 1, "2025-01-01T00:00:00Z"));
    api.set_messages("9", vec![wire("m9", MessageRole::User, "nine")]);
    store.select_agent(AgentRef::new("a", "A"));
    synchronizer.refresh_threads().await.unwrap();
    synchronizer.select_thread(ThreadId::from("7")).await.unwrap();

    synchronizer.delete_thread(&ThreadId::from("7")).await.unwrap();

    assert_eq!(active_id(&store), Some(ThreadId::from("9")));
    assert_eq!(contents(&store), vec!["nine"]);
    assert_eq!(store.read(|state| state.threads.len()), 1);
}

#[tokio::test]
async fn test_backend_rename_updates_list_and_active_thread() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "General Conversation (A)", 0, "2025-01-02T00:00:00Z"));
    synchronizer
        .initialize_for_agent(AgentRef::new("a", "A"))
        .await
        .unwrap();

    synchronizer.apply_rename(&ThreadId::from("7"), "Weather in Paris");

    let state = store.snapshot();
    assert_eq!(state.active_thread.unwrap().title, "Weather in Paris");
    assert_eq!(state.threads[0].title, "Weather in Paris");
    assert_eq!(api.count("update_thread"), 0);
}

#[tokio::test]
async fn test_rename_rejects_blank_title() {
    let (_api, _store, synchronizer) = setup();
    let result = synchronizer.rename_thread(&ThreadId::from("7"), "   ").await;
    assert!(matches!(result, Err(DeckError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_requests_are_debounced() {
    let (api, store, synchronizer) = setup();
    api.add_thread(thread("7", "a", "Seven", 1, "2025-01-02T00:00:00Z"));
    store.select_agent(AgentRef::new("a", "A"));

    for _ in 0..3 {
        synchronizer.schedule_refresh();
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(api.count("list_threads"), 1);
    assert_eq!(store.read(|state| state.threads.len()), 1);
}
