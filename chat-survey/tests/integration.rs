//! Integration tests for chat-survey

use std::sync::Arc;
use std::time::Duration;

use chat_survey::{
    Acknowledgment, Deliverer, DeliveryConfig, EventMeta, FieldRegistry, FieldSpec,
    InboundEvent, Incoming, Keyboard, MemoryStore, OutboundMessage, RecordStore,
    RecordingTransport, Reply, SurveyMachine, TransportError, UserId, formatters, validators,
};

fn registry() -> FieldRegistry {
    FieldRegistry::new(vec![
        FieldSpec::new("phone", "Phone", "Share your phone number")
            .request_contact()
            .with_validator(validators::phone)
            .with_db_formatter(formatters::phone_digits)
            .with_display_formatter(formatters::phone_pretty),
        FieldSpec::new("handle", "Handle", "")
            .auto_collect(|meta| meta.username.clone().unwrap_or_default()),
        FieldSpec::new("birth_date", "Birth date", "When were you born? (dd.mm.yyyy)")
            .with_validator(validators::date)
            .with_db_formatter(formatters::date_padded),
        FieldSpec::new("student", "Student", "Are you a student?").with_options(["Yes", "No"]),
        FieldSpec::new("university", "University", "Where do you study?")
            .skip_if(|values| values.is("student", "No")),
        FieldSpec::new("interests", "Interests", "What are you interested in?")
            .with_options(["Music", "Sports", "Art"])
            .multi_select()
            .with_acknowledgment(Acknowledgment::Fixed("Thanks!".into())),
    ])
    .unwrap()
}

fn setup() -> (Arc<MemoryStore>, SurveyMachine) {
    let store = Arc::new(MemoryStore::new());
    let machine = SurveyMachine::new(registry(), store.clone());
    (store, machine)
}

fn event(event: InboundEvent) -> Incoming {
    Incoming::new(1, event).with_meta(EventMeta::default().with_username("alice_w"))
}

async fn send(machine: &SurveyMachine, input: InboundEvent) -> Reply {
    machine.advance(&event(input)).await.unwrap()
}

async fn state(store: &MemoryStore) -> String {
    store.snapshot(UserId(1)).await.unwrap().state
}

/// Drive user 1 up to the interests field as a non-student.
async fn up_to_interests(machine: &SurveyMachine) {
    send(machine, InboundEvent::text("/start")).await;
    send(machine, InboundEvent::contact("+7 999 123-45-67")).await;
    send(machine, InboundEvent::text("1.1.2000")).await;
    send(machine, InboundEvent::select("No")).await;
}

#[tokio::test]
async fn test_new_user_is_asked_first_field() {
    let (store, machine) = setup();
    let reply = send(&machine, InboundEvent::text("/start")).await;

    let prompt = reply.prompt().unwrap();
    assert_eq!(prompt.text, "Share your phone number");
    assert!(matches!(prompt.keyboard, Keyboard::RequestContact { .. }));
    assert_eq!(state(&store).await, "phone");
}

#[tokio::test]
async fn test_auto_collected_field_is_never_prompted() {
    let (store, machine) = setup();
    send(&machine, InboundEvent::text("/start")).await;
    let reply = send(&machine, InboundEvent::contact("89991234567")).await;

    assert_eq!(reply.len(), 1);
    assert_eq!(reply.prompt().unwrap().text, "When were you born? (dd.mm.yyyy)");
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.values.get("phone"), Some("79991234567"));
    assert_eq!(record.values.get("handle"), Some("alice_w"));
    assert_eq!(record.state, "birth_date");
}

#[tokio::test]
async fn test_skipped_field_is_stored_and_bypassed() {
    let (store, machine) = setup();
    send(&machine, InboundEvent::text("/start")).await;
    send(&machine, InboundEvent::contact("+79991234567")).await;
    send(&machine, InboundEvent::text("1.1.2000")).await;
    let reply = send(&machine, InboundEvent::select("No")).await;

    assert_eq!(reply.prompt().unwrap().text, "What are you interested in?");
    assert!(reply.messages.iter().all(|m| m.text != "Where do you study?"));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.values.get("university"), Some("skipped"));
    assert_eq!(record.values.get("birth_date"), Some("01.01.2000"));
    assert_eq!(record.state, "interests");
}

#[tokio::test]
async fn test_skip_predicate_false_prompts_field() {
    let (store, machine) = setup();
    send(&machine, InboundEvent::text("/start")).await;
    send(&machine, InboundEvent::contact("+79991234567")).await;
    send(&machine, InboundEvent::text("1.1.2000")).await;
    let reply = send(&machine, InboundEvent::select("Yes")).await;

    assert_eq!(reply.prompt().unwrap().text, "Where do you study?");
    assert_eq!(state(&store).await, "university");
}

#[tokio::test]
async fn test_invalid_input_keeps_state() {
    let (store, machine) = setup();
    send(&machine, InboundEvent::text("/start")).await;
    let reply = send(&machine, InboundEvent::text("call me maybe")).await;

    assert_eq!(reply.len(), 1);
    assert!(reply.prompt().unwrap().text.starts_with("A phone number"));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "phone");
    assert!(!record.values.contains("phone"));
}

#[tokio::test]
async fn test_toggling_twice_restores_selection() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;

    send(&machine, InboundEvent::select("Art")).await;
    let before = store.snapshot(UserId(1)).await.unwrap().values;
    send(&machine, InboundEvent::select("Music")).await;
    send(&machine, InboundEvent::select("Music")).await;
    let after = store.snapshot(UserId(1)).await.unwrap().values;

    assert_eq!(before, after);
    assert_eq!(after.get("interests.selected"), Some("Art"));
    assert_eq!(state(&store).await, "interests");
}

#[tokio::test]
async fn test_done_on_empty_selection_is_rejected() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;

    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::select("Art")).await;
    let reply = send(&machine, InboundEvent::done()).await;

    assert_eq!(
        reply.prompt().unwrap().text,
        "Please select at least one option before pressing Done."
    );
    assert_eq!(state(&store).await, "interests");
    assert!(!store.snapshot(UserId(1)).await.unwrap().values.contains("interests"));
}

#[tokio::test]
async fn test_done_commits_in_declared_order() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;

    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::select("Music")).await;
    let reply = send(&machine, InboundEvent::done()).await;

    assert_eq!(reply.messages[0].text, "Thanks!");
    assert!(reply.prompt().unwrap().text.starts_with("You are registered."));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.values.get("interests"), Some("Music, Art"));
    assert!(!record.values.contains("interests.selected"));
    assert_eq!(record.state, "registered");
}

#[tokio::test]
async fn test_summary_uses_display_formatters() {
    let (_, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Sports")).await;
    let reply = send(&machine, InboundEvent::done()).await;

    let summary = &reply.prompt().unwrap().text;
    assert!(summary.contains("Phone: +7 (999) 123-45-67"));
    assert!(summary.contains("Interests: Sports"));
    assert!(!summary.contains("University"));
    assert_eq!(
        reply.prompt().unwrap().keyboard,
        Keyboard::Menu(vec!["Change data".into()])
    );
}

#[tokio::test]
async fn test_edit_returns_to_registered() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::done()).await;

    let menu = send(&machine, InboundEvent::text("Change data")).await;
    assert_eq!(state(&store).await, "edit");
    let Keyboard::Menu(entries) = &menu.prompt().unwrap().keyboard else {
        panic!("expected a menu keyboard");
    };
    assert!(entries.contains(&"Birth date".to_string()));
    assert!(!entries.contains(&"Handle".to_string()));
    assert_eq!(entries.last().unwrap(), "Cancel");

    send(&machine, InboundEvent::text("Birth date")).await;
    assert_eq!(state(&store).await, "edit_birth_date");

    send(&machine, InboundEvent::text("2.3.1999")).await;
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "registered");
    assert_eq!(record.values.get("birth_date"), Some("02.03.1999"));
}

#[tokio::test]
async fn test_editing_the_first_field_does_not_continue_the_sequence() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::done()).await;
    send(&machine, InboundEvent::text("Change data")).await;
    send(&machine, InboundEvent::text("Phone")).await;

    let reply = send(&machine, InboundEvent::contact("+7 (912) 000-11-22")).await;

    assert!(reply.prompt().unwrap().text.starts_with("You are registered."));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "registered");
    assert_eq!(record.values.get("phone"), Some("79120001122"));
    assert_eq!(record.values.get("birth_date"), Some("01.01.2000"));
}

#[tokio::test]
async fn test_editing_a_multi_select_field_returns_to_registered() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::done()).await;
    send(&machine, InboundEvent::text("Change data")).await;
    send(&machine, InboundEvent::text("Interests")).await;
    assert_eq!(state(&store).await, "edit_interests");

    send(&machine, InboundEvent::select("Sports")).await;
    let reply = send(&machine, InboundEvent::done()).await;

    assert!(reply.prompt().unwrap().text.starts_with("You are registered."));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "registered");
    assert_eq!(record.values.get("interests"), Some("Sports"));
    assert!(!record.values.contains("interests.selected"));
}

#[tokio::test]
async fn test_editing_an_option_field_returns_to_registered() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::done()).await;
    send(&machine, InboundEvent::text("Change data")).await;
    send(&machine, InboundEvent::text("Student")).await;
    assert_eq!(state(&store).await, "edit_student");

    let reply = send(&machine, InboundEvent::select("Yes")).await;

    assert!(reply.prompt().unwrap().text.starts_with("You are registered."));
    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "registered");
    assert_eq!(record.values.get("student"), Some("Yes"));
    assert_eq!(record.values.get("interests"), Some("Art"));
}

#[tokio::test]
async fn test_cancel_leaves_data_untouched() {
    let (store, machine) = setup();
    up_to_interests(&machine).await;
    send(&machine, InboundEvent::select("Art")).await;
    send(&machine, InboundEvent::done()).await;
    let before = store.snapshot(UserId(1)).await.unwrap().values;

    send(&machine, InboundEvent::text("Change data")).await;
    send(&machine, InboundEvent::text("Cancel")).await;

    let record = store.snapshot(UserId(1)).await.unwrap();
    assert_eq!(record.state, "registered");
    assert_eq!(record.values, before);
}

#[test]
fn test_phone_and_date_formatting() {
    assert_eq!(formatters::phone_digits("89991234567"), "79991234567");
    assert_eq!(formatters::phone_digits("+79991234567"), "79991234567");
    assert_eq!(
        formatters::phone_digits(&formatters::phone_digits("89991234567")),
        "79991234567"
    );
    assert_eq!(formatters::date_padded("1.1.2020"), "01.01.2020");
}

fn deliverer(store: Arc<MemoryStore>, transport: Arc<RecordingTransport>) -> Deliverer {
    Deliverer::new(store, transport, DeliveryConfig::default())
}

#[tokio::test]
async fn test_blocked_recipient_is_marked_after_one_call() {
    let store = Arc::new(MemoryStore::new().with_user(UserId(1), "registered"));
    let transport = Arc::new(
        RecordingTransport::new().with_outcomes(
            UserId(1),
            [Err(TransportError::Blocked("bot was blocked by the user".into()))],
        ),
    );

    let sent = deliverer(store.clone(), transport.clone())
        .send(UserId(1), &OutboundMessage::text("hello"))
        .await;

    assert!(!sent);
    assert_eq!(transport.calls().len(), 1);
    assert!(store.is_blocked(UserId(1)).await.unwrap());
}

#[tokio::test]
async fn test_blocked_recipient_is_not_contacted_again() {
    let store = Arc::new(MemoryStore::new().with_blocked_user(UserId(1), "registered"));
    let transport = Arc::new(RecordingTransport::new());

    let sent = deliverer(store, transport.clone())
        .send(UserId(1), &OutboundMessage::text("hello"))
        .await;

    assert!(!sent);
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_back_off_exponentially() {
    let store = Arc::new(MemoryStore::new().with_user(UserId(1), "registered"));
    let transport = Arc::new(RecordingTransport::new().with_outcomes(
        UserId(1),
        [
            Err(TransportError::Network("connection reset".into())),
            Err(TransportError::Network("timed out".into())),
            Ok(()),
        ],
    ));

    let sent = deliverer(store, transport.clone())
        .send(UserId(1), &OutboundMessage::text("hello"))
        .await;

    assert!(sent);
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].at - calls[0].at, Duration::from_secs(1));
    assert_eq!(calls[2].at - calls[1].at, Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_retries_are_exhausted_without_panicking() {
    let store = Arc::new(MemoryStore::new().with_user(UserId(1), "registered"));
    let transport = Arc::new(
        RecordingTransport::new()
            .always_failing(UserId(1), TransportError::Network("unreachable".into())),
    );
    let config = DeliveryConfig::default().with_max_retries(4);
    let deliverer = Deliverer::new(store.clone(), transport.clone(), config);

    let sent = deliverer
        .send(UserId(1), &OutboundMessage::text("hello"))
        .await;

    assert!(!sent);
    assert_eq!(transport.calls().len(), 4);
    assert!(!store.is_blocked(UserId(1)).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_fanout_continues_past_blocked_recipient() {
    let store = Arc::new(
        MemoryStore::new()
            .with_user(UserId(1), "registered")
            .with_user(UserId(2), "registered")
            .with_user(UserId(3), "registered"),
    );
    let transport = Arc::new(RecordingTransport::new().always_failing(
        UserId(2),
        TransportError::Blocked("bot was blocked by the user".into()),
    ));

    let stats = deliverer(store.clone(), transport.clone())
        .send_to_many(
            &[UserId(1), UserId(2), UserId(3)],
            &OutboundMessage::text("news"),
        )
        .await;

    assert_eq!(stats.success, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(transport.recipients(), vec![UserId(1), UserId(2), UserId(3)]);
    assert!(store.is_blocked(UserId(2)).await.unwrap());
}
