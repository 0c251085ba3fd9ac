#![cfg(test)]

use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use async_trait::async_trait;
use mockall::mock;
use support_triage::{
    base::{
        config::{Config, ConfigInner},
        types::{ClassificationResult, ClassifierContext, ReplyContext, Res, Speaker, SupportLevel, TriageLevel, Void},
    },
    interaction::{
        chat_event::{FALLBACK_REPLY, handle_chat_event, process_chat_event},
        dismiss::{NOTHING_TO_DISMISS, process_dismiss},
        drain_tasks,
        emergency_contact::{CONTACT_FAILED, CONTACT_SENT, NO_ACTIVE_EMERGENCY, handle_emergency_contact, process_emergency_contact},
        session::Session,
        voice_note::process_voice_note,
    },
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        dispatch::{ContactDetails, DispatchClient, EmergencyContactRequest, GenericDispatchClient},
        llm::{GenericLlmClient, LlmClient},
        transcription::{AudioClip, GenericTranscriptionClient, TranscriptionClient},
    },
    triage::{
        display::{DisplayPrompt, DisplayState},
        engine::{TriageAction, Urgency, decide},
    },
};

// Mocks.

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn classify(&self, context: &ClassifierContext) -> Res<ClassificationResult>;
        async fn get_support_reply(&self, context: &ReplyContext) -> Res<String>;
    }
}

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self) -> Void;
        async fn send_message(&self, text: &str) -> Void;
        async fn render_prompt(&self, prompt: &DisplayPrompt) -> Void;
    }
}

mock! {
    pub Dispatch {}

    #[async_trait]
    impl GenericDispatchClient for Dispatch {
        async fn dispatch(&self, request: &EmergencyContactRequest) -> Void;
    }
}

mock! {
    pub Transcription {}

    #[async_trait]
    impl GenericTranscriptionClient for Transcription {
        async fn transcribe(&self, clip: &AudioClip) -> Res<String>;
    }
}

// Helpers.

/// Everything the mocks observed.
#[derive(Clone, Default)]
struct Recorded {
    messages: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<DisplayState>>>,
    reply_actions: Arc<Mutex<Vec<TriageAction>>>,
    dispatched: Arc<Mutex<Vec<EmergencyContactRequest>>>,
}

impl Recorded {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn prompts(&self) -> Vec<DisplayState> {
        self.prompts.lock().unwrap().clone()
    }

    fn reply_actions(&self) -> Vec<TriageAction> {
        self.reply_actions.lock().unwrap().clone()
    }

    fn dispatched(&self) -> Vec<EmergencyContactRequest> {
        self.dispatched.lock().unwrap().clone()
    }
}

fn classification(support_level: SupportLevel, triage_level: TriageLevel) -> ClassificationResult {
    ClassificationResult {
        support_level: Some(support_level),
        triage_level: Some(triage_level),
        reasoning: format!("Classified as {triage_level}."),
        needs_follow_up: support_level.warrants_follow_up(),
        confidence: Some(0.8),
        follow_up_questions: vec!["How are you sleeping?".to_string()],
    }
}

/// A classifier that keys its answer off marker words in the message.
fn classify_by_marker(context: &ClassifierContext) -> Res<ClassificationResult> {
    let text = context.user_message.to_lowercase();

    if text.contains("offline") {
        Err(anyhow::anyhow!("classifier unavailable"))
    } else if text.contains("hopeless") {
        Ok(classification(SupportLevel::High, TriageLevel::Ats2))
    } else if text.contains("overwhelmed") {
        Ok(classification(SupportLevel::Mid, TriageLevel::Ats3))
    } else if text.contains("tired") {
        Ok(classification(SupportLevel::Mid, TriageLevel::Ats4))
    } else {
        Ok(classification(SupportLevel::Low, TriageLevel::Ats5))
    }
}

fn get_mock_llm(recorded: &Recorded, reply_fails: bool) -> MockLlm {
    let mut mock = MockLlm::new();
    let reply_actions = recorded.reply_actions.clone();

    mock.expect_classify().returning(classify_by_marker);
    mock.expect_get_support_reply().returning(move |context| {
        reply_actions.lock().unwrap().push(context.action);

        if reply_fails {
            Err(anyhow::anyhow!("assistant unavailable"))
        } else {
            Ok(format!("I hear you: {}", context.user_message))
        }
    });

    mock
}

fn get_mock_chat(recorded: &Recorded) -> MockChat {
    let mut mock = MockChat::new();
    let messages = recorded.messages.clone();
    let prompts = recorded.prompts.clone();

    mock.expect_start().returning(|| Ok(()));
    mock.expect_send_message().returning(move |text| {
        messages.lock().unwrap().push(text.to_string());
        Ok(())
    });
    mock.expect_render_prompt().returning(move |prompt| {
        prompts.lock().unwrap().push(prompt.state);
        Ok(())
    });

    mock
}

fn get_mock_dispatch(recorded: &Recorded, fails: bool) -> MockDispatch {
    let mut mock = MockDispatch::new();
    let dispatched = recorded.dispatched.clone();

    mock.expect_dispatch().returning(move |request| {
        if fails {
            return Err(anyhow::anyhow!("mail server unreachable"));
        }

        dispatched.lock().unwrap().push(request.clone());
        Ok(())
    });

    mock
}

fn get_mock_transcription(transcript: Option<&'static str>) -> MockTranscription {
    let mut mock = MockTranscription::new();

    mock.expect_transcribe().returning(move |_| transcript.map(str::to_string).ok_or_else(|| anyhow::anyhow!("could not decode audio")));

    mock
}

/// Helper function to setup the test environment.
fn setup_test_environment(recorded: &Recorded, reply_fails: bool, dispatch_fails: bool, transcript: Option<&'static str>) -> Runtime {
    let config = Config {
        inner: Arc::new(ConfigInner {
            openai_api_key: "test_key".to_string(),
            emergency_contact_recipient: "care@uni.example".to_string(),
            ..Default::default()
        }),
    };

    Runtime {
        config,
        session: Session::new(),
        llm: LlmClient::new(Arc::new(get_mock_llm(recorded, reply_fails))),
        transcription: TranscriptionClient::new(Arc::new(get_mock_transcription(transcript))),
        dispatch: DispatchClient::new(Arc::new(get_mock_dispatch(recorded, dispatch_fails))),
        chat: ChatClient::new(Arc::new(get_mock_chat(recorded))),
    }
}

async fn send(runtime: &Runtime, text: &str) -> Void {
    let message = runtime.session.submit(text).await?;
    process_chat_event(message, &runtime.session, &runtime.llm, &runtime.chat).await
}

fn sam() -> ContactDetails {
    ContactDetails::parse("Sam; sam@uni.example; 0400 000 000; evenings")
}

// Chat events.

#[tokio::test]
async fn test_keyword_message_escalates_even_when_classifier_is_offline() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "offline? whatever. I just want to KILL MYSELF").await.unwrap();

    let prompt = runtime.session.prompt().await;
    let decision = prompt.decision.unwrap();

    assert_eq!(prompt.state, DisplayState::EmergencyShown);
    assert_eq!(decision.urgency, Some(Urgency::Critical));
    assert_eq!(decision.source_classification, None);
    assert_eq!(recorded.prompts(), vec![DisplayState::EmergencyShown]);
    assert_eq!(recorded.reply_actions(), vec![TriageAction::EmergencyModal]);
}

#[tokio::test]
async fn test_offline_classifier_without_keywords_takes_no_action() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "the wifi is offline again and I'm annoyed").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert!(recorded.prompts().is_empty());
    assert_eq!(recorded.messages().len(), 1);
}

#[tokio::test]
async fn test_critical_triage_shows_emergency_prompt() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "Everything feels hopeless").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
    assert_eq!(recorded.prompts(), vec![DisplayState::EmergencyShown]);
}

#[tokio::test]
async fn test_urgent_triage_shows_advisory_banner() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I'm so overwhelmed with my thesis").await.unwrap();

    let prompt = runtime.session.prompt().await;

    assert_eq!(prompt.state, DisplayState::AdvisoryShown);
    assert_eq!(prompt.decision.and_then(|d| d.urgency), None);
    assert_eq!(recorded.reply_actions(), vec![TriageAction::AdvisoryBanner]);
}

#[tokio::test]
async fn test_support_level_backup_rule_shows_advisory_banner() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I'm tired all the time").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::AdvisoryShown);
}

#[tokio::test]
async fn test_low_classification_only_replies() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "Any tips for exam week?").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert!(recorded.prompts().is_empty());
    assert_eq!(recorded.messages(), vec!["I hear you: Any tips for exam week?".to_string()]);
    assert_eq!(runtime.session.history().await.len(), 2);
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    assert!(send(&runtime, "   ").await.is_err());
    assert!(runtime.session.history().await.is_empty());
}

#[tokio::test]
async fn test_later_banner_does_not_downgrade_emergency() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I'm overwhelmed").await.unwrap();
    assert_eq!(runtime.session.prompt().await.state, DisplayState::AdvisoryShown);

    send(&runtime, "honestly it all feels hopeless").await.unwrap();
    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);

    send(&runtime, "still overwhelmed").await.unwrap();
    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);

    // The unacknowledged emergency prompt is re-rendered after the last reply.
    assert_eq!(recorded.prompts(), vec![DisplayState::AdvisoryShown, DisplayState::EmergencyShown, DisplayState::EmergencyShown]);
}

#[tokio::test]
async fn test_newer_calm_message_clears_banner() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I'm overwhelmed").await.unwrap();
    send(&runtime, "Thanks, talking helped. What's a good study playlist?").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert_eq!(recorded.prompts(), vec![DisplayState::AdvisoryShown, DisplayState::Idle]);
}

#[tokio::test]
async fn test_reply_failure_sends_fallback_and_keeps_decision() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, true, false, None);

    send(&runtime, "I want to die").await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
    assert_eq!(recorded.messages(), vec![FALLBACK_REPLY.to_string()]);
}

// Dismissal.

#[tokio::test]
async fn test_dismiss_clears_prompt() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "self-harm has been on my mind").await.unwrap();
    process_dismiss(&runtime.session, &runtime.chat).await.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert_eq!(recorded.prompts(), vec![DisplayState::EmergencyShown, DisplayState::Idle]);

    process_dismiss(&runtime.session, &runtime.chat).await.unwrap();

    assert_eq!(recorded.messages().last().map(String::as_str), Some(NOTHING_TO_DISMISS));
}

// Emergency contact.

#[tokio::test]
async fn test_emergency_contact_dispatches_and_acknowledges() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "it all feels hopeless").await.unwrap();
    process_emergency_contact(sam(), &runtime.session, &runtime.dispatch, &runtime.chat).await.unwrap();

    let dispatched = recorded.dispatched();

    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].urgency, Urgency::Critical);
    assert_eq!(dispatched[0].triage_level, Some(TriageLevel::Ats2));
    assert_eq!(dispatched[0].contact.name, "Sam");
    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert!(recorded.messages().contains(&CONTACT_SENT.to_string()));
}

#[tokio::test]
async fn test_emergency_contact_requires_active_emergency() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I'm overwhelmed").await.unwrap();
    process_emergency_contact(sam(), &runtime.session, &runtime.dispatch, &runtime.chat).await.unwrap();

    assert!(recorded.dispatched().is_empty());
    assert_eq!(recorded.messages().last().map(String::as_str), Some(NO_ACTIVE_EMERGENCY));
    assert_eq!(runtime.session.prompt().await.state, DisplayState::AdvisoryShown);
}

#[tokio::test]
async fn test_emergency_contact_requires_a_way_to_reach_the_user() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    send(&runtime, "I want to end my life").await.unwrap();
    process_emergency_contact(ContactDetails::parse("Sam"), &runtime.session, &runtime.dispatch, &runtime.chat).await.unwrap();

    assert!(recorded.dispatched().is_empty());
    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
}

#[tokio::test]
async fn test_failed_dispatch_keeps_emergency_prompt() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, true, None);

    send(&runtime, "I want to end my life").await.unwrap();
    let result = process_emergency_contact(sam(), &runtime.session, &runtime.dispatch, &runtime.chat).await;

    assert!(result.is_err());
    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
    assert_eq!(recorded.messages().last().map(String::as_str), Some(CONTACT_FAILED));
}

// Voice notes.

fn write_voice_note(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("support-triage-{}-{name}", std::process::id()));
    std::fs::write(&path, b"not really audio").unwrap();
    path
}

#[tokio::test]
async fn test_voice_note_is_transcribed_and_triaged() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, Some("lately I want to die"));
    let path = write_voice_note("escalate.webm");

    process_voice_note(path.clone(), &runtime.session, &runtime.llm, &runtime.transcription, &runtime.chat).await.unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
    assert_eq!(recorded.messages().first().map(String::as_str), Some("(You said: \"lately I want to die\")"));
}

#[tokio::test]
async fn test_voice_note_transcription_failure_is_reported() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);
    let path = write_voice_note("garbled.webm");

    let result = process_voice_note(path.clone(), &runtime.session, &runtime.llm, &runtime.transcription, &runtime.chat).await;
    let _ = std::fs::remove_file(&path);

    assert!(result.is_err());
    assert_eq!(recorded.messages().len(), 1);
    assert!(runtime.session.history().await.is_empty());
}

#[tokio::test]
async fn test_missing_voice_note_is_reported() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, Some("unused"));
    let path = std::env::temp_dir().join("support-triage-does-not-exist.webm");

    let result = process_voice_note(path, &runtime.session, &runtime.llm, &runtime.transcription, &runtime.chat).await;

    assert!(result.is_err());
    assert!(recorded.messages()[0].contains("couldn't open"));
}

// Concurrency.

#[tokio::test]
async fn test_concurrent_messages_never_lose_the_emergency() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    let (emergency, advisory, calm) = tokio::join!(
        send(&runtime, "I keep thinking about suicide"),
        send(&runtime, "and I'm overwhelmed"),
        send(&runtime, "anyway, how do I book a counsellor?"),
    );

    emergency.unwrap();
    advisory.unwrap();
    calm.unwrap();

    assert_eq!(runtime.session.prompt().await.state, DisplayState::EmergencyShown);
    assert_eq!(runtime.session.history().await.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rapid_messages_keep_submission_order() {
    for _ in 0..20 {
        let recorded = Recorded::default();
        let runtime = setup_test_environment(&recorded, false, false, None);
        let mut tasks = JoinSet::new();

        // Calm messages followed by one that warrants a banner.
        for i in 0..20 {
            let text = if i == 19 { format!("{i} overwhelmed") } else { i.to_string() };
            let message = runtime.session.submit(&text).await.unwrap();

            handle_chat_event(&mut tasks, message, runtime.session.clone(), runtime.llm.clone(), runtime.chat.clone());
        }

        drain_tasks(&mut tasks).await;

        let order = runtime
            .session
            .history()
            .await
            .into_iter()
            .filter(|turn| turn.speaker == Speaker::User)
            .filter_map(|turn| turn.text.split_whitespace().next().and_then(|n| n.parse::<u32>().ok()))
            .collect::<Vec<_>>();

        assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "user turns out of order: {order:?}");

        // Older calm decisions arriving late must not clear the newest message's banner.
        assert_eq!(runtime.session.prompt().await.state, DisplayState::AdvisoryShown);
    }
}

// Shutdown.

#[tokio::test]
async fn test_pending_work_completes_when_drained() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);
    let mut tasks = JoinSet::new();

    let message = runtime.session.submit("I want to end my life").await.unwrap();
    handle_chat_event(&mut tasks, message, runtime.session.clone(), runtime.llm.clone(), runtime.chat.clone());
    drain_tasks(&mut tasks).await;

    assert_eq!(recorded.prompts(), vec![DisplayState::EmergencyShown]);
    assert_eq!(recorded.messages().len(), 1);

    // A contact request submitted right before quitting is still sent.
    handle_emergency_contact(&mut tasks, sam(), runtime.session.clone(), runtime.dispatch.clone(), runtime.chat.clone());
    drain_tasks(&mut tasks).await;

    assert_eq!(recorded.dispatched().len(), 1);
    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
    assert!(tasks.is_empty());
}

// Early keyword screening.

#[tokio::test]
async fn test_keyword_prompt_is_shown_before_classifier_answers() {
    let recorded = Recorded::default();
    let mut runtime = setup_test_environment(&recorded, false, false, None);

    let prompts = recorded.prompts.clone();
    let seen_by_classifier = Arc::new(Mutex::new(Vec::new()));
    let seen = seen_by_classifier.clone();

    let mut llm = MockLlm::new();
    llm.expect_classify().returning(move |_| {
        seen.lock().unwrap().extend(prompts.lock().unwrap().iter().copied());
        Ok(classification(SupportLevel::High, TriageLevel::Ats1))
    });
    llm.expect_get_support_reply().returning(|_| Ok("I'm here with you.".to_string()));
    runtime.llm = LlmClient::new(Arc::new(llm));

    send(&runtime, "I keep thinking about suicide").await.unwrap();

    let decision = runtime.session.prompt().await.decision.unwrap();

    assert_eq!(*seen_by_classifier.lock().unwrap(), vec![DisplayState::EmergencyShown]);
    assert_eq!(recorded.prompts(), vec![DisplayState::EmergencyShown]);
    assert_eq!(decision.matched_phrase, Some("suicide"));
    assert_eq!(decision.source_classification.and_then(|c| c.triage_level), Some(TriageLevel::Ats1));
}

#[tokio::test]
async fn test_keyword_prompt_dismissed_while_classifying_stays_dismissed() {
    let recorded = Recorded::default();
    let runtime = setup_test_environment(&recorded, false, false, None);

    let message = runtime.session.submit("I want to die").await.unwrap();
    let sequence = message.sequence;

    let early = decide("I want to die", None);
    runtime.session.apply_decision(sequence, early).await;
    runtime.session.dismiss().await;

    let detailed = decide("I want to die", Some(&classification(SupportLevel::High, TriageLevel::Ats1)));

    assert!(!runtime.session.refine_decision(sequence, detailed).await);
    assert_eq!(runtime.session.prompt().await.state, DisplayState::Idle);
}
