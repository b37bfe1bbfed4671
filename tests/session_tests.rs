//! Scenario tests for `ChatSession` against a scripted backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use datasonic::chat::{
    ChatConfig, ChatSession, IMAGE_FAILURE_TEXT, NO_RESPONSE_TEXT, Rejection, SendOutcome,
    TurnOutcome, image_caption,
};
use datasonic::{
    AttachmentKind, ChatBackend, EncodedPart, Error, GeneratedImage, PendingAttachment, Result,
    Sender,
};

#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String>>>,
    images: Mutex<VecDeque<Result<GeneratedImage>>>,
    sent: Mutex<Vec<Vec<EncodedPart>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    fn fail(self, err: Error) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    fn image(self, image: Result<GeneratedImage>) -> Self {
        self.images.lock().unwrap().push_back(image);
        self
    }

    fn sent(&self) -> Vec<Vec<EncodedPart>> {
        self.sent.lock().unwrap().clone()
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_message(&self, parts: Vec<EncodedPart>) -> Result<String> {
        self.sent.lock().unwrap().push(parts);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::internal_server("script exhausted")))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::internal_server("script exhausted")))
    }
}

/// Blocks every chat call until released.
#[derive(Default)]
struct GatedBackend {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl ChatBackend for GatedBackend {
    async fn send_message(&self, _parts: Vec<EncodedPart>) -> Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok("done".to_string())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage> {
        Err(Error::internal_server("unused"))
    }
}

fn quiet_config() -> ChatConfig {
    ChatConfig::new().with_greeting(None)
}

fn session_with(backend: &Arc<ScriptedBackend>) -> ChatSession {
    ChatSession::new(backend.clone(), &quiet_config())
}

fn transcript(session: &ChatSession) -> Vec<(Sender, String)> {
    session
        .messages()
        .into_iter()
        .map(|m| (m.sender, m.text))
        .collect()
}

#[tokio::test]
async fn hello_appends_user_then_bot() {
    let backend = Arc::new(ScriptedBackend::default().reply("Hi! How can I help?"));
    let session = session_with(&backend);

    let outcome = session.send("Hello", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::Replied));
    assert_eq!(
        transcript(&session),
        vec![
            (Sender::User, "Hello".to_string()),
            (Sender::Bot, "Hi! How can I help?".to_string()),
        ]
    );
    assert_eq!(
        backend.sent(),
        vec![vec![EncodedPart::Text("Hello".to_string())]]
    );
    assert!(!session.is_busy());
}

#[tokio::test]
async fn greeting_comes_first() {
    let backend = Arc::new(ScriptedBackend::default().reply("hey"));
    let config = ChatConfig::new().with_greeting(Some("Welcome".to_string()));
    let session = ChatSession::new(backend.clone(), &config);

    session.send("yo", None).await;

    assert_eq!(
        transcript(&session),
        vec![
            (Sender::Bot, "Welcome".to_string()),
            (Sender::User, "yo".to_string()),
            (Sender::Bot, "hey".to_string()),
        ]
    );
}

#[tokio::test]
async fn primary_failure_appends_one_apology() {
    let backend = Arc::new(ScriptedBackend::default().fail(Error::internal_server("boom")));
    let session = session_with(&backend);

    let outcome = session.send("Hello", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::NoResponse));
    assert_eq!(
        transcript(&session),
        vec![
            (Sender::User, "Hello".to_string()),
            (Sender::Bot, NO_RESPONSE_TEXT.to_string()),
        ]
    );
    assert!(!session.is_busy());
    assert_eq!(session.stats().chat_failures, 1);
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn session_recovers_after_failure() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .fail(Error::bad_request("nope"))
            .reply("back again"),
    );
    let session = session_with(&backend);

    session.send("one", None).await;
    let outcome = session.send("two", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::Replied));
    assert_eq!(session.message_count(), 4);
}

#[tokio::test]
async fn image_request_appends_text_then_image() {
    let reply = "```json\n{\"action\":\"generate_image\",\"textResponse\":\"ok\",\"prompt\":\"a cat\"}\n```";
    let backend = Arc::new(
        ScriptedBackend::default()
            .reply(reply)
            .image(Ok(GeneratedImage::jpeg("AAAA"))),
    );
    let session = session_with(&backend);

    let outcome = session.send("draw a cat", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::ImageGenerated));
    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::Bot);
    assert_eq!(messages[1].text, "ok");
    assert_eq!(messages[2].sender, Sender::Bot);
    assert_eq!(messages[2].text, image_caption("a cat"));
    let attachment = messages[2].attachment.as_ref().unwrap();
    assert_eq!(attachment.kind, AttachmentKind::Image);
    assert_eq!(attachment.content, "data:image/jpeg;base64,AAAA");
    assert_eq!(backend.prompts(), vec!["a cat".to_string()]);
    assert_eq!(session.stats().images_generated, 1);
}

#[tokio::test]
async fn image_failure_appends_text_then_apology() {
    let reply = r#"Sure! {"action":"generate_image","textResponse":"On it","prompt":"a dog"}"#;
    let backend = Arc::new(
        ScriptedBackend::default()
            .reply(reply)
            .image(Err(Error::bad_request("blocked"))),
    );
    let session = session_with(&backend);

    let outcome = session.send("draw a dog", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::ImageFailed));
    assert_eq!(
        transcript(&session),
        vec![
            (Sender::User, "draw a dog".to_string()),
            (Sender::Bot, "On it".to_string()),
            (Sender::Bot, IMAGE_FAILURE_TEXT.to_string()),
        ]
    );
    assert!(!session.is_busy());
    assert_eq!(session.stats().image_failures, 1);
}

#[tokio::test]
async fn command_without_prompt_is_plain_text() {
    let reply = r#"{"action":"generate_image","textResponse":"ok"}"#;
    let backend = Arc::new(ScriptedBackend::default().reply(reply));
    let session = session_with(&backend);

    let outcome = session.send("draw", None).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::Replied));
    assert_eq!(session.messages()[1].text, reply);
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn blank_input_is_a_no_op() {
    let backend = Arc::new(ScriptedBackend::default().reply("unused"));
    let session = session_with(&backend);

    for text in ["", "   ", "\n\t "] {
        assert_eq!(
            session.send(text, None).await,
            SendOutcome::Rejected(Rejection::Empty)
        );
    }

    assert_eq!(session.message_count(), 0);
    assert!(backend.sent().is_empty());
    assert_eq!(session.stats().turns, 0);
}

#[tokio::test]
async fn send_while_busy_is_rejected() {
    let backend = Arc::new(GatedBackend::default());
    let session = Arc::new(ChatSession::new(backend.clone(), &quiet_config()));

    session.set_draft("first");
    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit().await })
    };
    backend.entered.notified().await;

    assert!(session.is_busy());
    // The optimistic message is visible and the composer is already empty.
    assert_eq!(session.messages()[0].text, "first");
    assert_eq!(session.draft(), "");

    assert_eq!(
        session.send("second", None).await,
        SendOutcome::Rejected(Rejection::Busy)
    );
    session.set_draft("third");
    assert_eq!(
        session.submit().await,
        SendOutcome::Rejected(Rejection::Busy)
    );
    assert_eq!(session.draft(), "third");
    assert_eq!(session.message_count(), 1);

    backend.release.notify_one();
    assert_eq!(
        first.await.unwrap(),
        SendOutcome::Completed(TurnOutcome::Replied)
    );
    assert!(!session.is_busy());
    assert_eq!(
        transcript(&session),
        vec![
            (Sender::User, "first".to_string()),
            (Sender::Bot, "done".to_string()),
        ]
    );
}

#[tokio::test]
async fn image_attachment_is_sent_before_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();

    let backend = Arc::new(ScriptedBackend::default().reply("Nice photo"));
    let session = session_with(&backend);
    let pending = PendingAttachment::image(&path).await.unwrap();

    let outcome = session.send("what is this?", Some(pending)).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::Replied));
    assert_eq!(
        backend.sent(),
        vec![vec![
            EncodedPart::InlineData {
                mime_type: "image/png".to_string(),
                data: "AQID".to_string(),
            },
            EncodedPart::Text("what is this?".to_string()),
        ]]
    );
    let user = &session.messages()[0];
    let attachment = user.attachment.as_ref().unwrap();
    assert_eq!(attachment.kind, AttachmentKind::Image);
    assert_eq!(attachment.content, "data:image/png;base64,AQID");
}

#[tokio::test]
async fn attachment_alone_is_enough_to_send() {
    let backend = Arc::new(ScriptedBackend::default().reply("Got your notes"));
    let session = session_with(&backend);
    session.stage_attachment(PendingAttachment::document("notes.txt").unwrap());

    let outcome = session.submit().await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::Replied));
    assert_eq!(
        backend.sent(),
        vec![vec![EncodedPart::DocumentReference {
            name: "notes.txt".to_string()
        }]]
    );
    let user = &session.messages()[0];
    assert_eq!(user.text, "");
    assert_eq!(
        user.attachment.as_ref().map(|a| (a.kind, a.content.as_str())),
        Some((AttachmentKind::Document, "notes.txt"))
    );
    assert!(session.pending_attachment().is_none());
}

#[tokio::test]
async fn vanished_image_counts_as_no_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.jpg");
    std::fs::write(&path, b"jpeg").unwrap();
    let pending = PendingAttachment::image(&path).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let backend = Arc::new(ScriptedBackend::default().reply("unused"));
    let session = session_with(&backend);

    let outcome = session.send("look", Some(pending)).await;

    assert_eq!(outcome, SendOutcome::Completed(TurnOutcome::NoResponse));
    assert!(backend.sent().is_empty());
    assert_eq!(
        transcript(&session),
        vec![
            (Sender::User, "look".to_string()),
            (Sender::Bot, NO_RESPONSE_TEXT.to_string()),
        ]
    );
    assert!(!session.is_busy());
}

#[tokio::test]
async fn transcript_only_grows_with_increasing_ids() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .reply("a")
            .fail(Error::internal_server("b"))
            .reply(r#"{"action":"generate_image","textResponse":"c","prompt":"d"}"#)
            .image(Ok(GeneratedImage::jpeg("AAAA"))),
    );
    let session = session_with(&backend);

    let mut previous_len = session.message_count();
    let mut previous = session.messages();
    for text in ["one", "  ", "two", "three"] {
        session.send(text, None).await;
        let current = session.messages();
        assert!(current.len() >= previous_len);
        assert_eq!(&current[..previous.len()], &previous[..]);
        previous_len = current.len();
        previous = current;
    }

    assert_eq!(previous.len(), 7);
    assert!(previous.windows(2).all(|pair| pair[0].id < pair[1].id));
    for message in &previous {
        assert_eq!(session.message(message.id).as_ref(), Some(message));
    }
}
