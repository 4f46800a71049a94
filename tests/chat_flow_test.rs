use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wisp::{
    ChatSession, HttpReplyFetcher, IdentityResolver, IdentityStore, SendStart, Sender,
    FALLBACK_REPLY, GREETING,
};

fn session_for(endpoint: String, dir: &TempDir) -> ChatSession {
    let identity = IdentityResolver::load(IdentityStore::in_dir(dir.path())).unwrap();
    let fetcher = Arc::new(HttpReplyFetcher::new(endpoint).unwrap());
    ChatSession::new(identity, fetcher)
}

#[tokio::test]
async fn test_hello_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(serde_json::json!({ "message": "hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "reply": ["hi", "how are you?"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut chat = session_for(format!("{}/chat", server.uri()), &dir);
    chat.send("hello").await;

    let log: Vec<(Sender, String)> = chat
        .conversation()
        .messages()
        .iter()
        .map(|m| (m.sender(), m.text().to_string()))
        .collect();
    assert_eq!(
        log,
        vec![
            (Sender::Assistant, GREETING.to_string()),
            (Sender::User, "hello".to_string()),
            (Sender::Assistant, "hi".to_string()),
            (Sender::Assistant, "how are you?".to_string()),
        ]
    );
    assert!(!chat.conversation().is_loading());
}

#[tokio::test]
async fn test_identity_sent_as_user_id() {
    let dir = TempDir::new().unwrap();
    let token = IdentityResolver::load(IdentityStore::in_dir(dir.path()))
        .unwrap()
        .token()
        .to_string();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "userId": token })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reply": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = session_for(server.uri(), &dir);
    chat.send("ping").await;
    assert_eq!(chat.conversation().last().unwrap().text(), "ok");
}

#[tokio::test]
async fn test_failed_fetch_appends_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut chat = session_for(server.uri(), &dir);
    chat.send("hello").await;

    assert_eq!(chat.conversation().len(), 3);
    let last = chat.conversation().last().unwrap();
    assert_eq!(last.sender(), Sender::Assistant);
    assert_eq!(last.text(), FALLBACK_REPLY);
    assert!(!chat.conversation().is_loading());
}

#[tokio::test]
async fn test_whitespace_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reply": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut chat = session_for(server.uri(), &dir);
    assert_eq!(chat.send("  \t ").await, SendStart::Empty);
    assert_eq!(chat.conversation().len(), 1);
}

#[tokio::test]
async fn test_clear_after_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "reply": "x" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut chat = session_for(server.uri(), &dir);
    chat.send("one").await;
    chat.clear();

    assert_eq!(chat.conversation().len(), 1);
    assert_eq!(chat.conversation().messages()[0].text(), GREETING);
}
