use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    error::Error,
    sync::{Arc, Mutex},
};
use synapse_chat::{Ask, ChatError, Conversation, Role, RETRY_INSTRUCTION};
use synapse_sdk::{
    ApiClient, ClientConfig, ErrorInfo, QueryOperation, QueryResult, Source, SourceMetadata,
};
use tokio::{net::TcpListener, sync::oneshot};

type BoxedError = Box<dyn Error + Send + Sync>;

enum Scripted {
    Answer(QueryResult),
    Fail(ErrorInfo),
    Panic(&'static str),
}

#[derive(Default)]
struct MockAsker {
    script: Mutex<VecDeque<Scripted>>,
    asked: Mutex<Vec<String>>,
    last_error: Mutex<Option<ErrorInfo>>,
}

impl MockAsker {
    fn enqueue(&self, scripted: Scripted) -> &Self {
        self.script.lock().unwrap().push_back(scripted);
        self
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Ask for MockAsker {
    async fn ask(&self, question: &str) -> Option<QueryResult> {
        self.asked.lock().unwrap().push(question.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next.expect("no scripted answer") {
            Scripted::Answer(result) => Some(result),
            Scripted::Fail(error) => {
                *self.last_error.lock().unwrap() = Some(error);
                None
            }
            Scripted::Panic(message) => panic!("{message}"),
        }
    }

    fn last_error(&self) -> Option<ErrorInfo> {
        self.last_error.lock().unwrap().clone()
    }
}

fn source(id: &str, filename: &str) -> Source {
    Source {
        id: id.to_string(),
        content: format!("excerpt of {filename}"),
        metadata: SourceMetadata {
            filename: Some(filename.to_string()),
            ..SourceMetadata::default()
        },
        score: None,
    }
}

#[tokio::test]
async fn answer_is_appended_with_sources_in_order() {
    let asker = Arc::new(MockAsker::default());
    let sources = vec![
        source("s1", "readme.md"),
        source("s2", "design.md"),
        source("s3", "notes.txt"),
    ];
    asker.enqueue(Scripted::Answer(QueryResult {
        answer: "It's a knowledge engine.".to_string(),
        sources: sources.clone(),
        confidence: None,
    }));
    let mut conversation = Conversation::new(asker.clone());

    let reply = conversation
        .submit("  What is the project about? ")
        .await
        .expect("reply should be appended")
        .clone();

    assert_eq!(reply.role, Role::Assistant);
    assert!(!reply.is_error);
    assert_eq!(reply.content, "It's a knowledge engine.");

    let messages = conversation.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].is_user());
    assert_eq!(messages[0].content, "What is the project about?");
    assert_ne!(messages[0].id, messages[1].id);
    assert_eq!(asker.asked(), vec!["What is the project about?"]);

    let extracted = conversation.sources_of(&reply.id).unwrap();
    assert_eq!(extracted, sources.as_slice());
    assert_eq!(
        reply.source_labels(),
        vec!["readme.md", "design.md", "notes.txt"]
    );
}

#[tokio::test]
async fn blank_question_appends_nothing() {
    let asker = Arc::new(MockAsker::default());
    let mut conversation = Conversation::new(asker.clone());

    assert!(conversation.submit("   ").await.is_none());
    assert!(conversation.messages().is_empty());
    assert!(asker.asked().is_empty());
}

#[tokio::test]
async fn failed_answer_becomes_error_bubble() {
    let asker = Arc::new(MockAsker::default());
    asker.enqueue(Scripted::Fail(ErrorInfo {
        message: "Internal Server Error".to_string(),
        code: "500".to_string(),
    }));
    let mut conversation = Conversation::new(asker.clone());

    let reply = conversation.submit("Why?").await.unwrap().clone();

    assert!(reply.is_error);
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, RETRY_INSTRUCTION);
    assert!(reply.sources.is_empty());
    assert_eq!(conversation.messages().len(), 2);
}

#[tokio::test]
async fn panicking_backend_is_caught() {
    let asker = Arc::new(MockAsker::default());
    asker
        .enqueue(Scripted::Panic("backend exploded"))
        .enqueue(Scripted::Answer(QueryResult {
            answer: "Back online.".to_string(),
            sources: vec![],
            confidence: None,
        }));
    let mut conversation = Conversation::new(asker.clone());

    let reply = conversation.submit("first").await.unwrap().clone();
    assert!(reply.is_error);
    assert_eq!(reply.content, RETRY_INSTRUCTION);

    let reply = conversation.submit("second").await.unwrap().clone();
    assert!(!reply.is_error);
    assert_eq!(reply.content, "Back online.");
    assert_eq!(conversation.messages().len(), 4);
}

#[tokio::test]
async fn toggling_sources_is_view_state_only() {
    let asker = Arc::new(MockAsker::default());
    asker.enqueue(Scripted::Answer(QueryResult {
        answer: "See the readme.".to_string(),
        sources: vec![source("s1", "readme.md")],
        confidence: None,
    }));
    let mut conversation = Conversation::new(asker);
    let reply = conversation.submit("where?").await.unwrap().clone();

    assert!(!conversation.is_expanded(&reply.id));
    assert!(conversation.toggle_sources(&reply.id).unwrap());
    assert!(conversation.is_expanded(&reply.id));
    assert!(!conversation.toggle_sources(&reply.id).unwrap());
    assert_eq!(conversation.find(&reply.id), Some(&reply));

    assert!(matches!(
        conversation.toggle_sources("msg-missing"),
        Err(ChatError::MessageNotFound(_))
    ));
    assert!(matches!(
        conversation.sources_of("msg-missing"),
        Err(ChatError::MessageNotFound(_))
    ));
}

#[tokio::test]
async fn messages_serialize_with_camel_case_fields() {
    let asker = Arc::new(MockAsker::default());
    asker.enqueue(Scripted::Fail(ErrorInfo {
        message: "down".to_string(),
        code: "unknown".to_string(),
    }));
    let mut conversation = Conversation::new(asker);
    conversation.submit("hello").await;

    let value = serde_json::to_value(conversation.messages()).unwrap();
    assert_eq!(value[0]["role"], json!("user"));
    assert_eq!(value[1]["isError"], json!(true));
    assert!(value[1]["createdAt"].is_string());
    assert!(value[1].get("sources").is_none());
}

#[tokio::test]
async fn conversation_over_http_backend() -> Result<(), BoxedError> {
    let app = Router::new().route(
        "/api/query",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({ "question": "What is the project about?" }));
            Json(json!({
                "answer": "It's a knowledge engine.",
                "sources": [{
                    "id": "s1",
                    "content": "...",
                    "metadata": { "type": "document", "filename": "readme.md" }
                }]
            }))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let operation = QueryOperation::new(ApiClient::new(ClientConfig::default().with_base_url(url)?));
    let mut conversation = Conversation::new(Arc::new(operation));

    let reply = conversation
        .submit("What is the project about?")
        .await
        .ok_or("reply should be appended")?
        .clone();

    assert!(!reply.is_error);
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].metadata.filename.as_deref(), Some("readme.md"));
    assert_eq!(reply.source_labels(), vec!["readme.md"]);

    let _ = shutdown_tx.send(());
    server.await??;
    Ok(())
}
