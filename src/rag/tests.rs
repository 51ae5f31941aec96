use super::*;
use crate::RagError;
use crate::llm::Role;
use crate::testing::{FakeChat, FakeEmbedder, FakeStore, scored};
use serde_json::json;

fn assistant(store: FakeStore, chat: FakeChat) -> (Assistant, Arc<FakeStore>, Arc<FakeChat>) {
    let store = Arc::new(store);
    let chat = Arc::new(chat);
    let assistant = Assistant::new(
        Arc::new(FakeEmbedder::new(8)),
        store.clone(),
        chat.clone(),
        "physical_ai_textbook",
    );
    (assistant, store, chat)
}

fn question(text: &str) -> QueryRequest {
    QueryRequest {
        question: text.to_string(),
        selected_text: None,
        conversation_history: None,
    }
}

#[test]
fn context_joins_retrieved_texts() {
    let results = vec![
        scored(0.9, &[("text", "Alpha")]),
        scored(0.8, &[("text", "Beta")]),
    ];

    assert_eq!(build_context(&results, None), "Alpha\n\nBeta");
}

#[test]
fn context_puts_selected_text_first() {
    let results = vec![
        scored(0.9, &[("text", "Alpha")]),
        scored(0.8, &[("text", "Beta")]),
    ];

    assert_eq!(
        build_context(&results, Some("Torque is force times lever arm.")),
        "SELECTED TEXT:\nTorque is force times lever arm.\n\nADDITIONAL CONTEXT:\nAlpha\n\nBeta"
    );
}

#[test]
fn empty_selected_text_is_ignored() {
    let results = vec![scored(0.9, &[("text", "Alpha")])];
    assert_eq!(build_context(&results, Some("")), "Alpha");
}

#[test]
fn context_without_results() {
    assert_eq!(build_context(&[], None), "");
    assert_eq!(
        build_context(&[], Some("picked")),
        "SELECTED TEXT:\npicked\n\nADDITIONAL CONTEXT:\n"
    );
}

#[test]
fn missing_text_payload_contributes_empty_string() {
    let results = vec![
        scored(0.9, &[("chapter", "One")]),
        scored(0.8, &[("text", "Beta")]),
    ];
    assert_eq!(build_context(&results, None), "\n\nBeta");
}

#[test]
fn messages_without_history() {
    let messages = assemble_messages("What is ROS 2?", "Alpha", &[]);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], ChatMessage::system(SYSTEM_PROMPT));
    assert_eq!(
        messages[1],
        ChatMessage::user("Context from textbook:\nAlpha\n\nQuestion: What is ROS 2?")
    );
}

#[test]
fn messages_keep_only_recent_history() {
    let history: Vec<ChatMessage> = (1..=8)
        .map(|i| {
            if i % 2 == 1 {
                ChatMessage::user(format!("m{}", i))
            } else {
                ChatMessage::assistant(format!("m{}", i))
            }
        })
        .collect();

    let messages = assemble_messages("q", "c", &history);

    assert_eq!(messages.len(), 8);
    assert_eq!(messages[0].role, Role::System);
    let forwarded: Vec<&str> = messages[1..7]
        .iter()
        .map(|message| message.content.as_str())
        .collect();
    assert_eq!(forwarded, vec!["m3", "m4", "m5", "m6", "m7", "m8"]);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[7].role, Role::User);
}

#[test]
fn short_history_is_forwarded_whole() {
    let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
    let messages = assemble_messages("q", "c", &history);

    assert_eq!(messages.len(), 4);
    assert_eq!(&messages[1..3], history.as_slice());
}

#[test]
fn preview_truncates_only_long_context() {
    assert_eq!(context_preview("short"), "short");

    let exact = "x".repeat(500);
    assert_eq!(context_preview(&exact), exact);

    let long = "y".repeat(501);
    let preview = context_preview(&long);
    assert_eq!(preview, format!("{}...", "y".repeat(500)));
}

#[test]
fn preview_counts_characters() {
    let long = "é".repeat(600);
    let preview = context_preview(&long);

    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 503);
}

#[test]
fn answer_returns_sources_and_preview() {
    let store = FakeStore::with_results(vec![
        scored(
            0.92,
            &[
                ("text", "ROS 2 is middleware."),
                ("chapter", "Intro To Ros2"),
                ("section", "Overview"),
            ],
        ),
        scored(0.71, &[("text", "Nodes talk over topics.")]),
    ]);
    let (assistant, store, chat) = assistant(store, FakeChat::replying("ROS 2 is middleware."));

    let response = assistant
        .answer(&question("What is ROS 2?"))
        .expect("answer should succeed");

    assert_eq!(response.answer, "ROS 2 is middleware.");
    assert_eq!(
        response.sources,
        vec![
            Source {
                chapter: "Intro To Ros2".to_string(),
                section: "Overview".to_string(),
                score: 0.92,
            },
            Source {
                chapter: "Unknown".to_string(),
                section: String::new(),
                score: 0.71,
            },
        ]
    );
    assert_eq!(
        response.context_used,
        "ROS 2 is middleware.\n\nNodes talk over topics."
    );

    let searches = store.searches.lock().expect("store lock").clone();
    assert_eq!(
        searches,
        vec![("physical_ai_textbook".to_string(), SEARCH_LIMIT, true)]
    );

    let (messages, options) = chat.last_request().expect("chat should be called");
    assert_eq!(options, ANSWER_OPTIONS);
    assert_eq!(options.max_tokens, 800);
    assert_eq!(messages.len(), 2);
    assert!(messages[1].content.contains("Question: What is ROS 2?"));
}

#[test]
fn answer_with_selected_text_and_history() {
    let store = FakeStore::with_results(vec![scored(0.5, &[("text", "Gait cycles.")])]);
    let (assistant, _store, chat) = assistant(store, FakeChat::replying("Explained."));

    let request = QueryRequest {
        question: "Explain this".to_string(),
        selected_text: Some("Zero moment point".to_string()),
        conversation_history: Some(vec![
            ChatMessage::user("Earlier question"),
            ChatMessage::assistant("Earlier answer"),
        ]),
    };
    let response = assistant.answer(&request).expect("answer should succeed");

    assert!(response.context_used.starts_with("SELECTED TEXT:\nZero moment point"));

    let (messages, _) = chat.last_request().expect("chat should be called");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1].content, "Earlier question");
    assert_eq!(
        messages[3].content,
        "Context from textbook:\nSELECTED TEXT:\nZero moment point\n\nADDITIONAL CONTEXT:\nGait cycles.\n\nQuestion: Explain this"
    );
}

#[test]
fn answer_with_no_results_still_calls_model() {
    let (assistant, _store, chat) = assistant(FakeStore::default(), FakeChat::replying("I don't know."));

    let response = assistant
        .answer(&question("Unrelated?"))
        .expect("answer should succeed");

    assert!(response.sources.is_empty());
    assert_eq!(response.context_used, "");
    assert!(chat.last_request().is_some());
}

#[test]
fn answer_propagates_model_failure() {
    let store = FakeStore::with_results(vec![scored(0.5, &[("text", "x")])]);
    let (assistant, _store, _chat) = assistant(store, FakeChat::failing("HTTP 401: bad key"));

    assert!(matches!(
        assistant.answer(&question("q")),
        Err(RagError::Llm(_))
    ));
}

#[test]
fn answer_propagates_store_failure() {
    let (assistant, _store, chat) = assistant(FakeStore::unavailable(), FakeChat::replying("x"));

    assert!(matches!(
        assistant.answer(&question("q")),
        Err(RagError::VectorStore(_))
    ));
    assert!(chat.last_request().is_none());
}

#[test]
fn ingest_stores_text_with_metadata() {
    let store = FakeStore::with_collection("physical_ai_textbook", 8);
    let (assistant, store, _chat) = assistant(store, FakeChat::replying(""));

    let mut metadata = Map::new();
    metadata.insert("chapter".to_string(), json!("Custom"));
    metadata.insert("page".to_string(), json!(12));
    let request = IngestRequest {
        text: "Custom note".to_string(),
        metadata,
    };

    let response = assistant.ingest(&request).expect("ingest should succeed");

    assert_eq!(response.status, "success");
    assert_eq!(response.message, "Content ingested successfully");
    assert_eq!(response.chunk_id, chunk_id("Custom note"));

    let collection = store
        .collection("physical_ai_textbook")
        .expect("collection should exist");
    let point = collection
        .points
        .get(&response.chunk_id)
        .expect("point should be stored");
    assert_eq!(point.vector.len(), 8);
    assert_eq!(point.payload.get("text"), Some(&json!("Custom note")));
    assert_eq!(point.payload.get("chapter"), Some(&json!("Custom")));
    assert_eq!(point.payload.get("page"), Some(&json!(12)));
}

#[test]
fn ingest_same_text_twice_overwrites() {
    let store = FakeStore::with_collection("physical_ai_textbook", 8);
    let (assistant, store, _chat) = assistant(store, FakeChat::replying(""));
    let request = IngestRequest {
        text: "Repeated".to_string(),
        metadata: Map::new(),
    };

    let first = assistant.ingest(&request).expect("first ingest");
    let second = assistant.ingest(&request).expect("second ingest");

    assert_eq!(first.chunk_id, second.chunk_id);
    let collection = store
        .collection("physical_ai_textbook")
        .expect("collection should exist");
    assert_eq!(collection.points.len(), 1);
}

#[test]
fn metadata_text_key_overrides_body_text() {
    let store = FakeStore::with_collection("physical_ai_textbook", 8);
    let (assistant, store, _chat) = assistant(store, FakeChat::replying(""));

    let mut metadata = Map::new();
    metadata.insert("text".to_string(), json!("from metadata"));
    let response = assistant
        .ingest(&IngestRequest {
            text: "from body".to_string(),
            metadata,
        })
        .expect("ingest should succeed");

    let collection = store
        .collection("physical_ai_textbook")
        .expect("collection should exist");
    assert_eq!(response.chunk_id, chunk_id("from body"));
    assert_eq!(
        collection.points[&response.chunk_id].payload.get("text"),
        Some(&json!("from metadata"))
    );
}

#[test]
fn initialize_creates_then_reports_existing() {
    let (assistant, store, _chat) = assistant(FakeStore::default(), FakeChat::replying(""));

    let created = assistant.initialize_collection().expect("initialize");
    assert_eq!(created.status, "created");
    assert_eq!(
        created.message,
        "Collection 'physical_ai_textbook' created successfully"
    );

    let collection = store
        .collection("physical_ai_textbook")
        .expect("collection should exist");
    assert_eq!(collection.dimension, 8);
    assert_eq!(collection.distance, Distance::Cosine);

    let existing = assistant.initialize_collection().expect("initialize again");
    assert_eq!(existing.status, "exists");
    assert_eq!(
        existing.message,
        "Collection 'physical_ai_textbook' already exists"
    );
}

#[test]
fn delete_collection_reports_success_and_failure() {
    let store = FakeStore::with_collection("physical_ai_textbook", 8);
    let (assistant, store, _chat) = assistant(store, FakeChat::replying(""));

    let deleted = assistant.delete_collection().expect("delete");
    assert_eq!(deleted.status, "deleted");
    assert_eq!(
        deleted.message,
        "Collection 'physical_ai_textbook' deleted successfully"
    );
    assert!(store.collection("physical_ai_textbook").is_none());

    assert!(matches!(
        assistant.delete_collection(),
        Err(RagError::VectorStore(_))
    ));
}

#[test]
fn health_reports_connected_store() {
    let (assistant, _store, _chat) = assistant(FakeStore::default(), FakeChat::replying(""));

    assert_eq!(
        assistant.health(),
        HealthReport {
            status: "ok".to_string(),
            qdrant: "connected".to_string(),
            openai: "configured".to_string(),
        }
    );
}

#[test]
fn health_reports_store_error_and_missing_key() {
    let chat = FakeChat {
        configured: false,
        ..FakeChat::replying("")
    };
    let (assistant, _store, _chat) = assistant(FakeStore::unavailable(), chat);

    let report = assistant.health();
    assert_eq!(report.status, "ok");
    assert_eq!(report.qdrant, "error: Vector store error: Connection refused");
    assert_eq!(report.openai, "not configured");
}

#[test]
fn query_request_accepts_frontend_shape() {
    let request: QueryRequest = serde_json::from_value(json!({
        "question": "What is SLAM?",
        "selected_text": null,
        "conversation_history": [
            {"role": "user", "content": "hi", "timestamp": 1},
            {"role": "assistant", "content": "hello", "sources": []}
        ]
    }))
    .expect("request should parse");

    assert_eq!(request.selected_text, None);
    assert_eq!(
        request.conversation_history,
        Some(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")])
    );

    let minimal: QueryRequest =
        serde_json::from_value(json!({"question": "q"})).expect("minimal request should parse");
    assert_eq!(minimal, question("q"));
}
