use async_trait::async_trait;
use graphpersist::prelude::*;
use serde_json::{Value as Json, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

graph_edge! {
    pub struct Knows: VertexRef => VertexRef {
        label = "knows";
        since: i64,
    }
}

/// Transport double: records every statement and replays scripted replies.
#[derive(Default)]
struct RecordingExecutor {
    sent: Mutex<Vec<Statement>>,
    replies: Mutex<VecDeque<Result<Vec<Json>>>>,
}

impl RecordingExecutor {
    fn replying(replies: Vec<Result<Vec<Json>>>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        }
    }

    fn sent(&self) -> Vec<Statement> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Json>> {
        self.sent.lock().unwrap().push(statement.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct CollectingDiagnostics {
    queries: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl QueryDiagnostics for CollectingDiagnostics {
    fn query(&self, statement: &Statement) {
        self.queries.lock().unwrap().push(statement.text().to_string());
    }

    fn failed_query(&self, statement: &Statement, error: &GraphError) {
        self.failures
            .lock()
            .unwrap()
            .push(format!("{} -> {}", statement.text(), error));
    }
}

fn new_knows(since: i64) -> Knows {
    let mut knows = Knows::with_key("e1", since).unwrap();
    knows.edge_mut().set_in_vertex_id("v1").unwrap();
    knows.edge_mut().set_out_vertex_id("v2").unwrap();
    knows
}

fn stored_row() -> Json {
    json!({
        "id": "e1",
        "label": "knows",
        "inV": "v1",
        "outV": "v2",
        "properties": { "since": 2019 }
    })
}

#[tokio::test]
async fn save_inserts_then_reports_unchanged() {
    let session = GraphSession::new(RecordingExecutor::default(), MapperConfig::new());
    let mut knows = new_knows(2020);

    assert_eq!(session.save(&mut knows).await.unwrap(), SaveOutcome::Inserted);
    assert_eq!(knows.edge().state(), EntityState::Clean);
    assert!(knows.edge().changes().is_empty());

    assert_eq!(session.save(&mut knows).await.unwrap(), SaveOutcome::Unchanged);

    let sent = session.executor().sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text().starts_with("g.V(inVId)"));
    assert_eq!(sent[0].parameter("__since"), Some(&TransferValue::Integer(2020)));
}

#[tokio::test]
async fn save_after_insert_updates_by_key() {
    let session = GraphSession::new(RecordingExecutor::default(), MapperConfig::new());
    let mut knows = new_knows(2020);
    session.save(&mut knows).await.unwrap();

    knows.set_since(2021).unwrap();
    assert_eq!(session.save(&mut knows).await.unwrap(), SaveOutcome::Updated);

    let sent = session.executor().sent();
    assert_eq!(sent[1].text(), "g.E(___ekey).property('since', __since)");
    assert_eq!(
        sent[1].parameters_json(),
        json!({ "___ekey": "e1", "__since": 2021 })
    );
}

#[tokio::test]
async fn save_uses_literal_mode_from_config() {
    let session = GraphSession::new(
        RecordingExecutor::default(),
        MapperConfig::new().parameterized(false),
    );
    let mut knows = new_knows(2020);
    session.save(&mut knows).await.unwrap();

    assert_eq!(
        session.executor().sent()[0].text(),
        "g.V('v1').as('a').V('v2').as('b').addE('knows').from('b').to('a')\
         .property('id','e1').property('since',2020)"
    );
}

#[tokio::test]
async fn deleting_sends_drop_and_stays_deleted() {
    let session = GraphSession::new(
        RecordingExecutor::replying(vec![Ok(vec![stored_row()])]),
        MapperConfig::new(),
    );
    let mut knows: Knows = session.load_edge("e1").await.unwrap().unwrap();
    knows.edge_mut().delete();

    assert_eq!(session.save(&mut knows).await.unwrap(), SaveOutcome::Deleted);
    assert!(knows.edge().is_deleted());
    assert_eq!(
        session.executor().sent().last().unwrap().text(),
        "g.E(___ekey).drop()"
    );
}

#[tokio::test]
async fn unsaved_deleted_edge_sends_nothing() {
    let session = GraphSession::new(RecordingExecutor::default(), MapperConfig::new());
    let mut knows = new_knows(2020);
    knows.edge_mut().delete();

    assert_eq!(session.save(&mut knows).await.unwrap(), SaveOutcome::Unchanged);
    assert!(session.executor().sent().is_empty());
}

#[tokio::test]
async fn load_edge_builds_clean_typed_edge() {
    let session = GraphSession::new(
        RecordingExecutor::replying(vec![Ok(vec![stored_row()]), Ok(vec![])]),
        MapperConfig::new(),
    );

    let knows: Knows = session.load_edge("e1").await.unwrap().unwrap();
    assert_eq!(*knows.since(), 2019);
    assert_eq!(knows.edge().state(), EntityState::Clean);

    let lookup = &session.executor().sent()[0];
    assert_eq!(lookup.text(), "g.E(___ekey)");
    assert_eq!(
        lookup.parameter("___ekey"),
        Some(&TransferValue::Text("e1".to_string()))
    );

    let missing: Option<Knows> = session.load_edge("e2").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn load_edge_with_other_label_fails() {
    let mut row = stored_row();
    row["label"] = json!("owns");
    let session = GraphSession::new(
        RecordingExecutor::replying(vec![Ok(vec![row])]),
        MapperConfig::new(),
    );

    let err = session.load_edge::<Knows>("e1").await.err().unwrap();
    assert!(matches!(err, GraphError::TypeMismatch { .. }));
}

#[tokio::test]
async fn failed_save_keeps_pending_changes_and_reports_failure() {
    let diagnostics = Arc::new(CollectingDiagnostics::default());
    let session = GraphSession::new(
        RecordingExecutor::replying(vec![Err(GraphError::ExecutionError(
            "connection reset".to_string(),
        ))]),
        MapperConfig::new(),
    )
    .with_diagnostics(diagnostics.clone());
    let mut knows = new_knows(2020);

    let err = session.save(&mut knows).await.unwrap_err();

    assert!(matches!(err, GraphError::ExecutionError(_)));
    assert!(knows.edge().is_new());
    assert_eq!(knows.edge().changes().len(), 1);
    assert_eq!(diagnostics.queries.lock().unwrap().len(), 1);
    let failures = diagnostics.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].ends_with("connection reset"));
}

#[tokio::test]
async fn endpoints_resolve_through_session_identity_map() {
    let vertex = json!({ "id": "v1", "label": "person", "properties": {} });
    let session = GraphSession::new(
        RecordingExecutor::replying(vec![Ok(vec![stored_row()]), Ok(vec![vertex])]),
        MapperConfig::new(),
    );
    let knows: Knows = session.load_edge("e1").await.unwrap().unwrap();

    let first = knows.edge().in_vertex(&session).await.unwrap();
    let again = session.get_or_create::<VertexRef>("v1").await.unwrap();

    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.label(), Some("person"));
    assert_eq!(session.executor().sent().len(), 2);
    assert!(!knows.edge().is_dirty());
}

#[test]
fn sessions_work_from_blocking_code() {
    let session = GraphSession::new(RecordingExecutor::default(), MapperConfig::new());
    let mut knows = new_knows(1);

    let outcome = tokio_test::block_on(session.save(&mut knows)).unwrap();
    assert_eq!(outcome, SaveOutcome::Inserted);
}
