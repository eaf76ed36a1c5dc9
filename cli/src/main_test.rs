use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Map, Value, json};

use super::*;

// =============================================================================
// STUB SERVER
// =============================================================================

#[derive(Clone, Default)]
struct Store {
    rows: Arc<Mutex<Vec<Map<String, Value>>>>,
    fail_writes: bool,
}

async fn handle(State(store): State<Store>, Json(body): Json<Value>) -> Response {
    let sql = body["sql"].as_str().unwrap_or_default().to_owned();
    let params = body["params"].as_array().cloned().unwrap_or_default();
    let mut rows = store.rows.lock().unwrap();

    if body["kind"] != "mutation" {
        return Json(Value::Array(rows.iter().cloned().map(Value::Object).collect())).into_response();
    }
    if store.fail_writes {
        return (StatusCode::INTERNAL_SERVER_ERROR, "disk full").into_response();
    }
    let columns = sql
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map_or("", |(cols, _)| cols);
    rows.push(columns.split(", ").map(str::to_owned).zip(params).collect());
    Json(json!({"rowsAffected": 1, "lastInsertId": rows.len()})).into_response()
}

async fn spawn_stub(store: Store) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/query", post(handle)).with_state(store);
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/query")
}

fn seeded() -> Store {
    let store = Store::default();
    for (title, author) in [("Dune", "Herbert"), ("Emma", "Austen")] {
        let row = json!({"title": title, "author": author});
        if let Value::Object(map) = row {
            store.rows.lock().unwrap().push(map);
        }
    }
    store
}

async fn run_args(endpoint: &str, args: &[&str]) -> (Result<(), CliError>, String) {
    let base = ["databind", "--endpoint", endpoint];
    let argv = base.iter().chain(args).copied();
    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    let result = tokio::task::LocalSet::new().run_until(run(cli, &mut out)).await;
    (result, String::from_utf8(out).unwrap())
}

// =============================================================================
// ARGUMENTS
// =============================================================================

#[test]
fn assignments_split_on_first_equals() {
    assert_eq!(parse_assignment("title=Dune"), Ok(("title".to_owned(), "Dune".to_owned())));
    assert_eq!(parse_assignment("note=a=b"), Ok(("note".to_owned(), "a=b".to_owned())));
    assert_eq!(parse_assignment("title="), Ok(("title".to_owned(), String::new())));
    assert!(parse_assignment("title").is_err());
    assert!(parse_assignment("=Dune").is_err());
}

#[test]
fn create_parses_table_rule_and_values() {
    let cli = Cli::try_parse_from([
        "databind",
        "create",
        "--table",
        "books",
        "--required",
        "title",
        "title=Dune",
        "author=Herbert",
        "--endpoint",
        "http://db.local/query",
    ])
    .unwrap();
    assert_eq!(cli.endpoint, "http://db.local/query");
    let Command::Create(args) = cli.command else {
        panic!("expected create");
    };
    assert_eq!(args.table, "books");
    assert_eq!(args.required.as_deref(), Some("title"));
    assert_eq!(args.values.len(), 2);
    assert_eq!(args.values[1], ("author".to_owned(), "Herbert".to_owned()));
}

#[test]
fn create_requires_at_least_one_value() {
    assert!(Cli::try_parse_from(["databind", "create", "--table", "books"]).is_err());
}

// =============================================================================
// COMMANDS
// =============================================================================

#[tokio::test]
async fn list_prints_one_card_per_row() {
    let endpoint = spawn_stub(seeded()).await;
    let (result, out) = run_args(&endpoint, &["list", "--table", "books", "--fields", "title,author"]).await;
    result.unwrap();
    assert_eq!(out, "Dune\nHerbert\n\nEmma\nAusten\n(2 records)\n");
}

#[tokio::test]
async fn list_reports_unreachable_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/query", listener.local_addr().unwrap());
    drop(listener);

    let (result, _) = run_args(&endpoint, &["list", "--table", "books", "--fields", "title"]).await;
    assert!(matches!(result, Err(CliError::Data(DataError::Transport(_)))));
}

#[tokio::test]
async fn create_submits_and_prints_refreshed_list() {
    let store = seeded();
    let endpoint = spawn_stub(store.clone()).await;
    let (result, out) = run_args(&endpoint, &["create", "--table", "books", "title=Ulysses", "author=Joyce"]).await;
    result.unwrap();

    assert_eq!(
        out,
        "submit {\"title\":\"Ulysses\",\"author\":\"Joyce\"}\n\
         Dune\nHerbert\n\nEmma\nAusten\n\nUlysses\nJoyce\n(3 records)\n"
    );
    assert_eq!(store.rows.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn create_rejects_missing_required_field() {
    let store = seeded();
    let endpoint = spawn_stub(store.clone()).await;
    let (result, out) =
        run_args(&endpoint, &["create", "--table", "books", "--required", "title,author", "title=Ulysses"]).await;

    assert!(matches!(result, Err(CliError::Rejected(ref m)) if m == "Missing required fields: author"));
    assert_eq!(out, "error Missing required fields: author\n");
    assert_eq!(store.rows.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn create_reports_failed_insert() {
    let store = Store { fail_writes: true, ..seeded() };
    let endpoint = spawn_stub(store).await;
    let (result, out) = run_args(&endpoint, &["create", "--table", "books", "title=Ulysses"]).await;

    assert!(matches!(result, Err(CliError::Rejected(_))));
    assert_eq!(out, "error status 500: disk full\n");
}
