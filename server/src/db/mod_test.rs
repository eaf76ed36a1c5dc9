use super::*;

async fn memory_pool() -> SqlitePool {
    // One connection: every `sqlite::memory:` connection is its own database.
    let pool = init_pool("sqlite::memory:", 1).await.unwrap();
    sqlx::query("CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, author TEXT, price REAL, cover BLOB)")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

fn insert(title: &str, author: Value) -> Statement {
    Statement::mutation("INSERT INTO books (title, author) VALUES (?, ?)", vec![title.into(), author])
}

#[tokio::test]
async fn mutation_returns_ack() {
    let pool = memory_pool().await;
    let outcome = execute(&pool, &insert("Dune", "Herbert".into())).await.unwrap();
    assert_eq!(outcome, Outcome::Ack(MutationAck { rows_affected: 1, last_insert_id: Some(1) }));

    let outcome = execute(&pool, &insert("Emma", "Austen".into())).await.unwrap();
    assert_eq!(outcome, Outcome::Ack(MutationAck { rows_affected: 1, last_insert_id: Some(2) }));
}

#[tokio::test]
async fn query_preserves_column_order_and_storage_classes() {
    let pool = memory_pool().await;
    execute(&pool, &insert("Dune", Value::Null)).await.unwrap();
    sqlx::query("UPDATE books SET price = 9.5").execute(&pool).await.unwrap();

    let Outcome::Rows(rows) = execute(&pool, &Statement::query("SELECT * FROM books", vec![])).await.unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 1);
    let fields: Vec<&str> = rows[0].fields().collect();
    assert_eq!(fields, vec!["id", "title", "author", "price", "cover"]);
    assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    assert_eq!(rows[0].get("title"), Some(&Value::from("Dune")));
    assert_eq!(rows[0].get("author"), Some(&Value::Null));
    assert_eq!(rows[0].get("price"), Some(&Value::Real(9.5)));
}

#[tokio::test]
async fn blobs_decode_as_lossy_text() {
    let pool = memory_pool().await;
    sqlx::query("INSERT INTO books (title, cover) VALUES ('x', X'68690AFF')")
        .execute(&pool)
        .await
        .unwrap();

    let Outcome::Rows(rows) = execute(&pool, &Statement::query("SELECT cover FROM books", vec![])).await.unwrap()
    else {
        panic!("expected rows");
    };
    assert_eq!(rows[0].get("cover"), Some(&Value::from("hi\n\u{FFFD}")));
}

#[tokio::test]
async fn params_are_bound_not_spliced() {
    let pool = memory_pool().await;
    execute(&pool, &insert("Robert'); DROP TABLE books;--", "x".into())).await.unwrap();

    let select = Statement::query("SELECT title FROM books WHERE author = ?", vec!["x".into()]);
    let Outcome::Rows(rows) = execute(&pool, &select).await.unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(rows[0].get("title"), Some(&Value::from("Robert'); DROP TABLE books;--")));
}

#[tokio::test]
async fn empty_result_is_empty_rows() {
    let pool = memory_pool().await;
    let outcome = execute(&pool, &Statement::query("SELECT * FROM books", vec![])).await.unwrap();
    assert_eq!(outcome, Outcome::Rows(Vec::new()));
}

#[tokio::test]
async fn bad_sql_is_an_error() {
    let pool = memory_pool().await;
    let result = execute(&pool, &Statement::query("SELECT * FROM nowhere", vec![])).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("no such table"), "{err}");
}
