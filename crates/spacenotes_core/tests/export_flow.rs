use chrono::{Local, Utc};
use rusqlite::{params, Connection};
use spacenotes_core::db::open_source_db_in_memory;
use spacenotes_core::{
    export_database, BuildError, ExportError, ExportService, ExportSummary, RepoError,
    ReportRenderer, SourceRepository, SqliteSourceRepository,
};
use std::path::Path;

const SOURCE_SCHEMA: &str = "
    CREATE TABLE notes (
        _id INTEGER PRIMARY KEY,
        parent_id INTEGER,
        created INTEGER NOT NULL,
        timestamp INTEGER NOT NULL,
        text TEXT
    );
    CREATE TABLE streams (
        _id INTEGER PRIMARY KEY,
        stream_name TEXT
    );
    CREATE TABLE notes_streams (
        note_id INTEGER NOT NULL,
        stream_id INTEGER NOT NULL
    );
";

// 13.09.2020 12:26 UTC
const T0: i64 = 1_600_000_000_000;

fn seed_schema(conn: &Connection) {
    conn.execute_batch(SOURCE_SCHEMA).unwrap();
}

fn insert_note(conn: &Connection, id: i64, parent_id: i64, created: i64, text: &str) {
    conn.execute(
        "INSERT INTO notes (_id, parent_id, created, timestamp, text) VALUES (?1, ?2, ?3, ?3, ?4);",
        params![id, parent_id, created, text],
    )
    .unwrap();
}

fn insert_space(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO streams (_id, stream_name) VALUES (?1, ?2);",
        params![id, name],
    )
    .unwrap();
}

fn insert_link(conn: &Connection, note_id: i64, stream_id: i64) {
    conn.execute(
        "INSERT INTO notes_streams (note_id, stream_id) VALUES (?1, ?2);",
        params![note_id, stream_id],
    )
    .unwrap();
}

fn seed_file(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    seed_schema(&conn);
    conn
}

#[test]
fn fetch_notes_orders_by_creation_descending() {
    let conn = open_source_db_in_memory().unwrap();
    seed_schema(&conn);
    insert_note(&conn, 1, -1, T0, "old");
    insert_note(&conn, 2, -1, T0 + 2_000, "new");
    insert_note(&conn, 3, 1, T0 + 1_000, "reply");

    let repo = SqliteSourceRepository::new(&conn);
    let ids: Vec<i64> = repo.fetch_notes().unwrap().iter().map(|row| row.id).collect();

    assert_eq!(ids, [2, 3, 1]);
}

#[test]
fn null_parent_and_text_load_as_root_and_empty() {
    let conn = open_source_db_in_memory().unwrap();
    seed_schema(&conn);
    conn.execute(
        "INSERT INTO notes (_id, parent_id, created, timestamp, text) VALUES (1, NULL, 5, 5, NULL);",
        [],
    )
    .unwrap();

    let repo = SqliteSourceRepository::new(&conn);
    let rows = repo.fetch_notes().unwrap();

    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_note());
    assert_eq!(rows[0].text, "");
}

#[test]
fn service_export_renders_round_trip_scenario() {
    let conn = open_source_db_in_memory().unwrap();
    seed_schema(&conn);
    insert_space(&conn, 1, "Work");
    insert_note(&conn, 1, -1, T0, "Buy milk");
    insert_note(&conn, 2, 1, T0 + 60_000, "done");
    insert_link(&conn, 1, 1);

    let service = ExportService::new(SqliteSourceRepository::new(&conn));
    let mut sink = Vec::new();
    let summary = service.export(&mut sink, Utc).unwrap();

    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "Space<Work>\n// Notes: 1\n\n13.09.2020 12:26\nBuy milk\nUpd (13.09.2020 12:27)\ndone\n\n\n"
    );
    assert_eq!(
        summary,
        ExportSummary {
            spaces: 1,
            notes: 1,
            comments: 1
        }
    );
}

#[test]
fn summary_counts_include_unplaced_notes() {
    let conn = open_source_db_in_memory().unwrap();
    seed_schema(&conn);
    insert_space(&conn, 1, "Work");
    insert_space(&conn, 2, "Home");
    insert_note(&conn, 1, -1, T0, "placed");
    insert_note(&conn, 2, -1, T0 + 1, "orphan");
    insert_note(&conn, 3, 2, T0 + 2, "orphan reply");
    insert_link(&conn, 1, 1);

    let service = ExportService::new(SqliteSourceRepository::new(&conn));
    let mut sink = Vec::new();
    let summary = service.export(&mut sink, Utc).unwrap();
    let report = String::from_utf8(sink).unwrap();

    assert_eq!(summary.to_string(), "Spaces: 2\nNotes: 2\nComments: 1");
    assert!(report.contains("placed"));
    assert!(!report.contains("orphan"));
}

#[test]
fn export_database_writes_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("notes.db");
    let out_path = dir.path().join("report.txt");
    {
        let conn = seed_file(&db_path);
        insert_space(&conn, 1, "Work");
        insert_note(&conn, 1, -1, T0, "Buy milk");
        insert_note(&conn, 2, 1, T0 + 60_000, "done");
        insert_link(&conn, 1, 1);
    }

    let summary = export_database(&db_path, &out_path).unwrap();

    let local = ReportRenderer::new(Local);
    let expected = format!(
        "Space<Work>\n// Notes: 1\n\n{}\nBuy milk\nUpd ({})\ndone\n\n\n",
        local.format_timestamp(T0).unwrap(),
        local.format_timestamp(T0 + 60_000).unwrap()
    );
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), expected);
    assert_eq!(summary.comments, 1);
}

#[test]
fn empty_database_produces_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("empty.db");
    let out_path = dir.path().join("report.txt");
    drop(seed_file(&db_path));

    let summary = export_database(&db_path, &out_path).unwrap();

    assert_eq!(summary, ExportSummary::default());
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "");
}

#[test]
fn export_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("empty.db");
    let out_path = dir.path().join("report.txt");
    drop(seed_file(&db_path));
    std::fs::write(&out_path, "stale contents").unwrap();

    export_database(&db_path, &out_path).unwrap();

    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "");
}

#[test]
fn missing_database_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("absent.db");

    let err = export_database(&db_path, dir.path().join("report.txt")).unwrap_err();

    assert!(matches!(err, ExportError::Connection { .. }));
    assert!(err.to_string().contains("cannot open database file"));
    assert!(!db_path.exists());
}

#[test]
fn missing_source_table_is_a_query_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("partial.db");
    {
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE notes (_id INTEGER, parent_id INTEGER, created INTEGER, timestamp INTEGER, text TEXT);")
            .unwrap();
    }

    let err = export_database(&db_path, dir.path().join("report.txt")).unwrap_err();

    assert!(matches!(err, ExportError::Query(RepoError::Db(_))));
    assert!(err.to_string().contains("no such table: streams"));
}

#[test]
fn source_views_export_like_tables() {
    let conn = open_source_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE raw_notes (_id INTEGER, parent_id INTEGER, created INTEGER, timestamp INTEGER, text TEXT);
         CREATE TABLE raw_streams (_id INTEGER, stream_name TEXT);
         CREATE TABLE raw_links (note_id INTEGER, stream_id INTEGER);
         CREATE VIEW notes AS SELECT * FROM raw_notes;
         CREATE VIEW streams AS SELECT * FROM raw_streams;
         CREATE VIEW notes_streams AS SELECT * FROM raw_links;
         INSERT INTO raw_notes VALUES (1, -1, 1600000000000, 1600000000000, 'Buy milk');
         INSERT INTO raw_streams VALUES (1, 'Work');
         INSERT INTO raw_links VALUES (1, 1);",
    )
    .unwrap();

    let service = ExportService::new(SqliteSourceRepository::new(&conn));
    let mut sink = Vec::new();
    service.export(&mut sink, Utc).unwrap();

    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "Space<Work>\n// Notes: 1\n\n13.09.2020 12:26\nBuy milk\n\n\n"
    );
}

#[test]
fn real_and_text_storage_convert_to_row_fields() {
    let conn = open_source_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE notes (_id INTEGER, parent_id INTEGER, created REAL, timestamp TEXT, text);
         CREATE TABLE streams (_id TEXT, stream_name);
         CREATE TABLE notes_streams (note_id REAL, stream_id TEXT);
         INSERT INTO notes VALUES (1, -1, 1600000000000.0, '1600000000000', 42);
         INSERT INTO streams VALUES ('7', 2024);
         INSERT INTO notes_streams VALUES (1.0, '7');",
    )
    .unwrap();

    let repo = SqliteSourceRepository::new(&conn);
    let notes = repo.fetch_notes().unwrap();
    assert_eq!(notes[0].created_at, T0);
    assert_eq!(notes[0].modified_at, T0);
    assert_eq!(notes[0].text, "42");

    let service = ExportService::new(repo);
    let mut sink = Vec::new();
    let summary = service.export(&mut sink, Utc).unwrap();

    assert_eq!(summary.notes, 1);
    assert_eq!(
        String::from_utf8(sink).unwrap(),
        "Space<2024>\n// Notes: 1\n\n13.09.2020 12:26\n42\n\n\n"
    );
}

#[test]
fn out_of_range_timestamp_aborts_before_output_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("far-future.db");
    let out_path = dir.path().join("report.txt");
    {
        let conn = seed_file(&db_path);
        insert_space(&conn, 1, "Work");
        insert_note(&conn, 1, -1, i64::MAX, "never");
        insert_link(&conn, 1, 1);
    }

    let err = export_database(&db_path, &out_path).unwrap_err();

    assert!(matches!(
        err,
        ExportError::InvalidTimestamp {
            entry_id: 1,
            millis: i64::MAX
        }
    ));
    assert!(!out_path.exists());
}

#[test]
fn dangling_parent_aborts_before_output_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("broken.db");
    let out_path = dir.path().join("report.txt");
    {
        let conn = seed_file(&db_path);
        insert_note(&conn, 1, -1, T0, "note");
        insert_note(&conn, 2, 99, T0 + 1, "lost reply");
    }

    let err = export_database(&db_path, &out_path).unwrap_err();

    assert!(matches!(
        err,
        ExportError::DataIntegrity(BuildError::MissingParentNote {
            comment_id: 2,
            parent_id: 99
        })
    ));
    assert!(!out_path.exists());
}

#[test]
fn unwritable_output_is_an_output_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("empty.db");
    drop(seed_file(&db_path));
    let out_path = dir.path().join("missing-dir").join("report.txt");

    let err = export_database(&db_path, &out_path).unwrap_err();

    assert!(matches!(err, ExportError::OutputOpen { .. }));
    assert!(err.to_string().contains("cannot write output file"));
}
