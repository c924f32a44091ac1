use rusqlite::Connection;
use tempfile::TempDir;

mod common;

#[test]
fn e2e_migrate_creates_schema_without_data() {
    let data_dir = TempDir::new().expect("temp dir");
    let db_path = common::db_path(&data_dir);

    let output = common::base_cmd(&db_path)
        .arg("migrate")
        .output()
        .expect("run migrate");
    assert!(output.status.success(), "{:?}", output);

    let conn = Connection::open(&db_path).expect("open db");
    let pages: i64 = conn
        .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
        .expect("count pages");
    assert_eq!(pages, 0);
}

#[test]
fn e2e_migrate_with_fixture_inserts_sample_data_once() {
    let data_dir = TempDir::new().expect("temp dir");
    let db_path = common::db_path(&data_dir);

    for _ in 0..2 {
        let output = common::base_cmd(&db_path)
            .arg("migrate")
            .arg("--fixture")
            .output()
            .expect("run migrate --fixture");
        assert!(output.status.success(), "{:?}", output);
    }

    let conn = Connection::open(&db_path).expect("open db");
    let slugs: Vec<String> = conn
        .prepare("SELECT slug FROM pages ORDER BY order_by")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(slugs, ["main_page_slug", "second_page_slug"]);

    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM pages_blocks", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 3);
}

#[test]
fn e2e_migrate_refuses_unknown_schema_version() {
    let data_dir = TempDir::new().expect("temp dir");
    let db_path = common::db_path(&data_dir);
    Connection::open(&db_path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 42;")
        .unwrap();

    let output = common::base_cmd(&db_path)
        .arg("migrate")
        .output()
        .expect("run migrate");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--reset"), "{stderr}");

    let output = common::base_cmd(&db_path)
        .arg("--reset")
        .arg("migrate")
        .output()
        .expect("run migrate --reset");
    assert!(output.status.success(), "{:?}", output);
}
