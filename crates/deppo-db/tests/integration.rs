use deppo_db::{DbSettings, FromRow, ProcedureCatalog, QueryParams, Row, SqlRepository};

#[derive(Debug, Clone, PartialEq)]
struct Depot {
    id: i64,
    name: String,
    capacity: i64,
}

impl FromRow for Depot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            capacity: row.get("capacity")?,
        })
    }
}

fn seeded_repo() -> (tempfile::TempDir, SqlRepository<Depot>) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let path = dir.path().join("depots.db");
    let repo = SqlRepository::new(DbSettings::new(path.to_string_lossy()));

    let seeded = repo.execute_query(
        "CREATE TABLE depots (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            capacity INTEGER NOT NULL
         );
         INSERT INTO depots (id, name, capacity) VALUES
            (1, 'north', 120),
            (2, 'south', 80),
            (3, 'east', 200);",
    );
    assert!(seeded.success, "seed failed: {:?}", seeded.message);

    (dir, repo)
}

#[test]
fn get_returns_matching_rows() {
    let (_dir, repo) = seeded_repo();

    let result = repo.get(
        "SELECT id, name, capacity FROM depots WHERE capacity >= :min ORDER BY id",
        &QueryParams::new().add(":min", 100_i64),
    );

    assert!(result.success);
    let names: Vec<String> = result
        .data
        .expect("success carries data")
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["north", "east"]);
}

#[test]
fn get_all_returns_every_row() {
    let (_dir, repo) = seeded_repo();

    let result = repo.get_all("SELECT id, name, capacity FROM depots ORDER BY id");
    assert_eq!(result.data.map(|rows| rows.len()), Some(3));
}

#[test]
fn get_by_id_errors_when_no_row_matches() {
    let (_dir, repo) = seeded_repo();
    let query = "SELECT id, name, capacity FROM depots WHERE id = :id";

    let found = repo.get_by_id(query, &QueryParams::new().add(":id", 2_i64));
    assert_eq!(
        found.data,
        Some(Depot {
            id: 2,
            name: "south".to_string(),
            capacity: 80
        })
    );

    let missing = repo.get_by_id(query, &QueryParams::new().add(":id", 99_i64));
    assert!(!missing.success);
    assert_eq!(missing.data, None);
    assert_eq!(missing.message.as_deref(), Some("Query returned no rows"));
}

#[test]
fn first_or_default_succeeds_without_rows() {
    let (_dir, repo) = seeded_repo();
    let query = "SELECT id, name, capacity FROM depots WHERE name = :name";

    let missing = repo.first_or_default(query, &QueryParams::new().add(":name", "west".to_string()));
    assert!(missing.success);
    assert_eq!(missing.data, Some(None));

    let found = repo.first_or_default(query, &QueryParams::new().add(":name", "east".to_string()));
    assert_eq!(found.data.flatten().map(|d| d.id), Some(3));
}

#[test]
fn invalid_query_returns_driver_message() {
    let (_dir, repo) = seeded_repo();

    let result = repo.get_all("SELECT id, name, capacity FROM warehouses");
    assert!(!result.success);
    assert_eq!(result.data, None);
    let message = result.message.expect("error carries a message");
    assert!(message.contains("no such table: warehouses"), "{message}");
}

#[test]
fn unreachable_database_returns_error_envelope() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let path = dir.path().join("no-such-dir").join("depots.db");
    let repo: SqlRepository<Depot> = SqlRepository::new(DbSettings::new(path.to_string_lossy()));

    let read = repo.get_all("SELECT id, name, capacity FROM depots");
    assert!(!read.success);
    let message = read.message.expect("error carries a message");
    assert!(message.starts_with("failed to open database connection"), "{message}");

    let write = repo.execute_query("DELETE FROM depots");
    assert!(!write.success);
}

#[test]
fn failed_command_rolls_back_earlier_statements() {
    let (_dir, repo) = seeded_repo();

    let result = repo.execute_query_with(
        "UPDATE depots SET capacity = capacity + :delta;
         INSERT INTO depots (id, name, capacity) VALUES (4, 'north', 10);",
        &QueryParams::new().add(":delta", 1_000_i64),
    );
    assert!(!result.success);
    let message = result.message.expect("error carries a message");
    assert!(message.contains("UNIQUE constraint failed"), "{message}");

    let capacities = repo.get_all("SELECT id, name, capacity FROM depots ORDER BY id");
    let capacities: Vec<i64> = capacities
        .data
        .expect("read should succeed")
        .into_iter()
        .map(|d| d.capacity)
        .collect();
    assert_eq!(capacities, vec![120, 80, 200], "update must be rolled back");
}

#[test]
fn repository_survives_repeated_calls() {
    let (_dir, repo) = seeded_repo();

    for round in 0..25_i64 {
        let updated = repo.execute_query_with(
            "UPDATE depots SET capacity = :capacity WHERE id = 1",
            &QueryParams::new().add(":capacity", round),
        );
        assert!(updated.success, "round {round}: {:?}", updated.message);

        let read = repo.get_by_id(
            "SELECT id, name, capacity FROM depots WHERE id = 1",
            &QueryParams::new(),
        );
        assert_eq!(read.data.map(|d| d.capacity), Some(round));
    }
}

#[test]
fn procedures_run_by_name() {
    let (_dir, repo) = seeded_repo();
    let repo = repo.with_procedures(
        ProcedureCatalog::new()
            .with_procedure(
                "sp_resize_depot",
                "UPDATE depots SET capacity = :capacity WHERE name = :name;",
            )
            .with_procedure(
                "sp_depots_over",
                "CREATE TEMP TABLE IF NOT EXISTS scratch (v INTEGER);
                 SELECT id, name, capacity FROM depots WHERE capacity > :min ORDER BY capacity DESC;",
            ),
    );

    let resized = repo.execute_procedure_with(
        "sp_resize_depot",
        &QueryParams::new()
            .add(":name", "south".to_string())
            .add(":capacity", 500_i64),
    );
    assert!(resized.success, "{:?}", resized.message);

    let big = repo.get_with_procedure("sp_depots_over", &QueryParams::new().add(":min", 150_i64));
    let names: Vec<String> = big
        .data
        .expect("procedure should return rows")
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["south", "east"]);

    let unknown = repo.execute_procedure("sp_drop_everything");
    assert_eq!(
        unknown.message.as_deref(),
        Some("procedure 'sp_drop_everything' is not defined")
    );
    assert!(!unknown.success);
}

#[test]
fn scalar_repository_reads_first_column() {
    let (dir, _repo) = seeded_repo();
    let path = dir.path().join("depots.db");
    let counts: SqlRepository<i64> = SqlRepository::new(DbSettings::new(path.to_string_lossy()));

    let total = counts.get_by_id("SELECT SUM(capacity) FROM depots", &QueryParams::new());
    assert_eq!(total.data, Some(400));
}

#[test]
fn insert_then_select_returns_new_row_id() {
    let (dir, _repo) = seeded_repo();
    let path = dir.path().join("depots.db");
    let ids: SqlRepository<i64> = SqlRepository::new(DbSettings::new(path.to_string_lossy()));

    let created = ids.get_by_id(
        "INSERT INTO depots (name, capacity) VALUES (:name, :capacity);
         SELECT last_insert_rowid();",
        &QueryParams::new()
            .add(":name", "west".to_string())
            .add(":capacity", 60_i64),
    );
    assert!(created.success, "{:?}", created.message);
    assert_eq!(created.data, Some(4));
}

#[test]
fn multi_statement_read_returns_first_result_set() {
    let (_dir, repo) = seeded_repo();

    let updated = repo.get(
        "UPDATE depots SET capacity = 99 WHERE id = 1;
         SELECT id, name, capacity FROM depots WHERE id = 1;
         SELECT id, name, capacity FROM depots WHERE id = 2;",
        &QueryParams::new(),
    );
    assert!(updated.success, "{:?}", updated.message);
    assert_eq!(
        updated.data,
        Some(vec![Depot {
            id: 1,
            name: "north".to_string(),
            capacity: 99
        }])
    );

    let taken = repo.first_or_default(
        "SELECT id, name, capacity FROM depots WHERE id = :id;
         DELETE FROM depots WHERE id = :id;",
        &QueryParams::new().add(":id", 3_i64),
    );
    assert_eq!(taken.data.flatten().map(|d| d.name), Some("east".to_string()));

    let remaining = repo.get_all("SELECT id, name, capacity FROM depots ORDER BY id");
    assert_eq!(remaining.data.map(|rows| rows.len()), Some(2));
}

#[test]
fn blank_query_reports_missing_statement() {
    let (_dir, repo) = seeded_repo();

    let read = repo.get("", &QueryParams::new());
    assert!(!read.success);
    assert_eq!(read.message.as_deref(), Some("query contains no SQL statements"));

    let single = repo.get_by_id("   ", &QueryParams::new());
    assert_eq!(single.message.as_deref(), Some("query contains no SQL statements"));

    let write = repo.execute_query(" ; ");
    assert!(!write.success);
    assert_eq!(write.message.as_deref(), Some("query contains no SQL statements"));
}

#[test]
fn bare_parameter_names_bind_to_prefixed_placeholders() {
    let (_dir, repo) = seeded_repo();

    let big = repo.get(
        "SELECT id, name, capacity FROM depots WHERE capacity >= :min ORDER BY id",
        &QueryParams::new().add("min", 100_i64),
    );
    assert_eq!(big.data.map(|rows| rows.len()), Some(2));

    let south = repo.get_by_id(
        "SELECT id, name, capacity FROM depots WHERE id = @id",
        &QueryParams::new().add("id", 2_i64),
    );
    assert_eq!(south.data.map(|d| d.name), Some("south".to_string()));
}

#[test]
fn commands_report_affected_rows() {
    let (_dir, repo) = seeded_repo();

    let bumped = repo.execute_query("UPDATE depots SET capacity = capacity + 1 WHERE capacity < 150");
    assert!(bumped.success);
    assert_eq!(bumped.message.as_deref(), Some("2 row(s) affected"));

    let missing = repo.first_or_default(
        "SELECT id, name, capacity FROM depots WHERE id = 42",
        &QueryParams::new(),
    );
    assert!(missing.success);
    assert_eq!(missing.message.as_deref(), Some("no matching row"));
}
