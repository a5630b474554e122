//! Schema tests

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::storage::database::Database;

    fn table_count(db: &Database, name: &str) -> i32 {
        db.conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .expect("Failed to query sqlite_master")
    }

    #[test]
    fn test_preferences_table_created() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::new(&temp_dir.path().join("nested").join("test.db"))
            .expect("Failed to create database");
        assert_eq!(table_count(&db, "preferences"), 1);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        {
            let db = Database::new(&db_path).expect("first open");
            db.conn()
                .execute(
                    "INSERT INTO preferences (key, value, updated_at) VALUES ('pass', 'x', 0)",
                    [],
                )
                .expect("insert");
        }

        let db = Database::new(&db_path).expect("second open");
        let value: String = db
            .conn()
            .query_row("SELECT value FROM preferences WHERE key = 'pass'", [], |row| {
                row.get(0)
            })
            .expect("row survives reopen");
        assert_eq!(value, "x");
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().expect("in-memory db");
        assert_eq!(table_count(&db, "preferences"), 1);
    }
}
