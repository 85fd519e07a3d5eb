use rusqlite::{Connection, Result};

/// Initialise the request-log table. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS request_logs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at      TEXT NOT NULL,
            account_id      TEXT NOT NULL,
            account_name    TEXT NOT NULL,
            model           TEXT NOT NULL,
            model_id        TEXT NOT NULL,
            conversation_id TEXT NOT NULL,
            success         INTEGER NOT NULL,
            status_code     INTEGER,
            error           TEXT,
            duration_ms     INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_logs_created
            ON request_logs(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_logs_account
            ON request_logs(account_id);
        CREATE INDEX IF NOT EXISTS idx_logs_model
            ON request_logs(model);
        CREATE INDEX IF NOT EXISTS idx_logs_success
            ON request_logs(success);",
    )
}
