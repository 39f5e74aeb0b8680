use anyhow::Result;
use rusqlite::Connection;

const DB_PATH: &str = "data/brannock.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS threads (
            id           INTEGER PRIMARY KEY,
            url          TEXT UNIQUE NOT NULL,
            title        TEXT,
            author       TEXT,
            raw_json     TEXT NOT NULL,
            fetched_at   TEXT NOT NULL DEFAULT (datetime('now')),
            processed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_threads_processed ON threads(processed_at);

        CREATE TABLE IF NOT EXISTS subthreads (
            id          INTEGER PRIMARY KEY,
            thread_id   INTEGER NOT NULL REFERENCES threads(id),
            comment_id  TEXT UNIQUE NOT NULL,
            brannock    TEXT NOT NULL,
            author      TEXT NOT NULL,
            created_utc REAL NOT NULL,
            reply_count INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_subthreads_thread ON subthreads(thread_id);
        CREATE INDEX IF NOT EXISTS idx_subthreads_brannock ON subthreads(brannock);

        -- One row per accepted size report. A reply listing the same last
        -- twice legitimately yields two rows, so no uniqueness here;
        -- reprocessing clears a thread's rows first instead.
        CREATE TABLE IF NOT EXISTS size_records (
            id                    INTEGER PRIMARY KEY,
            thread_id             INTEGER NOT NULL REFERENCES threads(id),
            subthread_comment_id  TEXT NOT NULL REFERENCES subthreads(comment_id),
            comment_id            TEXT NOT NULL,
            author                TEXT NOT NULL,
            created_utc           REAL NOT NULL,
            last                  TEXT,
            text                  TEXT NOT NULL,
            size                  REAL NOT NULL,
            intl                  TEXT NOT NULL CHECK(intl IN ('US','UK','EU')),
            width                 TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_thread ON size_records(thread_id);
        CREATE INDEX IF NOT EXISTS idx_records_subthread ON size_records(subthread_comment_id);
        CREATE INDEX IF NOT EXISTS idx_records_last ON size_records(last);
        ",
    )?;
    Ok(())
}

// ── Threads ──

pub struct ThreadRow {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub raw_json: String,
}

/// Insert or refresh a thread export. Refreshing clears the processed mark
/// so the next `process` pass picks the thread up again.
pub fn upsert_thread(
    conn: &Connection,
    url: &str,
    title: Option<&str>,
    author: Option<&str>,
    raw_json: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO threads (url, title, author, raw_json) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(url) DO UPDATE SET
             title = excluded.title,
             author = excluded.author,
             raw_json = excluded.raw_json,
             fetched_at = datetime('now'),
             processed_at = NULL",
        rusqlite::params![url, title, author, raw_json],
    )?;
    let id = conn.query_row("SELECT id FROM threads WHERE url = ?1", [url], |row| {
        row.get(0)
    })?;
    Ok(id)
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<ThreadRow>> {
    let sql = format!(
        "SELECT id, url, title, author, raw_json
         FROM threads
         WHERE processed_at IS NULL
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ThreadRow {
                id: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                author: row.get(3)?,
                raw_json: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Extracted data ──

pub struct SubthreadRow {
    pub thread_id: i64,
    pub comment_id: String,
    pub brannock: String,
    pub author: String,
    pub created_utc: f64,
    pub reply_count: i64,
}

pub struct SizeRecordRow {
    pub thread_id: i64,
    pub subthread_comment_id: String,
    pub comment_id: String,
    pub author: String,
    pub created_utc: f64,
    pub last: Option<String>,
    pub text: String,
    pub size: f64,
    pub intl: String,
    pub width: String,
}

/// Replace a thread's extracted rows and stamp it processed.
pub fn save_thread_records(
    conn: &Connection,
    thread_id: i64,
    subthreads: &[SubthreadRow],
    records: &[SizeRecordRow],
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        tx.execute(
            "DELETE FROM size_records WHERE thread_id = ?1",
            [thread_id],
        )?;
        tx.execute("DELETE FROM subthreads WHERE thread_id = ?1", [thread_id])?;

        let mut s_stmt = tx.prepare(
            "INSERT INTO subthreads
             (thread_id, comment_id, brannock, author, created_utc, reply_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for s in subthreads {
            s_stmt.execute(rusqlite::params![
                s.thread_id,
                s.comment_id,
                s.brannock,
                s.author,
                s.created_utc,
                s.reply_count,
            ])?;
        }

        let mut r_stmt = tx.prepare(
            "INSERT INTO size_records
             (thread_id, subthread_comment_id, comment_id, author, created_utc,
              last, text, size, intl, width)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for r in records {
            r_stmt.execute(rusqlite::params![
                r.thread_id,
                r.subthread_comment_id,
                r.comment_id,
                r.author,
                r.created_utc,
                r.last,
                r.text,
                r.size,
                r.intl,
                r.width,
            ])?;
        }

        tx.execute(
            "UPDATE threads SET processed_at = datetime('now') WHERE id = ?1",
            [thread_id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

// ── Sizes ──

pub struct SizeCountRow {
    pub brannock: String,
    pub subthreads: i64,
    pub replies: i64,
    pub records: i64,
}

pub fn fetch_sizes(conn: &Connection) -> Result<Vec<SizeCountRow>> {
    let mut stmt = conn.prepare(
        "SELECT s.brannock,
                COUNT(*),
                SUM(s.reply_count),
                COALESCE(SUM(rc.n), 0)
         FROM subthreads s
         LEFT JOIN (
             SELECT subthread_comment_id, COUNT(*) AS n
             FROM size_records
             GROUP BY subthread_comment_id
         ) rc ON rc.subthread_comment_id = s.comment_id
         GROUP BY s.brannock
         ORDER BY CAST(s.brannock AS REAL), s.brannock",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SizeCountRow {
                brannock: row.get(0)?,
                subthreads: row.get(1)?,
                replies: row.get(2)?,
                records: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Overview ──

pub struct OverviewRow {
    pub last: String,
    pub reports: i64,
    pub mean_size: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub widths: String,
    pub intls: String,
}

/// Per-last aggregates over accepted records, optionally narrowed to one
/// Brannock size's subthreads.
pub fn fetch_overview(
    conn: &Connection,
    size: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = vec!["r.last IS NOT NULL".to_string()];
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(s) = size {
        conditions.push(format!("s.brannock = ?{}", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }

    let sql = format!(
        "SELECT r.last, COUNT(*), ROUND(AVG(r.size), 2), MIN(r.size), MAX(r.size),
                GROUP_CONCAT(DISTINCT r.width), GROUP_CONCAT(DISTINCT r.intl)
         FROM size_records r
         JOIN subthreads s ON s.comment_id = r.subthread_comment_id
         WHERE {}
         GROUP BY r.last
         ORDER BY COUNT(*) DESC, r.last
         LIMIT {}",
        conditions.join(" AND "),
        limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                last: row.get(0)?,
                reports: row.get(1)?,
                mean_size: row.get(2)?,
                min_size: row.get(3)?,
                max_size: row.get(4)?,
                widths: row.get(5)?,
                intls: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub threads: usize,
    pub processed: usize,
    pub subthreads: usize,
    pub records: usize,
    pub latest_report: Option<f64>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let threads: usize = conn.query_row("SELECT COUNT(*) FROM threads", [], |r| r.get(0))?;
    let processed: usize = conn.query_row(
        "SELECT COUNT(*) FROM threads WHERE processed_at IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let subthreads: usize = conn.query_row("SELECT COUNT(*) FROM subthreads", [], |r| r.get(0))?;
    let records: usize = conn.query_row("SELECT COUNT(*) FROM size_records", [], |r| r.get(0))?;
    let latest_report: Option<f64> =
        conn.query_row("SELECT MAX(created_utc) FROM size_records", [], |r| {
            r.get(0)
        })?;
    Ok(Stats {
        threads,
        processed,
        subthreads,
        records,
        latest_report,
    })
}
