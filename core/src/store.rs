//! SQLite persistence for power runs.
//!
//! RULE: Only store.rs talks to the database.
//! The power engine never writes; callers persist a finished report.

use crate::{
    design::Term,
    error::StudyResult,
    power::{PowerReport, PowerSummary, ReplicateRecord, Significance},
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct StudyStore {
    conn: Connection,
}

impl StudyStore {
    /// Open (or create) the results database at `path`.
    pub fn open(path: &str) -> StudyResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StudyResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StudyResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_power_runs.sql"))?;
        Ok(())
    }

    // ── Power runs ─────────────────────────────────────────────

    pub fn insert_power_run(
        &self,
        run_id: &str,
        version: &str,
        created_at: &str,
        report: &PowerReport,
    ) -> StudyResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let s = &report.summary;
        tx.execute(
            "INSERT INTO power_run
                (run_id, version, created_at, config_json, n_sims, n_converged, degenerate, summary_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                version,
                created_at,
                serde_json::to_string(&report.config)?,
                s.n_sims as i64,
                s.n_converged as i64,
                s.degenerate,
                serde_json::to_string(s)?,
            ],
        )?;

        for r in &report.replicates {
            tx.execute(
                "INSERT INTO replicate
                    (run_id, replicate_id, seed, n_teams, n_meetings_per_team,
                     n_items_per_meeting, alpha, converged, failure)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    run_id,
                    r.replicate_id as i64,
                    r.seed as i64,
                    r.n_teams as i64,
                    r.n_meetings_per_team as i64,
                    r.n_items_per_meeting as i64,
                    r.alpha,
                    r.converged,
                    r.failure,
                ],
            )?;
            for (position, flag) in r.flags.iter().enumerate() {
                tx.execute(
                    "INSERT INTO replicate_flag (run_id, replicate_id, position, term, significant)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        run_id,
                        r.replicate_id as i64,
                        position as i64,
                        serde_json::to_string(&flag.term)?,
                        flag.significant,
                    ],
                )?;
            }
        }
        tx.commit()?;
        log::debug!("store: saved run {run_id} ({} replicates)", report.replicates.len());
        Ok(())
    }

    pub fn power_run_summary(&self, run_id: &str) -> StudyResult<Option<PowerSummary>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT summary_json FROM power_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }

    pub fn power_run_count(&self) -> StudyResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM power_run", [], |row| row.get(0))?)
    }

    pub fn replicates_for_run(&self, run_id: &str) -> StudyResult<Vec<ReplicateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT replicate_id, seed, n_teams, n_meetings_per_team, n_items_per_meeting,
                    alpha, converged, failure
             FROM replicate WHERE run_id = ?1 ORDER BY replicate_id",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok(ReplicateRecord {
                replicate_id:        row.get::<_, i64>(0)? as usize,
                seed:                row.get::<_, i64>(1)? as u64,
                n_teams:             row.get::<_, i64>(2)? as usize,
                n_meetings_per_team: row.get::<_, i64>(3)? as usize,
                n_items_per_meeting: row.get::<_, i64>(4)? as usize,
                alpha:               row.get(5)?,
                flags:               Vec::new(),
                converged:           row.get(6)?,
                failure:             row.get(7)?,
            })
        })?;
        let mut replicates = rows.collect::<Result<Vec<_>, _>>()?;

        let mut flag_stmt = self.conn.prepare(
            "SELECT term, significant FROM replicate_flag
             WHERE run_id = ?1 AND replicate_id = ?2 ORDER BY position",
        )?;
        for r in &mut replicates {
            let flags = flag_stmt.query_map(params![run_id, r.replicate_id as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<bool>>(1)?))
            })?;
            for flag in flags {
                let (term_json, significant) = flag?;
                let term: Term = serde_json::from_str(&term_json)?;
                r.flags.push(Significance { term, significant });
            }
        }
        Ok(replicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let store = StudyStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.migrate().unwrap();
        assert_eq!(store.power_run_count().unwrap(), 0);
        assert!(store.power_run_summary("missing").unwrap().is_none());
    }

    #[test]
    fn open_accepts_memory_path_in_wal_mode() {
        let store = StudyStore::open(":memory:").unwrap();
        store.migrate().unwrap();
        assert_eq!(store.power_run_count().unwrap(), 0);
    }
}
