// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily health check snapshots.

use crosspost_core::{CrosspostError, HealthCheckStatus};
use rusqlite::params;

use crate::database::Database;

const HEALTH_COLUMNS: &str = "id, date_local, checked_at, overall_status, token_status,
     worker_status, kill_switch_status, critical_failure_status";

fn health_from_row(row: &rusqlite::Row<'_>) -> Result<HealthCheckStatus, rusqlite::Error> {
    Ok(HealthCheckStatus {
        id: row.get(0)?,
        date_local: row.get(1)?,
        checked_at: row.get(2)?,
        overall_status: row.get(3)?,
        token_status: row.get(4)?,
        worker_status: row.get(5)?,
        kill_switch_status: row.get(6)?,
        critical_failure_status: row.get(7)?,
    })
}

/// Record one health-gate evaluation.
pub async fn insert_health_check(
    db: &Database,
    status: &HealthCheckStatus,
) -> Result<(), CrosspostError> {
    let status = status.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO health_checks (id, date_local, checked_at, overall_status,
                     token_status, worker_status, kill_switch_status, critical_failure_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    status.id,
                    status.date_local,
                    status.checked_at,
                    status.overall_status,
                    status.token_status,
                    status.worker_status,
                    status.kill_switch_status,
                    status.critical_failure_status,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recent evaluation recorded for a gate cycle date.
pub async fn latest_health_check_for_date(
    db: &Database,
    date_local: &str,
) -> Result<Option<HealthCheckStatus>, CrosspostError> {
    let date_local = date_local.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HEALTH_COLUMNS} FROM health_checks
                 WHERE date_local = ?1 ORDER BY checked_at DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![date_local], health_from_row);
            match result {
                Ok(status) => Ok(Some(status)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
