//! Persisted prediction history.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type};
use serde::Serialize;
use uuid::Uuid;

use super::Pool;
use crate::detect::PredictionResult;
use crate::model::resolver::{ANOMALY, NORMAL};

/// One stored prediction.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRecord {
    pub id: Uuid,
    pub prediction: String,
    pub confidence: f64,
    pub class_id: Option<i64>,
    pub probabilities: Vec<f64>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Detections attributed to one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserCount {
    pub user_id: String,
    pub count: i64,
    /// Share of `DetectionStats::total`, 0-100.
    pub percentage: f64,
}

/// Aggregate counts over the detection history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStats {
    pub total: i64,
    /// Count per label. `normal` and `anomaly` are always present.
    pub by_prediction: BTreeMap<String, i64>,
    /// Most active users first.
    pub by_user: Vec<UserCount>,
}

fn label_count(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, i64)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn conversion_error<E>(column: usize, ty: Type) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
}

/// Writes and reads the `detections` table.
#[derive(Clone)]
pub struct DetectionLog {
    pool: Pool,
}

impl DetectionLog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Store a successful prediction for `user_id`.
    pub fn record(&self, result: &PredictionResult, user_id: &str) -> Result<Uuid> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4();
        let probabilities_json = serde_json::to_string(&result.probabilities)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        conn.execute(
            "INSERT INTO detections
                 (id, prediction, confidence, user_id, created_at, class_id, probabilities_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                result.label,
                result.confidence,
                user_id,
                created_at,
                result.predicted_class_id as i64,
                probabilities_json
            ],
        )
        .context("Failed to save detection")?;

        Ok(id)
    }

    /// Most recent detections first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<DetectionRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, prediction, confidence, class_id, probabilities_json, user_id, created_at
             FROM detections ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id_str: String = row.get(0)?;
            let probabilities_str: String = row.get(4)?;
            let created_str: String = row.get(6)?;

            Ok(DetectionRecord {
                id: Uuid::parse_str(&id_str).map_err(conversion_error(0, Type::Text))?,
                prediction: row.get(1)?,
                confidence: row.get(2)?,
                class_id: row.get(3)?,
                probabilities: serde_json::from_str(&probabilities_str)
                    .map_err(conversion_error(4, Type::Text))?,
                user_id: row.get(5)?,
                created_at: DateTime::parse_from_rfc3339(&created_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(conversion_error(6, Type::Text))?,
            })
        })?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r.context("Corrupt detection row")?);
        }
        Ok(records)
    }

    /// Counts by label and by user, over all detections or one user's.
    pub fn stats(&self, user: Option<&str>) -> Result<DetectionStats> {
        let conn = self.pool.get()?;

        let mut by_prediction =
            BTreeMap::from([(NORMAL.to_string(), 0), (ANOMALY.to_string(), 0)]);
        let mut stmt = conn.prepare(
            "SELECT prediction, COUNT(*) FROM detections
             WHERE ?1 IS NULL OR user_id = ?1
             GROUP BY prediction",
        )?;
        let rows = stmt.query_map([user], label_count)?;
        for r in rows {
            let (prediction, count) = r?;
            by_prediction.insert(prediction, count);
        }
        let total: i64 = by_prediction.values().sum();

        let mut stmt = conn.prepare(
            "SELECT user_id, COUNT(*) AS n FROM detections
             WHERE ?1 IS NULL OR user_id = ?1
             GROUP BY user_id ORDER BY n DESC, user_id ASC",
        )?;
        let rows = stmt.query_map([user], label_count)?;
        let mut by_user = Vec::new();
        for r in rows {
            let (user_id, count) = r?;
            by_user.push(UserCount {
                user_id,
                count,
                percentage: percentage(count, total),
            });
        }

        Ok(DetectionStats {
            total,
            by_prediction,
            by_user,
        })
    }
}
