//! Database repository for medications, dose logs, and notes.
//!
//! All SQLite read/write logic lives here. Timestamps are stored as
//! RFC 3339 strings. Ordering and cascade invariants the API depends on
//! are enforced by query construction:
//!
//! - dose-log listings are `ORDER BY taken_at DESC` (newest first)
//! - [`MedicationRepository::delete_medication`] removes the medication's
//!   dose logs and notes in the same transaction as the parent row

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A medication with its prescription schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub dosage_mg: i64,
    pub prescribed_per_day: i64,
}

/// Validated fields for creating or replacing a medication.
#[derive(Debug, Clone)]
pub struct NewMedication {
    pub name: String,
    pub dosage_mg: i64,
    pub prescribed_per_day: i64,
}

/// A single dose-taking (or dose-missing) event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseLog {
    pub id: i64,
    pub medication_id: i64,
    pub taken_at: DateTime<Utc>,
    pub was_taken: bool,
}

/// Validated fields for creating or replacing a dose log.
#[derive(Debug, Clone)]
pub struct NewDoseLog {
    pub medication_id: i64,
    pub taken_at: DateTime<Utc>,
    pub was_taken: bool,
}

/// A clinical note attached to a medication. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub medication_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for creating a note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub medication_id: i64,
    pub text: String,
}

/// Repository for reading and writing tracker data to SQLite.
pub struct MedicationRepository {
    pool: SqlitePool,
}

fn medication_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Medication, sqlx::Error> {
    Ok(Medication {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        dosage_mg: row.try_get("dosage_mg")?,
        prescribed_per_day: row.try_get("prescribed_per_day")?,
    })
}

fn dose_log_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DoseLog, sqlx::Error> {
    let taken_at: String = row.try_get("taken_at")?;
    let taken_at = DateTime::parse_from_rfc3339(&taken_at)
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
        .with_timezone(&Utc);
    let was_taken: i64 = row.try_get("was_taken")?;

    Ok(DoseLog {
        id: row.try_get("id")?,
        medication_id: row.try_get("medication_id")?,
        taken_at,
        was_taken: was_taken != 0,
    })
}

fn note_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Note, sqlx::Error> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
        .with_timezone(&Utc);

    Ok(Note {
        id: row.try_get("id")?,
        medication_id: row.try_get("medication_id")?,
        text: row.try_get("text")?,
        created_at,
    })
}

impl MedicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---- Medication CRUD ----

    /// Insert a new medication. Returns the new row id.
    pub async fn insert_medication(&self, new: &NewMedication) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO medications (name, dosage_mg, prescribed_per_day) VALUES (?, ?, ?)",
        )
        .bind(&new.name)
        .bind(new.dosage_mg)
        .bind(new.prescribed_per_day)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_medications(&self) -> Result<Vec<Medication>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, dosage_mg, prescribed_per_day FROM medications ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| medication_from_row(&row).ok())
            .collect())
    }

    pub async fn get_medication(&self, id: i64) -> Result<Option<Medication>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, dosage_mg, prescribed_per_day FROM medications WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| medication_from_row(&row)).transpose()
    }

    /// Replace all mutable fields of a medication.
    /// Returns `true` if a row was updated, `false` if id not found.
    pub async fn update_medication(
        &self,
        id: i64,
        new: &NewMedication,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE medications SET name = ?, dosage_mg = ?, prescribed_per_day = ? WHERE id = ?",
        )
        .bind(&new.name)
        .bind(new.dosage_mg)
        .bind(new.prescribed_per_day)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a medication together with all of its dose logs and notes,
    /// in a single transaction. Returns `true` if the medication existed.
    pub async fn delete_medication(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM dose_logs WHERE medication_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notes WHERE medication_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM medications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- DoseLog CRUD ----

    /// Insert a new dose log. Returns the new row id.
    ///
    /// The caller is responsible for checking that `medication_id` exists;
    /// the schema-level foreign key is only a backstop.
    pub async fn insert_dose_log(&self, new: &NewDoseLog) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO dose_logs (medication_id, taken_at, was_taken) VALUES (?, ?, ?)",
        )
        .bind(new.medication_id)
        .bind(new.taken_at.to_rfc3339())
        .bind(if new.was_taken { 1i64 } else { 0i64 })
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All dose logs, newest first.
    pub async fn list_dose_logs(&self) -> Result<Vec<DoseLog>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, medication_id, taken_at, was_taken
             FROM dose_logs
             ORDER BY taken_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| dose_log_from_row(&row).ok())
            .collect())
    }

    /// One medication's dose logs, newest first.
    pub async fn list_dose_logs_for_medication(
        &self,
        medication_id: i64,
    ) -> Result<Vec<DoseLog>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, medication_id, taken_at, was_taken
             FROM dose_logs
             WHERE medication_id = ?
             ORDER BY taken_at DESC",
        )
        .bind(medication_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| dose_log_from_row(&row).ok())
            .collect())
    }

    pub async fn get_dose_log(&self, id: i64) -> Result<Option<DoseLog>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, medication_id, taken_at, was_taken FROM dose_logs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| dose_log_from_row(&row)).transpose()
    }

    /// Replace all mutable fields of a dose log.
    pub async fn update_dose_log(&self, id: i64, new: &NewDoseLog) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE dose_logs SET medication_id = ?, taken_at = ?, was_taken = ? WHERE id = ?",
        )
        .bind(new.medication_id)
        .bind(new.taken_at.to_rfc3339())
        .bind(if new.was_taken { 1i64 } else { 0i64 })
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_dose_log(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dose_logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Dose logs whose `taken_at` calendar date is within `[start, end]`,
    /// inclusive on both ends, newest first.
    pub async fn filter_dose_logs_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DoseLog>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, medication_id, taken_at, was_taken
             FROM dose_logs
             WHERE date(taken_at) BETWEEN ? AND ?
             ORDER BY taken_at DESC",
        )
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| dose_log_from_row(&row).ok())
            .collect())
    }

    // ---- Note CRUD (no update: notes are immutable) ----

    /// Insert a new note with a server-assigned creation timestamp.
    /// Returns the new row id.
    pub async fn insert_note(&self, new: &NewNote) -> Result<i64, sqlx::Error> {
        let created_at = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO notes (medication_id, text, created_at) VALUES (?, ?, ?)",
        )
        .bind(new.medication_id)
        .bind(&new.text)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All notes, newest first.
    pub async fn list_notes(&self) -> Result<Vec<Note>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, medication_id, text, created_at
             FROM notes
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| note_from_row(&row).ok())
            .collect())
    }

    /// One medication's notes, newest first.
    pub async fn list_notes_for_medication(
        &self,
        medication_id: i64,
    ) -> Result<Vec<Note>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, medication_id, text, created_at
             FROM notes
             WHERE medication_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(medication_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| note_from_row(&row).ok())
            .collect())
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, medication_id, text, created_at FROM notes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| note_from_row(&row)).transpose()
    }

    pub async fn delete_note(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
