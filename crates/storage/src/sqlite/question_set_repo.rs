use async_trait::async_trait;
use sqlx::Row;

use quiz_core::model::Question;

use crate::repository::{QuestionRecord, QuestionSetRepository, StorageError};

use super::SqliteRepository;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl QuestionSetRepository for SqliteRepository {
    async fn get_questions(&self, module: &str) -> Result<Option<Vec<Question>>, StorageError> {
        let row = sqlx::query("SELECT questions FROM question_sets WHERE module = ?1")
            .bind(module)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("questions").map_err(ser)?;
        let records: Vec<QuestionRecord> = serde_json::from_str(&raw).map_err(ser)?;
        let questions = records
            .into_iter()
            .map(|record| record.into_question().map_err(ser))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(questions))
    }

    async fn put_questions(
        &self,
        module: &str,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let records: Vec<QuestionRecord> =
            questions.iter().map(QuestionRecord::from_question).collect();
        let raw = serde_json::to_string(&records).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO question_sets (module, questions)
            VALUES (?1, ?2)
            ON CONFLICT(module) DO UPDATE SET
                questions = excluded.questions
            ",
        )
        .bind(module)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
