// src/db/postgres.rs
use std::collections::HashMap;

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{ScoredMember, Versioned};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS objects (
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL,
        version BIGINT NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sorted_sets (
        key TEXT NOT NULL,
        member TEXT NOT NULL,
        score BIGINT NOT NULL,
        PRIMARY KEY (key, member)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sorted_sets_key_score ON sorted_sets (key, score DESC)",
];

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get_object(&self, key: &str) -> Result<Option<Versioned>, sqlx::Error> {
        let row = sqlx::query("SELECT value, version FROM objects WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<Versioned, sqlx::Error> {
            let Json(value): Json<Value> = row.try_get("value")?;
            Ok(Versioned {
                value,
                version: row.try_get("version")?,
            })
        })
        .transpose()
    }

    pub async fn get_objects(&self, keys: &[String]) -> Result<Vec<Option<Versioned>>, sqlx::Error> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT key, value, version FROM objects WHERE key = ANY($1)")
            .bind(keys)
            .fetch_all(&self.pool)
            .await?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let Json(value): Json<Value> = row.try_get("value")?;
            let version: i64 = row.try_get("version")?;
            found.insert(key, Versioned { value, version });
        }

        Ok(keys.iter().map(|key| found.get(key).cloned()).collect())
    }

    pub async fn insert_object(&self, key: &str, value: Value) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO objects (key, value, version) VALUES ($1, $2, 1) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(Json(value))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn set_object(&self, key: &str, value: Value) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO objects (key, value, version) VALUES ($1, $2, 1)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, version = objects.version + 1
            "#,
        )
        .bind(key)
        .bind(Json(value))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn replace_object(
        &self,
        key: &str,
        expected_version: i64,
        value: Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE objects SET value = $2, version = version + 1 WHERE key = $1 AND version = $3",
        )
        .bind(key)
        .bind(Json(value))
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, key: &str) -> Result<(), sqlx::Error> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM objects WHERE key = $1")
            .bind(key)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("DELETE FROM sorted_sets WHERE key = $1")
            .bind(key)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await
    }

    pub async fn sorted_set_add(&self, key: &str, score: i64, member: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sorted_sets (key, member, score) VALUES ($1, $2, $3)
            ON CONFLICT (key, member) DO UPDATE SET score = EXCLUDED.score
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sorted_sets WHERE key = $1 AND member = $2")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn sorted_set_rev_range(
        &self,
        key: &str,
        start: usize,
        count: Option<usize>,
    ) -> Result<Vec<ScoredMember>, sqlx::Error> {
        // LIMIT NULL means no limit in Postgres.
        let rows = sqlx::query(
            r#"
            SELECT member, score FROM sorted_sets
            WHERE key = $1
            ORDER BY score DESC, member DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(key)
        .bind(to_i64(start))
        .bind(count.map(to_i64))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ScoredMember, sqlx::Error> {
                Ok(ScoredMember {
                    member: row.try_get("member")?,
                    score: row.try_get("score")?,
                })
            })
            .collect()
    }

    pub async fn sorted_set_trim(&self, key: &str, keep: usize) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            DELETE FROM sorted_sets
            WHERE key = $1 AND member IN (
                SELECT member FROM sorted_sets
                WHERE key = $1
                ORDER BY score DESC, member DESC
                OFFSET $2
            )
            RETURNING member
            "#,
        )
        .bind(key)
        .bind(to_i64(keep))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row.try_get("member")).collect()
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
