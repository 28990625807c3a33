//! services/sqlite_template_repository.rs
//! Backend durable: una fila por plantilla en `message_templates`, filtrada
//! por usuario y por tipo de plantilla.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    database::{format_timestamp, parse_timestamp},
    errors::TemplateError,
    models::template_model::{MessageTemplate, TemplateChange, BOT_MESSAGE_TEMPLATE_TYPE},
    services::template_repository::{notify, TemplateRepository, CHANGE_CHANNEL_CAPACITY},
};

const SELECT_COLUMNS: &str = "id, name, content, created_at, last_used, use_count";

#[derive(Clone)]
pub struct SqliteTemplateRepository {
    db_pool: Pool<Sqlite>,
    user_id: String,
    changes: broadcast::Sender<TemplateChange>,
}

impl SqliteTemplateRepository {
    pub fn new(db_pool: Pool<Sqlite>, user_id: &str) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        SqliteTemplateRepository {
            db_pool,
            user_id: user_id.to_string(),
            changes,
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<MessageTemplate>, TemplateError> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM message_templates
            WHERE id = ?1 AND user_id = ?2 AND template_type = ?3
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&self.user_id)
            .bind(BOT_MESSAGE_TEMPLATE_TYPE)
            .fetch_optional(&self.db_pool)
            .await?;

        row.map(|r| row_to_template(&r)).transpose()
    }
}

fn row_to_template(row: &SqliteRow) -> Result<MessageTemplate, TemplateError> {
    let created_at: String = row.try_get("created_at")?;
    let last_used: Option<String> = row.try_get("last_used")?;
    let use_count: i64 = row.try_get("use_count")?;

    Ok(MessageTemplate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        content: row.try_get("content")?,
        created_at: parse_timestamp(&created_at)?,
        last_used: last_used.as_deref().map(parse_timestamp).transpose()?,
        use_count: u32::try_from(use_count.max(0)).unwrap_or(u32::MAX),
    })
}

#[async_trait]
impl TemplateRepository for SqliteTemplateRepository {
    async fn list(&self) -> Result<Vec<MessageTemplate>, TemplateError> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM message_templates
            WHERE user_id = ?1 AND template_type = ?2
            ORDER BY created_at DESC, rowid DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(&self.user_id)
            .bind(BOT_MESSAGE_TEMPLATE_TYPE)
            .fetch_all(&self.db_pool)
            .await?;

        rows.iter().map(row_to_template).collect()
    }

    async fn save(
        &self,
        name: &str,
        content: &str,
        id: Option<&str>,
    ) -> Result<MessageTemplate, TemplateError> {
        // Misma precisión que la columna para que el registro devuelto coincida
        let now = Utc::now().trunc_subsecs(6);
        let now_str = format_timestamp(&now);

        let saved = match id {
            Some(existing_id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE message_templates
                    SET name = ?1,
                        content = ?2,
                        updated_at = ?3
                    WHERE id = ?4 AND user_id = ?5 AND template_type = ?6
                    "#,
                )
                .bind(name)
                .bind(content)
                .bind(&now_str)
                .bind(existing_id)
                .bind(&self.user_id)
                .bind(BOT_MESSAGE_TEMPLATE_TYPE)
                .execute(&self.db_pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(TemplateError::NotFound(existing_id.to_string()));
                }

                self.fetch(existing_id)
                    .await?
                    .ok_or_else(|| TemplateError::NotFound(existing_id.to_string()))?
            }
            None => {
                let template = MessageTemplate::new(
                    Uuid::new_v4().to_string(),
                    name.to_string(),
                    content.to_string(),
                    now,
                );

                sqlx::query(
                    r#"
                    INSERT INTO message_templates (
                        id, name, content, template_type, user_id,
                        created_at, updated_at, last_used, use_count
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, NULL, 0)
                    "#,
                )
                .bind(&template.id)
                .bind(&template.name)
                .bind(&template.content)
                .bind(BOT_MESSAGE_TEMPLATE_TYPE)
                .bind(&self.user_id)
                .bind(&now_str)
                .execute(&self.db_pool)
                .await?;

                template
            }
        };

        log::info!(
            "(sqlite_templates::save) Plantilla '{}' guardada (ID={})",
            saved.name,
            saved.id
        );
        notify(&self.changes, TemplateChange::Saved(saved.id.clone()));
        Ok(saved)
    }

    async fn delete(&self, id: &str) -> Result<bool, TemplateError> {
        let result = sqlx::query(
            r#"
            DELETE FROM message_templates
            WHERE id = ?1 AND user_id = ?2 AND template_type = ?3
            "#,
        )
        .bind(id)
        .bind(&self.user_id)
        .bind(BOT_MESSAGE_TEMPLATE_TYPE)
        .execute(&self.db_pool)
        .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            notify(&self.changes, TemplateChange::Deleted(id.to_string()));
        }
        Ok(deleted)
    }

    async fn mark_used(&self, id: &str) -> Result<Option<MessageTemplate>, TemplateError> {
        let now_str = format_timestamp(&Utc::now());

        // El CASE evita que last_used retroceda si el reloj lo hace
        let result = sqlx::query(
            r#"
            UPDATE message_templates
            SET use_count = use_count + 1,
                last_used = CASE
                    WHEN last_used IS NULL OR last_used < ?1 THEN ?1
                    ELSE last_used
                END,
                updated_at = ?1
            WHERE id = ?2 AND user_id = ?3 AND template_type = ?4
            "#,
        )
        .bind(&now_str)
        .bind(id)
        .bind(&self.user_id)
        .bind(BOT_MESSAGE_TEMPLATE_TYPE)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        notify(&self.changes, TemplateChange::Used(id.to_string()));
        self.fetch(id).await
    }

    fn subscribe(&self) -> broadcast::Receiver<TemplateChange> {
        self.changes.subscribe()
    }
}
