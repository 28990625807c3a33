//! services/crm_directory_service.rs
//! Leads y suscripciones del CRM (tablas `leads` y `subscriptions`).

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

use crate::{
    database::format_timestamp,
    models::lead_model::{
        Lead, LeadCollection, Subscription, UpsertLeadRequest, UpsertSubscriptionRequest,
    },
    services::recipient_resolver::RecipientResolver,
};

#[derive(Clone, Debug)]
pub struct CrmDirectoryService {
    db_pool: Pool<Sqlite>,
}

impl CrmDirectoryService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CrmDirectoryService { db_pool }
    }

    /// Leads en crudo; `has_subscription` se calcula en `lead_collection`.
    pub async fn list_leads(&self) -> Result<Vec<Lead>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, company, status, subscription_link
            FROM leads
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando leads")?;

        let mut leads = Vec::with_capacity(rows.len());
        for r in rows {
            leads.push(Lead {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
                email: r.try_get("email")?,
                company: r.try_get("company")?,
                status: r.try_get("status")?,
                has_subscription: false,
                subscription_link: r.try_get("subscription_link")?,
            });
        }
        Ok(leads)
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipient_id, lead_link
            FROM subscriptions
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando suscripciones")?;

        let mut subscriptions = Vec::with_capacity(rows.len());
        for r in rows {
            subscriptions.push(Subscription {
                id: r.try_get("id")?,
                recipient_id: r.try_get("recipient_id")?,
                lead_link: r.try_get("lead_link")?,
            });
        }
        Ok(subscriptions)
    }

    /// Foto consistente de leads + suscripciones para un envío
    pub async fn snapshot(&self) -> Result<(Vec<Lead>, Vec<Subscription>)> {
        let leads = self.list_leads().await?;
        let subscriptions = self.list_subscriptions().await?;
        Ok((leads, subscriptions))
    }

    pub async fn lead_collection(&self, subscribed_only: bool) -> Result<LeadCollection> {
        let (leads, subscriptions) = self.snapshot().await?;
        let resolver = RecipientResolver::new(leads.clone(), subscriptions);

        let leads = leads
            .into_iter()
            .map(|mut lead| {
                lead.has_subscription = resolver.resolve(&lead.id).is_some();
                lead
            })
            .filter(|lead| !subscribed_only || lead.has_subscription)
            .collect();

        Ok(LeadCollection {
            leads,
            is_loading: false,
        })
    }

    pub async fn upsert_lead(&self, req: &UpsertLeadRequest) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO leads (
                id, name, email, company, status, subscription_link,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                company = excluded.company,
                status = excluded.status,
                subscription_link = excluded.subscription_link,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&req.id)
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.company)
        .bind(&req.status)
        .bind(&req.subscription_link)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error guardando lead")?;

        Ok(())
    }

    pub async fn upsert_subscription(&self, req: &UpsertSubscriptionRequest) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, recipient_id, lead_link, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(id) DO UPDATE SET
                recipient_id = excluded.recipient_id,
                lead_link = excluded.lead_link,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&req.id)
        .bind(&req.recipient_id)
        .bind(&req.lead_link)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error guardando suscripción")?;

        Ok(())
    }
}
