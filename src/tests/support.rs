//! tests/support.rs
//! Helpers compartidos: transporte mock y datos de ejemplo en SQLite.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{
    database::setup_test_database,
    models::{
        bot_model::{BotAck, BotInfo},
        campaign_model::CampaignMessageStatus,
        lead_model::{UpsertLeadRequest, UpsertSubscriptionRequest},
    },
    services::{
        bot_service::BotTransport, campaign_state::CampaignState,
        crm_directory_service::CrmDirectoryService, dispatch_service::DispatchService,
    },
};

/// Respuesta programada por recipient_id
#[derive(Clone, Debug)]
pub enum MockReply {
    Ok,
    Reject(Option<String>),
    Error(String),
    Hang,
}

#[derive(Default)]
pub struct MockBotTransport {
    replies: Mutex<HashMap<String, MockReply>>,
    calls: Mutex<Vec<(String, String)>>,
    /// Si está, se guarda el estado de cada fila al momento de cada envío
    observer: Mutex<Option<CampaignState>>,
    observed: Mutex<Vec<Vec<CampaignMessageStatus>>>,
}

impl MockBotTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, recipient_id: &str, reply: MockReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(recipient_id.to_string(), reply);
    }

    pub fn observe(&self, state: CampaignState) {
        *self.observer.lock().unwrap() = Some(state);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn observed(&self) -> Vec<Vec<CampaignMessageStatus>> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotTransport for MockBotTransport {
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<BotAck> {
        self.calls
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));

        let observer = self.observer.lock().unwrap().clone();
        if let Some(state) = observer {
            let statuses = state
                .snapshot()
                .await
                .entries
                .iter()
                .map(|e| e.status)
                .collect();
            self.observed.lock().unwrap().push(statuses);
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(recipient_id)
            .cloned()
            .unwrap_or(MockReply::Ok);

        match reply {
            MockReply::Ok => Ok(BotAck::success()),
            MockReply::Reject(Some(desc)) => Ok(BotAck::rejected(&desc)),
            MockReply::Reject(None) => Ok(BotAck {
                ok: false,
                description: None,
                error_code: Some(400),
                result: None,
            }),
            MockReply::Error(msg) => Err(anyhow!(msg)),
            MockReply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(BotAck::success())
            }
        }
    }

    async fn get_bot_info(&self) -> Result<BotInfo> {
        Ok(BotInfo {
            id: 42,
            first_name: "CRM Bot".to_string(),
            username: Some("crm_bot".to_string()),
            is_bot: true,
            can_join_groups: None,
            can_read_all_group_messages: None,
        })
    }
}

pub async fn add_lead(
    directory: &CrmDirectoryService,
    id: &str,
    name: &str,
    subscription_link: Option<&str>,
) {
    directory
        .upsert_lead(&UpsertLeadRequest {
            id: id.to_string(),
            name: name.to_string(),
            email: Some(format!("{}@example.com", id)),
            company: None,
            status: Some("active".to_string()),
            subscription_link: subscription_link.map(str::to_string),
        })
        .await
        .expect("upsert lead");
}

pub async fn add_subscription(
    directory: &CrmDirectoryService,
    id: &str,
    recipient_id: Option<&str>,
    lead_link: Option<&str>,
) {
    directory
        .upsert_subscription(&UpsertSubscriptionRequest {
            id: id.to_string(),
            recipient_id: recipient_id.map(str::to_string),
            lead_link: lead_link.map(str::to_string),
        })
        .await
        .expect("upsert subscription");
}

pub struct DispatchFixture {
    pub directory: CrmDirectoryService,
    pub state: CampaignState,
    pub transport: Arc<MockBotTransport>,
    pub service: DispatchService,
}

pub async fn dispatch_fixture(send_timeout: Duration) -> DispatchFixture {
    let db_pool = setup_test_database().await.expect("test database");
    let directory = CrmDirectoryService::new(db_pool.clone());
    let state = CampaignState::new();
    let transport = MockBotTransport::new();
    let service = DispatchService::new(
        transport.clone(),
        directory.clone(),
        state.clone(),
        send_timeout,
    );

    DispatchFixture {
        directory,
        state,
        transport,
        service,
    }
}
