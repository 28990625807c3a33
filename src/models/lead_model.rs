use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    /// Calculado: tiene una suscripción enlazada con recipient_id
    #[serde(default)]
    pub has_subscription: bool,
    pub subscription_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadCollection {
    pub leads: Vec<Lead>,
    pub is_loading: bool,
}

/// Enlace entre un lead y una cuenta del bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub recipient_id: Option<String>,
    pub lead_link: Option<String>,
}

/// Body de POST /api/leads
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertLeadRequest {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub status: Option<String>,
    pub subscription_link: Option<String>,
}

/// Body de POST /api/subscriptions
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSubscriptionRequest {
    pub id: String,
    pub recipient_id: Option<String>,
    pub lead_link: Option<String>,
}
