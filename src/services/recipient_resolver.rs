//! services/recipient_resolver.rs
//! Resolución lead -> recipient_id del bot, sobre una foto de leads y
//! suscripciones tomada al momento del envío.

use std::collections::HashMap;

use crate::models::lead_model::{Lead, Subscription};

pub struct RecipientResolver {
    leads: HashMap<String, Lead>,
    subscriptions_by_id: HashMap<String, Subscription>,
    subscriptions_by_lead: HashMap<String, Subscription>,
}

impl RecipientResolver {
    pub fn new(leads: Vec<Lead>, subscriptions: Vec<Subscription>) -> Self {
        let mut subscriptions_by_id = HashMap::with_capacity(subscriptions.len());
        let mut subscriptions_by_lead = HashMap::new();
        for sub in subscriptions {
            if let Some(lead_id) = &sub.lead_link {
                // Si hay varias para el mismo lead se queda la primera
                subscriptions_by_lead
                    .entry(lead_id.clone())
                    .or_insert_with(|| sub.clone());
            }
            subscriptions_by_id.insert(sub.id.clone(), sub);
        }

        RecipientResolver {
            leads: leads.into_iter().map(|l| (l.id.clone(), l)).collect(),
            subscriptions_by_id,
            subscriptions_by_lead,
        }
    }

    /// `None` si el lead no existe, no tiene suscripción o la suscripción no
    /// tiene recipient_id. No es un error.
    pub fn resolve(&self, lead_id: &str) -> Option<String> {
        let lead = self.leads.get(lead_id)?;

        let subscription = match &lead.subscription_link {
            Some(link) => self.subscriptions_by_id.get(link),
            None => self.subscriptions_by_lead.get(lead_id),
        }?;

        subscription
            .recipient_id
            .as_ref()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }

    /// Nombre para mostrar; si el lead no existe se usa su id.
    pub fn lead_name(&self, lead_id: &str) -> String {
        self.leads
            .get(lead_id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| lead_id.to_string())
    }
}
