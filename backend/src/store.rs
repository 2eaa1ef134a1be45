//! Persistence collaborator boundary.
//!
//! The engines never assume a specific backend or query language; they
//! talk to this trait. `MemoryStore` backs the server and the test
//! suite; a database-backed implementation plugs in behind the same
//! contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use cantiere_shared::{
    Appointment, AppointmentKind, AppointmentState, Notification, Offer, OfferState,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Predicate-style filter for appointment queries.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub company_id: Option<Uuid>,
    pub participant_id: Option<Uuid>,
    pub linked_offer_id: Option<Uuid>,
    pub kind: Option<AppointmentKind>,
    pub state: Option<AppointmentState>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(company_id) = self.company_id {
            if appointment.company_id != company_id {
                return false;
            }
        }
        if let Some(participant_id) = self.participant_id {
            if appointment.participant(participant_id).is_none() {
                return false;
            }
        }
        if let Some(offer_id) = self.linked_offer_id {
            if appointment.linked_offer_id != Some(offer_id) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if appointment.kind != kind {
                return false;
            }
        }
        if let Some(state) = self.state {
            if appointment.state != state {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub company_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub state: Option<OfferState>,
    /// When set, terminal offers (sent/accepted/rejected/archived) are excluded.
    pub active_only: bool,
}

impl OfferFilter {
    pub fn matches(&self, offer: &Offer) -> bool {
        if let Some(company_id) = self.company_id {
            if offer.company_id != company_id {
                return false;
            }
        }
        if let Some(client_id) = self.client_id {
            if offer.client_id != client_id {
                return false;
            }
        }
        if let Some(state) = self.state {
            if offer.state != state {
                return false;
            }
        }
        if self.active_only && offer.state.is_terminal() {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn put_appointment(&self, appointment: &Appointment) -> StoreResult<()>;
    async fn delete_appointment(&self, id: Uuid) -> StoreResult<bool>;
    async fn query_appointments(&self, filter: &AppointmentFilter) -> StoreResult<Vec<Appointment>>;

    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>>;
    async fn put_offer(&self, offer: &Offer) -> StoreResult<()>;
    async fn query_offers(&self, filter: &OfferFilter) -> StoreResult<Vec<Offer>>;

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
    async fn query_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: Uuid, recipient_id: Uuid) -> StoreResult<bool>;
    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64>;
    async fn delete_notification(&self, id: Uuid, recipient_id: Uuid) -> StoreResult<bool>;
}

/// In-memory store with last-write-wins semantics per record.
#[derive(Default)]
pub struct MemoryStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    offers: RwLock<HashMap<Uuid, Offer>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn put_appointment(&self, appointment: &Appointment) -> StoreResult<()> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.appointments.write().await.remove(&id).is_some())
    }

    async fn query_appointments(&self, filter: &AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let mut results: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        results.sort_by_key(|a| a.created_at);
        Ok(results)
    }

    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>> {
        Ok(self.offers.read().await.get(&id).cloned())
    }

    async fn put_offer(&self, offer: &Offer) -> StoreResult<()> {
        self.offers.write().await.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn query_offers(&self, filter: &OfferFilter) -> StoreResult<Vec<Offer>> {
        let mut results: Vec<Offer> = self
            .offers
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        results.sort_by_key(|o| o.created_at);
        Ok(results)
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn query_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let mut results: Vec<Notification> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn mark_notification_read(&self, id: Uuid, recipient_id: Uuid) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let mut updated = 0;
        for n in notifications.values_mut() {
            if n.recipient_id == recipient_id && !n.read {
                n.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_notification(&self, id: Uuid, recipient_id: Uuid) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.get(&id) {
            Some(n) if n.recipient_id == recipient_id => {
                notifications.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
