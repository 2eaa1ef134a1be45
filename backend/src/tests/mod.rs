pub mod integration;
pub mod unit;

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, FixedClock};
use crate::config::DispatchConfig;
use crate::identity::{Actor, ActorRole};
use crate::notifications::{Notifier, StoreNotifier};
use crate::services::{NegotiationService, OfferService, TaskDispatcher};
use crate::store::{MemoryStore, Store};

/// Everything wired against an in-memory store and a fixed clock so
/// assertions about derived timestamps are deterministic.
pub struct TestContext {
    pub store: Arc<dyn Store>,
    pub now: DateTime<Utc>,
    pub negotiation: Arc<NegotiationService>,
    pub offers: Arc<OfferService>,
    pub dispatcher: Arc<TaskDispatcher>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::at(
            Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0)
                .single()
                .expect("valid test instant"),
        )
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        let store: Arc<dyn Store> = MemoryStore::new();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let notifier: Arc<dyn Notifier> = Arc::new(StoreNotifier::new(store.clone()));
        let negotiation = Arc::new(NegotiationService::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let dispatcher = Arc::new(TaskDispatcher::new(
            negotiation.clone(),
            clock.clone(),
            DispatchConfig::default(),
        ));
        let offers = Arc::new(OfferService::new(
            store.clone(),
            notifier,
            clock,
            dispatcher.clone(),
        ));
        Self {
            store,
            now,
            negotiation,
            offers,
            dispatcher,
        }
    }
}

pub fn member(id: Uuid) -> Actor {
    Actor {
        id,
        role: ActorRole::Member,
    }
}

pub fn admin(id: Uuid) -> Actor {
    Actor {
        id,
        role: ActorRole::Admin,
    }
}
