//! Offer phase engine.
//!
//! Drives a tender through its ordered phases (preliminary analysis,
//! processing, approval/review gate, submission) with the deadline and
//! extension ("proroga") rules, the conditional approval sub-workflow
//! and the document report snapshot. Derived human tasks are delegated
//! to the [`TaskDispatcher`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ApiResult, AppError};
use crate::identity::Actor;
use crate::notifications::{notification, Notifier};
use crate::services::dispatcher::TaskDispatcher;
use crate::store::{AppointmentFilter, OfferFilter, Store};
use crate::validation;
use cantiere_shared::{
    AnalysisData, AppointmentKind, AppointmentState, ApprovalMeta, ExtensionEntry, Offer,
    OfferState, OfferSummary, ProcessingData, ReviewData, SendChannel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferOutcome {
    Accepted,
    Rejected,
}

/// Deadline report for an offer, as returned by the deadline check.
#[derive(Debug, Serialize)]
pub struct DeadlineStatus {
    pub deadline: Option<DateTime<Utc>>,
    pub expired: bool,
    pub extensions: usize,
    /// True when submission actions are refused until an extension is
    /// logged or the offer is archived.
    pub blocked: bool,
}

pub struct OfferService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    dispatcher: Arc<TaskDispatcher>,
}

impl OfferService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<TaskDispatcher>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            dispatcher,
        }
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Offer> {
        self.store
            .get_offer(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Offer {}", id)))
    }

    pub async fn list(&self, filter: &OfferFilter) -> ApiResult<Vec<Offer>> {
        Ok(self.store.query_offers(filter).await?)
    }

    pub async fn create_offer(
        &self,
        actor: &Actor,
        name: Option<String>,
        client_id: Uuid,
        company_id: Uuid,
    ) -> ApiResult<Offer> {
        let name = validation::string::required(&name, "name")?;
        let now = self.clock.now();
        let offer = Offer {
            id: Uuid::new_v4(),
            name,
            client_id,
            company_id,
            created_by: actor.id,
            state: OfferState::Draft,
            current_phase: 0,
            analysis: None,
            processing: None,
            review: None,
            extension_log: Vec::new(),
            approval: ApprovalMeta::default(),
            created_at: now,
            updated_at: None,
        };
        self.store.put_offer(&offer).await?;
        info!("Offer {} created by {}", offer.id, actor.id);
        Ok(offer)
    }

    /// Accept the preliminary analysis. Allowed from `Draft` and, for
    /// resubmission, while still in `PreliminaryAnalysis`. A complete
    /// site-visit plan schedules the visit through the dispatcher; an
    /// incomplete plan is stored without scheduling anything.
    pub async fn submit_analysis(
        &self,
        id: Uuid,
        actor: &Actor,
        data: AnalysisData,
    ) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if !matches!(
            offer.state,
            OfferState::Draft | OfferState::PreliminaryAnalysis
        ) {
            return Err(AppError::InvalidPhase {
                expected: 0,
                actual: offer.current_phase,
            });
        }

        if data.tender_type.trim().is_empty() {
            return Err(AppError::validation_single(
                "tender_type",
                "Tender type is required",
            ));
        }
        if let Some(value) = &data.economic_value {
            validation::number::valid_amount(value, "economic_value")?;
        }

        offer.analysis = Some(data);
        offer.state = OfferState::PreliminaryAnalysis;
        offer.current_phase = 1;
        offer.updated_at = Some(self.clock.now());
        self.store.put_offer(&offer).await?;

        if let Some(plan) = offer.analysis.as_ref().and_then(|a| a.site_visit.clone()) {
            if plan.is_schedulable() && !plan.confirmed && !self.has_task(offer.id, AppointmentKind::SiteVisit).await? {
                self.dispatcher
                    .schedule_site_visit(actor, &offer, &plan)
                    .await?;
            }
        }

        info!("Offer {} analysis accepted, phase 1", offer.id);
        Ok(offer)
    }

    /// Accept the processing figures. When approval is required the
    /// offer parks in `PendingApproval` and an approval task is
    /// dispatched to the designated approver; otherwise it is
    /// `Processed`. Phase becomes 2 either way.
    pub async fn submit_processing(
        &self,
        id: Uuid,
        actor: &Actor,
        data: ProcessingData,
    ) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if offer.current_phase != 1 || offer.state != OfferState::PreliminaryAnalysis {
            return Err(AppError::InvalidPhase {
                expected: 1,
                actual: offer.current_phase,
            });
        }

        validation::Validator::new()
            .check(validation::number::percentage(
                &data.proposed_discount_pct,
                "proposed_discount_pct",
            ))
            .check(validation::number::valid_amount(
                &data.total_costs,
                "total_costs",
            ))
            .error_if(
                data.expected_timeline.trim().is_empty(),
                "expected_timeline",
                "Expected timeline is required",
            )
            .error_if(
                data.approval_required && data.approver_id.is_none(),
                "approver_id",
                "Approver is required when approval is requested",
            )
            .finish()?;

        let summary = compute_summary(&offer, &data)?;
        let approval_required = data.approval_required;
        let approver_id = data.approver_id;

        offer.processing = Some(data);
        offer.approval = ApprovalMeta {
            required: approval_required,
            approver_id,
            approved_at: None,
        };
        offer.state = if approval_required {
            OfferState::PendingApproval
        } else {
            OfferState::Processed
        };
        offer.current_phase = 2;
        offer.updated_at = Some(self.clock.now());
        self.store.put_offer(&offer).await?;

        if approval_required {
            // approver_id presence was validated above
            if let Some(approver) = approver_id {
                self.dispatcher
                    .schedule_approval_task(actor, &offer, approver, &summary)
                    .await?;
            }
        }

        info!(
            "Offer {} processing accepted, state {}",
            offer.id,
            offer.state.as_str()
        );
        Ok(offer)
    }

    /// Approve a pending offer. Only the designated approver or an
    /// admin may approve.
    pub async fn approve(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if offer.state != OfferState::PendingApproval {
            return Err(AppError::invalid_transition(format!(
                "Offer is {}, not pending approval",
                offer.state.as_str()
            )));
        }
        if offer.approval.approver_id != Some(actor.id) && !actor.is_admin() {
            return Err(AppError::permission_denied(
                "Only the designated approver may approve this offer",
            ));
        }

        let now = self.clock.now();
        offer.state = OfferState::Approved;
        offer.current_phase = 3;
        offer.approval.approved_at = Some(now);
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;

        if offer.created_by != actor.id {
            self.notifier
                .enqueue(notification(
                    offer.created_by,
                    format!("Offer \"{}\" was approved", offer.name),
                    "offer_approved",
                    Some(offer.id),
                    now,
                ))
                .await;
        }

        info!("Offer {} approved by {}", offer.id, actor.id);
        Ok(offer)
    }

    /// Report the deadline state of an offer without mutating it.
    pub async fn check_deadline(&self, id: Uuid) -> ApiResult<DeadlineStatus> {
        let offer = self.get(id).await?;
        Ok(deadline_status(&offer, self.clock.now()))
    }

    /// Log a deadline extension ("proroga"), permitting continued
    /// processing of an otherwise-expired offer.
    pub async fn log_extension(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if offer.state.is_terminal() {
            return Err(AppError::invalid_transition(format!(
                "Offer is {} and can no longer be extended",
                offer.state.as_str()
            )));
        }
        let now = self.clock.now();
        offer.extension_log.push(ExtensionEntry {
            actor_id: actor.id,
            at: now,
        });
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;
        info!("Offer {} extension logged by {}", offer.id, actor.id);
        Ok(offer)
    }

    pub async fn archive(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if offer.state.is_terminal() {
            return Err(AppError::invalid_transition(format!(
                "Offer is already {}",
                offer.state.as_str()
            )));
        }
        offer.state = OfferState::Archived;
        offer.updated_at = Some(self.clock.now());
        self.store.put_offer(&offer).await?;
        info!("Offer {} archived by {}", offer.id, actor.id);
        Ok(offer)
    }

    /// Record submission through the platform channel.
    pub async fn mark_sent_via_platform(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        self.require_submittable(&offer)?;

        let now = self.clock.now();
        offer.review = Some(ReviewData {
            sent_via: SendChannel::Platform,
            sent_at: now,
            confirmed_by: None,
        });
        offer.state = OfferState::Sent;
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;
        info!("Offer {} sent via platform by {}", offer.id, actor.id);
        Ok(offer)
    }

    /// Create the email-send reminder task for `target_id` (the acting
    /// user when absent). The offer itself is not mutated.
    pub async fn request_email_send(
        &self,
        id: Uuid,
        actor: &Actor,
        target_id: Option<Uuid>,
    ) -> ApiResult<cantiere_shared::Appointment> {
        let offer = self.get(id).await?;
        self.require_submittable(&offer)?;
        self.dispatcher
            .schedule_email_reminder(actor, &offer, target_id.unwrap_or(actor.id))
            .await
    }

    /// Record submission through the email channel. Only reachable
    /// once the derived email reminder linked to this offer has been
    /// confirmed with `actor` among its participants.
    pub async fn mark_sent_via_email_confirmed(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        self.require_submittable(&offer)?;

        let reminders = self
            .store
            .query_appointments(&AppointmentFilter {
                linked_offer_id: Some(offer.id),
                kind: Some(AppointmentKind::SendEmailReminder),
                state: Some(AppointmentState::Confirmed),
                ..Default::default()
            })
            .await?;
        if !reminders
            .iter()
            .any(|a| a.participant(actor.id).is_some())
        {
            return Err(AppError::invalid_transition(
                "No confirmed email-send reminder exists for this offer and actor",
            ));
        }

        let now = self.clock.now();
        offer.review = Some(ReviewData {
            sent_via: SendChannel::Email,
            sent_at: now,
            confirmed_by: Some(actor.id),
        });
        offer.state = OfferState::Sent;
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;
        info!("Offer {} sent via email, confirmed by {}", offer.id, actor.id);
        Ok(offer)
    }

    /// Record the client's decision on a sent offer.
    pub async fn record_outcome(
        &self,
        id: Uuid,
        actor: &Actor,
        outcome: OfferOutcome,
    ) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        if offer.state != OfferState::Sent {
            return Err(AppError::invalid_transition(format!(
                "Outcome can only be recorded on a sent offer, not {}",
                offer.state.as_str()
            )));
        }
        let now = self.clock.now();
        offer.state = match outcome {
            OfferOutcome::Accepted => OfferState::Accepted,
            OfferOutcome::Rejected => OfferState::Rejected,
        };
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;
        info!(
            "Offer {} outcome recorded as {} by {}",
            offer.id,
            offer.state.as_str(),
            actor.id
        );
        Ok(offer)
    }

    /// Mark the offer's site-visit plan as carried out and tell the
    /// offer's creator the analysis can be revisited with the collected
    /// form data.
    pub async fn record_site_visit_confirmed(&self, id: Uuid, actor: &Actor) -> ApiResult<Offer> {
        let mut offer = self.get(id).await?;
        let Some(analysis) = offer.analysis.as_mut() else {
            return Err(AppError::invalid_transition(
                "Offer has no analysis data to attach a site visit to",
            ));
        };
        let Some(plan) = analysis.site_visit.as_mut() else {
            return Err(AppError::invalid_transition(
                "Offer has no site-visit plan",
            ));
        };
        plan.confirmed = true;

        let now = self.clock.now();
        offer.updated_at = Some(now);
        self.store.put_offer(&offer).await?;

        if offer.created_by != actor.id {
            self.notifier
                .enqueue(notification(
                    offer.created_by,
                    format!("Site visit for \"{}\" was confirmed", offer.name),
                    "site_visit_confirmed",
                    Some(offer.id),
                    now,
                ))
                .await;
        }
        Ok(offer)
    }

    /// Submission precondition: the offer must have cleared processing
    /// and the deadline gate.
    fn require_submittable(&self, offer: &Offer) -> ApiResult<()> {
        match offer.state {
            OfferState::Processed | OfferState::Approved => {}
            OfferState::Sent => {
                return Err(AppError::invalid_transition(
                    "Offer has already been sent",
                ))
            }
            other => {
                return Err(AppError::invalid_transition(format!(
                    "Offer is {} and cannot be submitted",
                    other.as_str()
                )))
            }
        }
        let status = deadline_status(offer, self.clock.now());
        if status.blocked {
            return Err(AppError::DeadlinePassed);
        }
        Ok(())
    }

    async fn has_task(&self, offer_id: Uuid, kind: AppointmentKind) -> ApiResult<bool> {
        let existing = self
            .store
            .query_appointments(&AppointmentFilter {
                linked_offer_id: Some(offer_id),
                kind: Some(kind),
                ..Default::default()
            })
            .await?;
        Ok(!existing.is_empty())
    }
}

/// Deadline gate: a past-due tender with no logged extension blocks
/// submission until `log_extension` or `archive` is taken.
pub fn deadline_status(offer: &Offer, now: DateTime<Utc>) -> DeadlineStatus {
    let deadline = offer.analysis.as_ref().and_then(|a| a.deadline);
    let expired = deadline.map(|d| d <= now).unwrap_or(false);
    DeadlineStatus {
        deadline,
        expired,
        extensions: offer.extension_log.len(),
        blocked: expired && offer.extension_log.is_empty(),
    }
}

/// Figures presented to the approver: the tender value, the proposed
/// discount and the profit left after costs.
pub fn compute_summary(offer: &Offer, processing: &ProcessingData) -> ApiResult<OfferSummary> {
    let analysis = offer.analysis.as_ref().ok_or_else(|| {
        AppError::InternalError("Offer at processing phase has no analysis data".to_string())
    })?;
    let value = analysis.economic_value.unwrap_or(Decimal::ZERO);
    let discount = processing.proposed_discount_pct;
    let expected_profit =
        value * (Decimal::ONE - discount / Decimal::from(100)) - processing.total_costs;
    Ok(OfferSummary {
        value,
        discount_pct: discount,
        expected_profit,
        timeline: processing.expected_timeline.clone(),
    })
}
