//! Side-effect dispatcher.
//!
//! Turns offer-engine intents ("need approval from X", "remind me to
//! send the email", "schedule the site visit") into appointments via
//! the negotiation engine, and routes confirmed derived appointments
//! back into the matching offer transition. The negotiation engine
//! never reads offers; the offer engine never mutates appointments
//! directly.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::DispatchConfig;
use crate::error::{ApiResult, AppError};
use crate::identity::Actor;
use crate::services::negotiation::{AppointmentDraft, NegotiationService};
use crate::services::offers::OfferService;
use cantiere_shared::{
    Appointment, AppointmentKind, Offer, OfferSummary, Participant, ParticipantRole, SiteVisitPlan,
};

pub struct TaskDispatcher {
    negotiation: Arc<NegotiationService>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl TaskDispatcher {
    pub fn new(
        negotiation: Arc<NegotiationService>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            negotiation,
            clock,
            config,
        }
    }

    /// Schedule the site visit collected during preliminary analysis.
    /// The plan must be complete (date, assignee, form template).
    pub async fn schedule_site_visit(
        &self,
        actor: &Actor,
        offer: &Offer,
        plan: &SiteVisitPlan,
    ) -> ApiResult<Appointment> {
        let date = plan.date.ok_or_else(|| {
            AppError::validation_single("site_visit", "Site visit date is required")
        })?;
        let assignee_id = plan.assignee_id.ok_or_else(|| {
            AppError::validation_single("site_visit", "Site visit assignee is required")
        })?;

        let draft = AppointmentDraft {
            company_id: offer.company_id,
            title: Some(format!("Site visit for \"{}\"", offer.name)),
            description: plan.address.clone(),
            start: date,
            end: None,
            kind: AppointmentKind::SiteVisit,
            participants: vec![Participant {
                user_id: assignee_id,
                role: ParticipantRole::Invitee,
            }],
            linked_template_id: plan.form_template_id,
            linked_offer_id: Some(offer.id),
        };
        let appointment = self.negotiation.create(actor, draft).await?;
        info!(
            "Site visit {} scheduled for offer {}",
            appointment.id, offer.id
        );
        Ok(appointment)
    }

    /// Create the approval task for the designated approver, due the
    /// next calendar day at the configured hour.
    pub async fn schedule_approval_task(
        &self,
        actor: &Actor,
        offer: &Offer,
        approver_id: Uuid,
        summary: &OfferSummary,
    ) -> ApiResult<Appointment> {
        let due = self.next_day_at(self.config.approval_task_hour)?;
        let description = format!(
            "Approval requested for \"{}\". Value: {} | Discount: {}% | Expected profit: {} | Timeline: {}",
            offer.name, summary.value, summary.discount_pct, summary.expected_profit, summary.timeline
        );

        let draft = AppointmentDraft {
            company_id: offer.company_id,
            title: Some(format!("Approve offer \"{}\"", offer.name)),
            description: Some(description),
            start: due,
            end: None,
            kind: AppointmentKind::ApprovalTask,
            participants: vec![Participant {
                user_id: approver_id,
                role: ParticipantRole::Invitee,
            }],
            linked_template_id: None,
            linked_offer_id: Some(offer.id),
        };
        let appointment = self.negotiation.create(actor, draft).await?;
        info!(
            "Approval task {} scheduled for offer {} (approver {})",
            appointment.id, offer.id, approver_id
        );
        Ok(appointment)
    }

    /// Create the email-send reminder, due after the configured lead
    /// time. When the target is the acting user the reminder is
    /// confirmed on the spot; otherwise the target confirms it through
    /// the negotiation engine.
    pub async fn schedule_email_reminder(
        &self,
        actor: &Actor,
        offer: &Offer,
        target_id: Uuid,
    ) -> ApiResult<Appointment> {
        let due = self.clock.now() + Duration::minutes(self.config.email_reminder_lead_minutes);

        let draft = AppointmentDraft {
            company_id: offer.company_id,
            title: Some(format!("Send offer \"{}\" by email", offer.name)),
            description: Some(
                "Confirm this task once the offer email has been sent to the client".to_string(),
            ),
            start: due,
            end: None,
            kind: AppointmentKind::SendEmailReminder,
            participants: vec![Participant {
                user_id: target_id,
                role: ParticipantRole::Invitee,
            }],
            linked_template_id: None,
            linked_offer_id: Some(offer.id),
        };
        let appointment = self.negotiation.create(actor, draft).await?;
        info!(
            "Email reminder {} scheduled for offer {}",
            appointment.id, offer.id
        );
        Ok(appointment)
    }

    /// Route a freshly confirmed derived appointment back into the
    /// matching offer transition. Returns the updated offer, or `None`
    /// when the appointment carries no offer follow-up.
    pub async fn resolve_confirmed(
        &self,
        appointment: &Appointment,
        actor: &Actor,
        offers: &OfferService,
    ) -> ApiResult<Option<Offer>> {
        let Some(offer_id) = appointment.linked_offer_id else {
            return Ok(None);
        };

        let offer = match appointment.kind {
            AppointmentKind::ApprovalTask => offers.approve(offer_id, actor).await?,
            AppointmentKind::SendEmailReminder => {
                offers.mark_sent_via_email_confirmed(offer_id, actor).await?
            }
            AppointmentKind::SiteVisit => {
                offers.record_site_visit_confirmed(offer_id, actor).await?
            }
            AppointmentKind::General => return Ok(None),
        };
        info!(
            "Confirmed {:?} appointment {} resolved into offer {} ({})",
            appointment.kind,
            appointment.id,
            offer.id,
            offer.state.as_str()
        );
        Ok(Some(offer))
    }

    fn next_day_at(&self, hour: u32) -> ApiResult<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| {
            AppError::InternalError(format!("Invalid approval task hour: {}", hour))
        })?;
        let date = (self.clock.now() + Duration::days(1)).date_naive();
        Ok(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
    }
}
