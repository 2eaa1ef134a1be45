//! Appointment negotiation engine.
//!
//! Implements the ping-pong confirmation protocol between an organizer
//! and their invitees. At any moment exactly one side holds the
//! action-required token: invitees while `PendingConfirmation`, the
//! organizer while `ChangeProposed`. Transitions are resolved through
//! an explicit lookup rather than scattered role checks so the turn
//! invariant stays mechanically checkable.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ApiResult, AppError};
use crate::identity::Actor;
use crate::notifications::{notification, Notifier};
use crate::store::{AppointmentFilter, Store};
use crate::validation;
use cantiere_shared::{
    Appointment, AppointmentKind, AppointmentState, HistoryAction, HistoryEntry, Participant,
    ParticipantRole,
};

/// Which side of the negotiation an actor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Organizer,
    Invitee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationAction {
    Confirm,
    Reject,
    Propose,
}

/// Transition table for the ping-pong protocol.
///
/// The side that holds the token may confirm, reject or propose;
/// proposing hands the token to the other side. The non-holding side
/// is refused with `PermissionDenied`, terminal states with
/// `InvalidTransition`.
pub fn transition(
    state: AppointmentState,
    side: Side,
    action: NegotiationAction,
) -> ApiResult<AppointmentState> {
    use AppointmentState::*;
    use NegotiationAction::*;

    match (state, side, action) {
        (PendingConfirmation, Side::Invitee, Confirm) => Ok(Confirmed),
        (PendingConfirmation, Side::Invitee, Reject) => Ok(Rejected),
        (PendingConfirmation, Side::Invitee, Propose) => Ok(ChangeProposed),
        (PendingConfirmation, Side::Organizer, _) => Err(AppError::permission_denied(
            "Waiting on an invitee response; it is not the organizer's turn",
        )),
        (ChangeProposed, Side::Organizer, Confirm) => Ok(Confirmed),
        (ChangeProposed, Side::Organizer, Reject) => Ok(Rejected),
        (ChangeProposed, Side::Organizer, Propose) => Ok(PendingConfirmation),
        (ChangeProposed, Side::Invitee, _) => Err(AppError::permission_denied(
            "A change was proposed; it is the organizer's turn to respond",
        )),
        (Confirmed, _, _) => Err(AppError::invalid_transition(
            "Appointment is already confirmed",
        )),
        (Rejected, _, _) => Err(AppError::invalid_transition(
            "Appointment was rejected; create a new one to retry",
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentDraft {
    pub company_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default = "default_kind")]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub linked_template_id: Option<Uuid>,
    pub linked_offer_id: Option<Uuid>,
}

fn default_kind() -> AppointmentKind {
    AppointmentKind::General
}

/// Field-level changes carried by a proposal or an edit. Absent fields
/// are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AppointmentChanges {
    fn apply(&self, appointment: &mut Appointment) {
        if let Some(title) = &self.title {
            appointment.title = title.clone();
        }
        if let Some(description) = &self.description {
            appointment.description = Some(description.clone());
        }
        if let Some(start) = self.start {
            appointment.start = start;
        }
        if let Some(end) = self.end {
            appointment.end = Some(end);
        }
    }
}

pub struct NegotiationService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl NegotiationService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Appointment> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Appointment {}", id)))
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> ApiResult<Vec<Appointment>> {
        Ok(self.store.query_appointments(filter).await?)
    }

    /// Create an appointment. The initiator always becomes the
    /// organizer; every other participant is forced to the invitee
    /// role. A self-only appointment is confirmed immediately, anything
    /// else opens a negotiation with the invitees to respond.
    pub async fn create(&self, actor: &Actor, draft: AppointmentDraft) -> ApiResult<Appointment> {
        let title = validation::string::required(&draft.title, "title")?;
        if let Some(end) = draft.end {
            validation::datetime::valid_range(&draft.start, &end, "start", "end")?;
        }

        let mut participants: Vec<Participant> = Vec::new();
        let mut seen = HashSet::new();
        for p in &draft.participants {
            if !seen.insert(p.user_id) {
                return Err(AppError::validation_single(
                    "participants",
                    "Participants must be unique by user id",
                ));
            }
            let role = if p.user_id == actor.id {
                ParticipantRole::Organizer
            } else {
                ParticipantRole::Invitee
            };
            participants.push(Participant {
                user_id: p.user_id,
                role,
            });
        }
        if !seen.contains(&actor.id) {
            participants.insert(
                0,
                Participant {
                    user_id: actor.id,
                    role: ParticipantRole::Organizer,
                },
            );
        }

        let has_invitees = participants.iter().any(|p| p.user_id != actor.id);
        let state = if has_invitees {
            AppointmentState::PendingConfirmation
        } else {
            AppointmentState::Confirmed
        };

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            company_id: draft.company_id,
            title,
            description: validation::string::optional(&draft.description),
            start: draft.start,
            end: draft.end,
            kind: draft.kind,
            participants,
            state,
            history: vec![HistoryEntry {
                action: HistoryAction::Created,
                actor_id: actor.id,
                at: now,
                message: None,
            }],
            linked_template_id: draft.linked_template_id,
            linked_offer_id: draft.linked_offer_id,
            created_by: actor.id,
            created_at: now,
            updated_at: None,
        };

        self.store.put_appointment(&appointment).await?;
        info!(
            "Appointment {} created by {} in state {}",
            appointment.id,
            actor.id,
            appointment.state.as_str()
        );

        self.notify_others(
            &appointment,
            actor.id,
            format!("You have been invited to \"{}\"", appointment.title),
            "appointment_invite",
        )
        .await;

        Ok(appointment)
    }

    /// Propose a change to a live negotiation. Only the token-holding
    /// side may propose; the token passes to the other side.
    pub async fn propose(
        &self,
        id: Uuid,
        actor: &Actor,
        changes: AppointmentChanges,
        message: Option<String>,
    ) -> ApiResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let side = self.side_of(&appointment, actor.id)?;
        let next = transition(appointment.state, side, NegotiationAction::Propose)?;

        changes.apply(&mut appointment);
        appointment.state = next;
        let now = self.clock.now();
        let action = match side {
            Side::Invitee => HistoryAction::Proposed,
            Side::Organizer => HistoryAction::CounterProposed,
        };
        appointment.history.push(HistoryEntry {
            action,
            actor_id: actor.id,
            at: now,
            message,
        });
        appointment.updated_at = Some(now);

        self.store.put_appointment(&appointment).await?;

        let text = match side {
            Side::Invitee => format!("A change was proposed for \"{}\"", appointment.title),
            Side::Organizer => format!(
                "The organizer counter-proposed a change for \"{}\"",
                appointment.title
            ),
        };
        self.notify_others(&appointment, actor.id, text, "appointment_proposal")
            .await;

        Ok(appointment)
    }

    pub async fn confirm(&self, id: Uuid, actor: &Actor) -> ApiResult<Appointment> {
        self.resolve(id, actor, NegotiationAction::Confirm).await
    }

    pub async fn reject(&self, id: Uuid, actor: &Actor) -> ApiResult<Appointment> {
        self.resolve(id, actor, NegotiationAction::Reject).await
    }

    async fn resolve(
        &self,
        id: Uuid,
        actor: &Actor,
        action: NegotiationAction,
    ) -> ApiResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let side = self.side_of(&appointment, actor.id)?;
        let next = transition(appointment.state, side, action)?;

        appointment.state = next;
        let now = self.clock.now();
        let (history_action, text, kind) = match action {
            NegotiationAction::Confirm => (
                HistoryAction::Confirmed,
                format!("\"{}\" was confirmed", appointment.title),
                "appointment_confirmed",
            ),
            NegotiationAction::Reject => (
                HistoryAction::Rejected,
                format!("\"{}\" was rejected", appointment.title),
                "appointment_rejected",
            ),
            NegotiationAction::Propose => unreachable!("propose is handled separately"),
        };
        appointment.history.push(HistoryEntry {
            action: history_action,
            actor_id: actor.id,
            at: now,
            message: None,
        });
        appointment.updated_at = Some(now);

        self.store.put_appointment(&appointment).await?;
        info!(
            "Appointment {} resolved to {} by {}",
            appointment.id,
            appointment.state.as_str(),
            actor.id
        );

        self.notify_others(&appointment, actor.id, text, kind).await;

        Ok(appointment)
    }

    /// Edit fields in place without a state change. The organizer may
    /// edit at any point; invitees only once the appointment is
    /// confirmed. A pending invitee edit must go through `propose`.
    pub async fn edit(
        &self,
        id: Uuid,
        actor: &Actor,
        changes: AppointmentChanges,
    ) -> ApiResult<Appointment> {
        let mut appointment = self.get(id).await?;
        let side = self.side_of(&appointment, actor.id)?;

        if side == Side::Invitee && appointment.state != AppointmentState::Confirmed {
            return Err(AppError::permission_denied(
                "Invitees cannot edit while a negotiation is open; propose a change instead",
            ));
        }

        changes.apply(&mut appointment);
        let now = self.clock.now();
        appointment.history.push(HistoryEntry {
            action: HistoryAction::Edited,
            actor_id: actor.id,
            at: now,
            message: None,
        });
        appointment.updated_at = Some(now);

        self.store.put_appointment(&appointment).await?;
        Ok(appointment)
    }

    /// Hard-remove an appointment. Organizer only.
    pub async fn delete(&self, id: Uuid, actor: &Actor) -> ApiResult<()> {
        let appointment = self.get(id).await?;
        let side = self.side_of(&appointment, actor.id)?;
        if side != Side::Organizer {
            return Err(AppError::permission_denied(
                "Only the organizer may delete an appointment",
            ));
        }
        self.store.delete_appointment(id).await?;
        info!("Appointment {} deleted by {}", id, actor.id);
        Ok(())
    }

    fn side_of(&self, appointment: &Appointment, actor_id: Uuid) -> ApiResult<Side> {
        let participant = appointment.participant(actor_id).ok_or_else(|| {
            AppError::permission_denied("Caller is not a participant of this appointment")
        })?;
        Ok(match participant.role {
            ParticipantRole::Organizer => Side::Organizer,
            ParticipantRole::Invitee => Side::Invitee,
        })
    }

    async fn notify_others(
        &self,
        appointment: &Appointment,
        actor_id: Uuid,
        message: String,
        kind: &str,
    ) {
        let at = self.clock.now();
        for p in appointment.participants.iter().filter(|p| p.user_id != actor_id) {
            self.notifier
                .enqueue(notification(
                    p.user_id,
                    message.clone(),
                    kind,
                    Some(appointment.id),
                    at,
                ))
                .await;
        }
    }
}
