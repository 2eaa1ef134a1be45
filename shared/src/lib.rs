use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Organizer,
    Invitee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentState {
    PendingConfirmation,
    Confirmed,
    Rejected,
    ChangeProposed,
}

impl AppointmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::ChangeProposed => "change_proposed",
        }
    }

    /// Terminal with respect to the current negotiation round.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }
}

/// Machine-readable tag for appointments derived from offer transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentKind {
    General,
    SiteVisit,
    ApprovalTask,
    SendEmailReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Proposed,
    CounterProposed,
    Edited,
    Confirmed,
    Rejected,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Proposed => "proposed",
            Self::CounterProposed => "counter_proposed",
            Self::Edited => "edited",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub kind: AppointmentKind,
    pub participants: Vec<Participant>,
    pub state: AppointmentState,
    pub history: Vec<HistoryEntry>,
    pub linked_template_id: Option<Uuid>,
    pub linked_offer_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn organizer(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.role == ParticipantRole::Organizer)
    }

    pub fn invitees(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Invitee)
    }

    pub fn participant(&self, user_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferState {
    Draft,
    PreliminaryAnalysis,
    Processing,
    Processed,
    PendingApproval,
    Approved,
    Sent,
    Accepted,
    Rejected,
    Archived,
}

impl OfferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PreliminaryAnalysis => "preliminary_analysis",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Terminal with respect to phase advancement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Accepted | Self::Rejected | Self::Archived)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocument {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDocument {
    pub id: Uuid,
    pub doc_type: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Found,
    Missing,
    Expired,
}

/// Matcher output for a single required document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCheck {
    pub id: String,
    pub label: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<CompanyDocument>,
}

/// Planned site visit collected during preliminary analysis. The
/// appointment is only scheduled when date, assignee and form template
/// are all present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteVisitPlan {
    pub date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub form_template_id: Option<Uuid>,
    pub address: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
}

impl SiteVisitPlan {
    pub fn is_schedulable(&self) -> bool {
        self.date.is_some() && self.assignee_id.is_some() && self.form_template_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub tender_type: String,
    pub work_type: Option<String>,
    pub economic_value: Option<Decimal>,
    /// Submission deadline of the tender (gara).
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub required_documents: Vec<RequiredDocument>,
    pub site_visit: Option<SiteVisitPlan>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingData {
    pub proposed_discount_pct: Decimal,
    pub total_costs: Decimal,
    pub expected_timeline: String,
    pub approval_required: bool,
    pub approver_id: Option<Uuid>,
    #[serde(default)]
    pub document_report: Vec<DocumentCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendChannel {
    Platform,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewData {
    pub sent_via: SendChannel,
    pub sent_at: DateTime<Utc>,
    pub confirmed_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionEntry {
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalMeta {
    pub required: bool,
    pub approver_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Figures carried into the derived approval task description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub value: Decimal,
    pub discount_pct: Decimal,
    pub expected_profit: Decimal,
    pub timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub name: String,
    pub client_id: Uuid,
    pub company_id: Uuid,
    pub created_by: Uuid,
    pub state: OfferState,
    /// Next phase to complete: 0 analysis, 1 processing, 2 review gate, 3 submission.
    pub current_phase: u8,
    pub analysis: Option<AnalysisData>,
    pub processing: Option<ProcessingData>,
    pub review: Option<ReviewData>,
    pub extension_log: Vec<ExtensionEntry>,
    pub approval: ApprovalMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub kind: String,
    pub reference_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
