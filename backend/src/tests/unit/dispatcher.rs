use chrono::{Duration, Timelike};
use uuid::Uuid;

use crate::store::AppointmentFilter;
use crate::tests::fixtures::{analysis_data, complete_site_visit_plan, processing_data};
use crate::tests::{member, TestContext};
use cantiere_shared::{AppointmentKind, AppointmentState, OfferState};

#[tokio::test]
async fn approval_task_is_due_the_next_day_at_the_configured_hour() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let approver = Uuid::new_v4();

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Gara ponte".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Pubblica"))
        .await
        .unwrap();
    ctx.offers
        .submit_processing(offer.id, &creator, processing_data(true, Some(approver)))
        .await
        .unwrap();

    let tasks = ctx
        .store
        .query_appointments(&AppointmentFilter {
            linked_offer_id: Some(offer.id),
            kind: Some(AppointmentKind::ApprovalTask),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    let due = tasks[0].start;
    assert_eq!(due.date_naive(), (ctx.now + Duration::days(1)).date_naive());
    assert_eq!(due.hour(), 9);
    assert_eq!(due.minute(), 0);
}

#[tokio::test]
async fn email_reminder_fires_after_the_configured_lead_time() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Gara scuola".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Privata"))
        .await
        .unwrap();
    ctx.offers
        .submit_processing(offer.id, &creator, processing_data(false, None))
        .await
        .unwrap();

    let reminder = ctx
        .offers
        .request_email_send(offer.id, &creator, None)
        .await
        .unwrap();
    assert_eq!(reminder.start, ctx.now + Duration::minutes(60));
}

#[tokio::test]
async fn confirmed_approval_task_resolves_into_an_approved_offer() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let approver = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Gara capannone".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Privata"))
        .await
        .unwrap();
    ctx.offers
        .submit_processing(offer.id, &creator, processing_data(true, Some(approver.id)))
        .await
        .unwrap();

    let tasks = ctx
        .store
        .query_appointments(&AppointmentFilter {
            linked_offer_id: Some(offer.id),
            kind: Some(AppointmentKind::ApprovalTask),
            ..Default::default()
        })
        .await
        .unwrap();
    let confirmed = ctx
        .negotiation
        .confirm(tasks[0].id, &approver)
        .await
        .unwrap();
    assert_eq!(confirmed.state, AppointmentState::Confirmed);

    let resolved = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &approver, &ctx.offers)
        .await
        .unwrap()
        .expect("approval task carries an offer follow-up");
    assert_eq!(resolved.state, OfferState::Approved);
    assert_eq!(resolved.current_phase, 3);
}

#[tokio::test]
async fn confirmed_email_reminder_resolves_into_a_sent_offer() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let colleague = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Gara piazzale".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Privata"))
        .await
        .unwrap();
    ctx.offers
        .submit_processing(offer.id, &creator, processing_data(false, None))
        .await
        .unwrap();

    let reminder = ctx
        .offers
        .request_email_send(offer.id, &creator, Some(colleague.id))
        .await
        .unwrap();
    assert_eq!(reminder.state, AppointmentState::PendingConfirmation);

    let confirmed = ctx
        .negotiation
        .confirm(reminder.id, &colleague)
        .await
        .unwrap();
    let resolved = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &colleague, &ctx.offers)
        .await
        .unwrap()
        .expect("email reminder carries an offer follow-up");
    assert_eq!(resolved.state, OfferState::Sent);
    assert_eq!(
        resolved.review.as_ref().unwrap().confirmed_by,
        Some(colleague.id)
    );
}

#[tokio::test]
async fn confirmed_site_visit_marks_the_plan_and_notifies_the_creator() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let assignee = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Gara villa".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    let mut data = analysis_data("Gara Privata");
    data.site_visit = Some(complete_site_visit_plan(
        assignee.id,
        ctx.now + Duration::days(2),
    ));
    ctx.offers
        .submit_analysis(offer.id, &creator, data)
        .await
        .unwrap();

    let visits = ctx
        .store
        .query_appointments(&AppointmentFilter {
            linked_offer_id: Some(offer.id),
            kind: Some(AppointmentKind::SiteVisit),
            ..Default::default()
        })
        .await
        .unwrap();
    let confirmed = ctx
        .negotiation
        .confirm(visits[0].id, &assignee)
        .await
        .unwrap();

    let resolved = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &assignee, &ctx.offers)
        .await
        .unwrap()
        .expect("site visit carries an offer follow-up");
    assert!(resolved
        .analysis
        .as_ref()
        .unwrap()
        .site_visit
        .as_ref()
        .unwrap()
        .confirmed);

    let inbox = ctx
        .store
        .query_notifications(creator.id, true)
        .await
        .unwrap();
    assert!(inbox
        .iter()
        .any(|n| n.kind == "site_visit_confirmed" && n.reference_id == Some(offer.id)));
}

#[tokio::test]
async fn ordinary_appointments_resolve_to_nothing() {
    let ctx = TestContext::new();
    let organizer = member(Uuid::new_v4());
    let invitee = member(Uuid::new_v4());

    let appointment = ctx
        .negotiation
        .create(
            &organizer,
            crate::tests::fixtures::appointment_draft(
                Uuid::new_v4(),
                "Weekly sync",
                ctx.now + Duration::days(1),
                &[invitee.id],
            ),
        )
        .await
        .unwrap();
    let confirmed = ctx
        .negotiation
        .confirm(appointment.id, &invitee)
        .await
        .unwrap();

    let resolved = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &invitee, &ctx.offers)
        .await
        .unwrap();
    assert!(resolved.is_none());
}
