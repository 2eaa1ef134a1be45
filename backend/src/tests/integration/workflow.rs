//! Full workflow scenarios spanning both engines and the dispatcher.

use chrono::Duration;
use uuid::Uuid;

use crate::services::offers::OfferOutcome;
use crate::store::AppointmentFilter;
use crate::tests::fixtures::{analysis_data, analysis_with_deadline, processing_data};
use crate::tests::{member, TestContext};
use cantiere_shared::{AppointmentKind, OfferState, SendChannel};

#[tokio::test]
async fn private_tender_without_approval_reaches_sent_via_platform() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Ristrutturazione uffici".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let offer = ctx
        .offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Privata"))
        .await
        .unwrap();
    assert_eq!(offer.state, OfferState::PreliminaryAnalysis);

    let offer = ctx
        .offers
        .submit_processing(offer.id, &creator, processing_data(false, None))
        .await
        .unwrap();
    assert_eq!(offer.state, OfferState::Processed);
    assert_eq!(offer.current_phase, 2);

    let offer = ctx
        .offers
        .mark_sent_via_platform(offer.id, &creator)
        .await
        .unwrap();
    assert_eq!(offer.state, OfferState::Sent);
    assert_eq!(
        offer.review.as_ref().unwrap().sent_via,
        SendChannel::Platform
    );
}

#[tokio::test]
async fn approval_round_trip_through_the_derived_appointment() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let approver = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Nuova palazzina".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(offer.id, &creator, analysis_data("Gara Pubblica"))
        .await
        .unwrap();
    let offer = ctx
        .offers
        .submit_processing(offer.id, &creator, processing_data(true, Some(approver.id)))
        .await
        .unwrap();
    assert_eq!(offer.state, OfferState::PendingApproval);

    // The approver sees the derived task in their agenda and confirms
    // it, which flows back into the offer through the dispatcher.
    let tasks = ctx
        .negotiation
        .list(&AppointmentFilter {
            participant_id: Some(approver.id),
            kind: Some(AppointmentKind::ApprovalTask),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);

    let confirmed = ctx.negotiation.confirm(tasks[0].id, &approver).await.unwrap();
    let offer = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &approver, &ctx.offers)
        .await
        .unwrap()
        .expect("approval task resolves into the offer");
    assert_eq!(offer.state, OfferState::Approved);

    let offer = ctx
        .offers
        .mark_sent_via_platform(offer.id, &creator)
        .await
        .unwrap();
    let offer = ctx
        .offers
        .record_outcome(offer.id, &creator, OfferOutcome::Accepted)
        .await
        .unwrap();
    assert_eq!(offer.state, OfferState::Accepted);
}

#[tokio::test]
async fn expired_tender_is_recovered_with_an_extension_then_sent_by_email() {
    let ctx = TestContext::new();
    let creator = member(Uuid::new_v4());
    let colleague = member(Uuid::new_v4());

    let offer = ctx
        .offers
        .create_offer(
            &creator,
            Some("Manutenzione strade".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_analysis(
            offer.id,
            &creator,
            analysis_with_deadline("Gara Pubblica", ctx.now - Duration::hours(2)),
        )
        .await
        .unwrap();
    ctx.offers
        .submit_processing(offer.id, &creator, processing_data(false, None))
        .await
        .unwrap();

    // Past deadline: even requesting the email reminder is refused.
    let err = ctx
        .offers
        .request_email_send(offer.id, &creator, Some(colleague.id))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "DEADLINE_PASSED");

    ctx.offers.log_extension(offer.id, &creator).await.unwrap();

    let reminder = ctx
        .offers
        .request_email_send(offer.id, &creator, Some(colleague.id))
        .await
        .unwrap();
    let confirmed = ctx
        .negotiation
        .confirm(reminder.id, &colleague)
        .await
        .unwrap();
    let offer = ctx
        .dispatcher
        .resolve_confirmed(&confirmed, &colleague, &ctx.offers)
        .await
        .unwrap()
        .expect("email reminder resolves into the offer");

    assert_eq!(offer.state, OfferState::Sent);
    let review = offer.review.as_ref().unwrap();
    assert_eq!(review.sent_via, SendChannel::Email);
    assert_eq!(review.confirmed_by, Some(colleague.id));
    assert_eq!(offer.extension_log.len(), 1);
}
