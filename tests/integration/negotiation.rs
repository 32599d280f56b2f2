//! Negotiation lifecycle: quoting, countering, accepting, rejecting

use std::sync::Arc;

use loomline::config::WorkflowConfig;
use loomline::domain::{DealRef, DealStatus, Party, ProductionStage};
use loomline::events::Event;
use loomline::WorkflowError;

use crate::common::{
    self, service, ContendedStore, FailingStore, BUYER, MANUFACTURER, OUTSIDER,
};

#[tokio::test]
async fn quote_and_accept_confirms_and_opens_production() {
    let service = service();
    let mut events = service.events().subscribe();

    service.create_deal(common::order_request(1)).await.unwrap();
    service.review(1, MANUFACTURER).await.unwrap();

    let deal = service
        .send_quote(1, MANUFACTURER, 12.5, 30, Some("first run discount".to_string()))
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::QuoteSent);
    assert_eq!(deal.last_offer_by, Some(Party::Manufacturer));
    // Commercial terms only bind on acceptance
    assert!(deal.unit_price.is_none());
    assert!(deal.total_price.is_none());

    let deal = service.accept_quote(1, BUYER, None).await.unwrap();
    assert_eq!(deal.status, DealStatus::Confirmed);
    assert_eq!(deal.unit_price, Some(12.5));
    assert_eq!(deal.total_price, Some(1250.0));
    assert_eq!(deal.target_days, Some(30));

    let tracker = service
        .store()
        .tracker_for_deal(DealRef::Order(1))
        .await
        .unwrap()
        .expect("acceptance creates the tracker");
    assert_eq!(tracker.current_stage, ProductionStage::Planning);
    assert_eq!(tracker.progress, 0);

    let mut saw_confirmed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::DealConfirmed {
            deal_id,
            tracker_id,
            ..
        } = event
        {
            assert_eq!(deal_id, 1);
            assert_eq!(tracker_id, tracker.id);
            saw_confirmed = true;
        }
    }
    assert!(saw_confirmed);
}

#[tokio::test]
async fn counter_offers_alternate_sides() {
    let service = service();
    service.create_deal(common::order_request(2)).await.unwrap();
    service.review(2, MANUFACTURER).await.unwrap();
    service
        .send_quote(2, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();

    let deal = service
        .counter_offer(2, BUYER, 11.0, 35, None)
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::CustomerQuoteSent);
    assert_eq!(deal.negotiation_rounds, 1);
    assert_eq!(deal.last_offer_by, Some(Party::Buyer));

    let deal = service
        .counter_offer(2, MANUFACTURER, 11.8, 32, None)
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::ManufacturerReviewingQuote);
    assert_eq!(deal.negotiation_rounds, 2);

    // Both proposals stay on file, each side owning its latest
    assert_eq!(deal.buyer_quote.as_ref().unwrap().unit_price, 11.0);
    assert_eq!(deal.manufacturer_quote.as_ref().unwrap().unit_price, 11.8);
}

#[tokio::test]
async fn accepting_a_buyer_counter_binds_its_terms() {
    let service = service();
    service.create_deal(common::order_request(3)).await.unwrap();
    service.review(3, MANUFACTURER).await.unwrap();
    service
        .send_quote(3, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();
    service.counter_offer(3, BUYER, 11.0, 35, None).await.unwrap();

    let deal = service.accept_quote(3, MANUFACTURER, None).await.unwrap();
    assert_eq!(deal.status, DealStatus::Confirmed);
    assert_eq!(deal.unit_price, Some(11.0));
    assert_eq!(deal.total_price, Some(1100.0));
}

#[tokio::test]
async fn the_offering_side_cannot_counter_or_accept_its_own_offer() {
    let service = service();
    service.create_deal(common::order_request(4)).await.unwrap();
    service.review(4, MANUFACTURER).await.unwrap();
    service
        .send_quote(4, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();

    let err = service
        .counter_offer(4, MANUFACTURER, 12.0, 30, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    let err = service.accept_quote(4, MANUFACTURER, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    // The deal is unchanged and the buyer can still act on the offer
    let deal = service.store().deal(4).await.unwrap().unwrap();
    assert_eq!(deal.status, DealStatus::QuoteSent);
    service.accept_quote(4, BUYER, None).await.unwrap();
}

#[tokio::test]
async fn acceptance_requires_an_open_offer() {
    let service = service();
    service.create_deal(common::order_request(5)).await.unwrap();
    service.review(5, MANUFACTURER).await.unwrap();

    let err = service.accept_quote(5, BUYER, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn configured_round_limit_caps_countering() {
    let mut config = WorkflowConfig::default();
    config.negotiation.max_rounds = Some(1);
    let service = common::service_with_config(config);

    service.create_deal(common::order_request(6)).await.unwrap();
    service.review(6, MANUFACTURER).await.unwrap();
    service
        .send_quote(6, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();
    service.counter_offer(6, BUYER, 11.0, 35, None).await.unwrap();

    let err = service
        .counter_offer(6, MANUFACTURER, 11.8, 32, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    // Accepting is still open after the cap
    service.accept_quote(6, MANUFACTURER, None).await.unwrap();
}

#[tokio::test]
async fn rejection_needs_a_reason_and_records_the_side() {
    let service = service();
    service.create_deal(common::order_request(7)).await.unwrap();
    service.review(7, MANUFACTURER).await.unwrap();
    service
        .send_quote(7, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();

    let err = service.reject_quote(7, BUYER, "  ").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    let deal = service
        .reject_quote(7, BUYER, "price above budget")
        .await
        .unwrap();
    assert_eq!(deal.status, DealStatus::RejectedByCustomer);
    assert_eq!(deal.rejection_reason.as_deref(), Some("price above budget"));

    // Terminal: nothing moves afterwards
    let err = service
        .send_quote(7, MANUFACTURER, 11.0, 30, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::TerminalState { .. }));
}

#[tokio::test]
async fn cancel_is_only_for_early_deals() {
    let service = service();
    service.create_deal(common::order_request(8)).await.unwrap();
    service.review(8, MANUFACTURER).await.unwrap();
    let deal = service.cancel_deal(8, BUYER).await.unwrap();
    assert_eq!(deal.status, DealStatus::Cancelled);

    // Once countering starts, cancellation is off the table
    service.create_deal(common::order_request(9)).await.unwrap();
    service.review(9, MANUFACTURER).await.unwrap();
    service
        .send_quote(9, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();
    service.counter_offer(9, BUYER, 11.0, 35, None).await.unwrap();
    let err = service.cancel_deal(9, BUYER).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn outsiders_cannot_touch_a_negotiation() {
    let service = service();
    service.create_deal(common::order_request(10)).await.unwrap();

    let err = service.review(10, OUTSIDER).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));

    // Party checks also stop the buyer from doing manufacturer work
    let err = service.review(10, BUYER).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
}

#[tokio::test]
async fn invalid_offers_are_rejected_up_front() {
    let service = service();
    service.create_deal(common::order_request(11)).await.unwrap();
    service.review(11, MANUFACTURER).await.unwrap();

    for (price, days) in [(0.0, 30), (-1.0, 30), (f64::NAN, 30), (12.5, 0), (12.5, -3)] {
        let err = service
            .send_quote(11, MANUFACTURER, price, days, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    let err = service
        .create_deal(loomline::domain::CreateDealRequest {
            quantity: 0,
            ..common::order_request(12)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));

    // Reusing an existing deal id is a caller mistake, not a store outage
    service.create_deal(common::order_request(16)).await.unwrap();
    let err = service
        .create_deal(common::order_request(16))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidInput(_)));
}

#[tokio::test]
async fn failed_acceptance_leaves_the_deal_untouched() {
    let service = common::service_with_store(Arc::new(FailingStore::new()));
    service.create_deal(common::order_request(13)).await.unwrap();
    service.review(13, MANUFACTURER).await.unwrap();
    service
        .send_quote(13, MANUFACTURER, 12.5, 30, None)
        .await
        .unwrap();

    let err = service.accept_quote(13, BUYER, None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Storage(_)));

    // Neither the status flip nor the tracker creation happened
    let deal = service.store().deal(13).await.unwrap().unwrap();
    assert_eq!(deal.status, DealStatus::QuoteSent);
    assert!(deal.unit_price.is_none());
    let tracker = service
        .store()
        .tracker_for_deal(DealRef::Order(13))
        .await
        .unwrap();
    assert!(tracker.is_none());
}

#[tokio::test]
async fn lost_write_races_surface_as_concurrent_modification() {
    let store = Arc::new(ContendedStore::new());
    let service = common::service_with_store(store.clone());
    service.create_deal(common::order_request(14)).await.unwrap();

    // The armed store bumps the stored version under this operation's read,
    // so its commit carries a stale precondition
    store.arm_deal();
    let err = service.review(14, MANUFACTURER).await.unwrap_err();
    assert!(matches!(err, WorkflowError::ConcurrentModification { .. }));
    assert!(err.is_retryable());

    // A retry re-reads the fresh version and succeeds
    let deal = service.review(14, MANUFACTURER).await.unwrap();
    assert_eq!(deal.status, DealStatus::Reviewed);
}

#[tokio::test]
async fn racing_operations_serialize_through_versions() {
    let service = Arc::new(service());
    service.create_deal(common::order_request(15)).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.review(15, MANUFACTURER).await })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    let mut wins = 0;
    for result in results {
        match result.unwrap() {
            Ok(deal) => {
                assert_eq!(deal.status, DealStatus::Reviewed);
                wins += 1;
            }
            // Losers either hit a stale version or see the reviewed deal
            Err(WorkflowError::ConcurrentModification { .. })
            | Err(WorkflowError::InvalidTransition { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);

    let deal = service.store().deal(15).await.unwrap().unwrap();
    assert_eq!(deal.status, DealStatus::Reviewed);
    assert_eq!(deal.version, 1);
}
