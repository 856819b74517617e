//! # Channel Delivery Tests
//!
//! The channel may duplicate, reorder or lose messages. These tests check
//! that each request still reaches exactly one terminal state and that
//! the provider is asked for randomness once per request.

use shared_bus::VrfEvent;
use shared_types::RequestId;
use xv_01_randomness_source::RandomnessSourceApi;
use xv_02_request_ledger::{
    AuthFailure, CompensationApi, ConsumerBehavior, LedgerError, RequestLedgerApi, RequestStatus,
};

use super::fixtures::{Harness, ALICE};

fn requester(n: u8) -> [u8; 20] {
    let mut address = [0x40; 20];
    address[19] = n;
    address
}

// =============================================================================
// DUPLICATES AND REORDERING
// =============================================================================

#[tokio::test]
async fn test_duplicate_inbound_single_vrf_call() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    let inbound = h.container.transport.take_for(h.source_chain()).remove(0);
    h.container.transport.inject(inbound.clone());
    h.container.transport.inject(inbound.clone());

    let report = h.driver.deliver_to_source(1).await;
    assert_eq!(report.submitted, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(h.container.provider.submissions(), 1);

    // Redelivery after the randomness was forwarded is still ignored
    h.driver.fulfill_vrf(2).await;
    h.container.transport.inject(inbound);
    let again = h.driver.deliver_to_source(3).await;
    assert_eq!(again.submitted, 0);
    assert_eq!(again.duplicates, 1);
    assert_eq!(h.container.provider.submissions(), 1);
    assert_eq!(h.container.source.metrics().duplicates_suppressed, 2);

    h.driver.deliver_to_ledger(4).await;
    assert_eq!(h.status(id), RequestStatus::Fulfilled);
    assert_eq!(h.consumer.deliveries_for(id), 1);
}

#[tokio::test]
async fn test_end_to_end_over_shuffling_duplicating_channel() {
    const REQUESTS: u8 = 8;

    for seed in 0..16u64 {
        let h = Harness::new();
        let mut ids: Vec<RequestId> = Vec::new();
        for n in 0..REQUESTS {
            ids.push(h.create(requester(n), 0).await);
        }

        let c = &h.container;
        c.transport.duplicate_in_flight();
        for msg in c.transport.take_shuffled(h.source_chain(), seed) {
            let _ = c.source.on_inbound_request(msg, 1).await;
        }
        assert_eq!(c.provider.submissions(), u64::from(REQUESTS), "seed {seed}");

        h.driver.fulfill_vrf(2).await;
        c.transport.duplicate_in_flight();
        let mut applied = 0;
        let mut rejected = 0;
        for msg in c.transport.take_shuffled(h.dest_chain(), seed.wrapping_mul(31)) {
            match h.submit(&msg, 3).await {
                Ok(_) => applied += 1,
                Err(LedgerError::AlreadyTerminal { .. }) => rejected += 1,
                Err(e) => panic!("seed {seed}: unexpected refusal {e}"),
            }
        }
        assert_eq!(applied, usize::from(REQUESTS), "seed {seed}");
        assert_eq!(rejected, usize::from(REQUESTS), "seed {seed}");

        for id in &ids {
            assert_eq!(h.status(*id), RequestStatus::Fulfilled, "seed {seed}");
            assert_eq!(h.consumer.deliveries_for(*id), 1, "seed {seed}");
        }
        assert_eq!(c.ledger.stats().fulfilled, u64::from(REQUESTS));
        assert_eq!(c.compensation.sweep_timeouts(10_000).await.count(), 0);
    }
}

#[tokio::test]
async fn test_mixed_outcomes_are_exclusive() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for n in 0..6 {
        ids.push(h.create(requester(n), 0).await);
    }

    // Half of the fulfillments are lost on the way back
    h.driver.deliver_to_source(1).await;
    h.driver.fulfill_vrf(1).await;
    let mut fulfillments = h.container.transport.take_for(h.dest_chain());
    fulfillments.truncate(3);
    for msg in &fulfillments {
        h.submit(msg, 2).await.unwrap();
    }

    let report = h.container.compensation.sweep_timeouts(500).await;
    assert_eq!(report.count(), 3);

    let stats = h.container.ledger.stats();
    assert_eq!(stats.fulfilled, 3);
    assert_eq!(stats.compensated, 3);
    assert_eq!(stats.pending, 0);
    for id in ids {
        let credential = h.container.compensation.credential_for_request(id);
        match h.status(id) {
            RequestStatus::Fulfilled => assert!(credential.is_none()),
            RequestStatus::Compensated => assert!(credential.is_some()),
            other => panic!("unexpected status {other:?}"),
        }
    }
}

// =============================================================================
// LOSS
// =============================================================================

#[tokio::test]
async fn test_send_failure_leaves_request_pending() {
    let h = Harness::new();
    h.container.transport.set_unavailable(true);
    let id = h.create(ALICE, 0).await;
    h.container.transport.set_unavailable(false);

    assert_eq!(h.status(id), RequestStatus::Pending);
    assert_eq!(h.container.ledger.metrics().request_send_failures, 1);
    assert_eq!(h.driver.relay_round(1).await.submitted, 0);

    h.driver.sweep(200).await;
    assert_eq!(h.status(id), RequestStatus::Compensated);
}

#[tokio::test]
async fn test_lost_fulfillment_resent_from_source() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    h.driver.deliver_to_source(1).await;
    h.driver.fulfill_vrf(1).await;
    h.container.transport.drop_in_flight(h.dest_chain());

    h.container.source.resend(id, 50).await.unwrap();
    h.driver.deliver_to_ledger(51).await;
    assert_eq!(h.status(id), RequestStatus::Fulfilled);
    assert_eq!(h.container.provider.submissions(), 1);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_forged_fulfillments_refused() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    let genuine = h.capture_fulfillments(1).await.remove(0);

    let mut wrong_sender = genuine.clone();
    wrong_sender.sender = [0x66; 20];
    assert!(matches!(
        h.submit(&wrong_sender, 2).await,
        Err(LedgerError::UnauthorizedCaller(AuthFailure::CoordinatorMismatch { .. }))
    ));

    let mut wrong_chain = genuine.clone();
    wrong_chain.src_chain = h.dest_chain();
    assert!(matches!(
        h.submit(&wrong_chain, 2).await,
        Err(LedgerError::UnauthorizedCaller(AuthFailure::UntrustedChain { .. }))
    ));

    let mut garbled = genuine.clone();
    garbled.payload.truncate(8);
    assert!(matches!(
        h.submit(&garbled, 2).await,
        Err(LedgerError::BadEncoding(_))
    ));

    assert_eq!(h.status(id), RequestStatus::Pending);
    assert_eq!(h.submit(&genuine, 3).await, Ok(id));
}

#[tokio::test]
async fn test_untrusted_peer_request_refused_at_source() {
    let h = Harness::new();
    h.create(ALICE, 0).await;
    let mut inbound = h.container.transport.take_for(h.source_chain()).remove(0);
    inbound.sender = [0x66; 20];
    h.container.transport.inject(inbound);

    let report = h.driver.deliver_to_source(1).await;
    assert_eq!(report.refused, 1);
    assert_eq!(h.container.provider.submissions(), 0);
    assert_eq!(h.container.source.metrics().auth_failures, 1);
}

// =============================================================================
// CONSUMER FAILURE
// =============================================================================

#[tokio::test]
async fn test_consumer_panic_does_not_revert_fulfillment() {
    let h = Harness::new();
    h.consumer.set_behavior(ConsumerBehavior::Panic);
    let id = h.create(ALICE, 0).await;

    let report = h.driver.relay_round(1).await;
    assert_eq!(report.fulfilled, 1);
    assert_eq!(h.status(id), RequestStatus::Fulfilled);
    assert_eq!(h.container.ledger.metrics().consumer_failures, 1);

    let history = h.container.bus.history_for(id);
    assert!(history
        .iter()
        .any(|e| matches!(e, VrfEvent::RequestFulfilled { .. })));
    assert!(history
        .iter()
        .any(|e| matches!(e, VrfEvent::ConsumerCallbackFailed { .. })));
}
