//! # Request Lifecycle Scenarios
//!
//! ```text
//! A: fulfilled before the timeout          -> Fulfilled, no credential
//! B: no fulfillment, sweep after timeout   -> Compensated, one credential
//! C: fulfillment after compensation        -> AlreadyTerminal, credential still redeemable
//! D: fulfillment submitted by a contract   -> UnauthorizedCaller, state unchanged
//! E: replayed fulfillment                  -> first applied, second AlreadyTerminal
//! ```

use shared_bus::{EventFilter, EventTopic, VrfEvent};
use shared_types::{Caller, U256};
use xv_02_request_ledger::{
    AuthFailure, CompensationApi, LedgerError, RequestLedgerApi, RequestStatus,
};

use super::fixtures::{fulfillment_for, Harness, ALICE, BOB, CAROL, TIMEOUT};

/// Creates requests 1, 2 and 3 at t=0, each from a different requester.
async fn three_requests(h: &Harness) -> (U256, U256, U256) {
    let id1 = h.create(ALICE, 0).await;
    let id2 = h.create(BOB, 0).await;
    let id3 = h.create(CAROL, 0).await;
    assert_eq!((id1, id2, id3), (U256::from(1), U256::from(2), U256::from(3)));
    (id1, id2, id3)
}

// =============================================================================
// SCENARIO A: FULFILLED IN TIME
// =============================================================================

#[tokio::test]
async fn test_scenario_a_fulfilled_before_timeout() {
    let h = Harness::new();
    let (id1, _, _) = three_requests(&h).await;

    let fulfillments = h.capture_fulfillments(5).await;
    let msg = fulfillment_for(&fulfillments, id1);
    assert_eq!(h.submit(msg, 5).await, Ok(id1));

    let request = h.container.ledger.get_request(id1).unwrap();
    assert_eq!(request.status, RequestStatus::Fulfilled);
    assert!(request.random_value.is_some());
    assert_eq!(request.resolved_at, Some(5));
    assert!(h.container.compensation.credential_for_request(id1).is_none());
    assert_eq!(h.consumer.deliveries_for(id1), 1);

    // A sweep long after the timeout leaves the fulfilled request alone
    let report = h.container.compensation.sweep_timeouts(TIMEOUT + 1).await;
    assert!(report.compensated.iter().all(|c| c.request_id != id1));
    assert!(h.container.compensation.credential_for_request(id1).is_none());
}

// =============================================================================
// SCENARIO B: TIMED OUT
// =============================================================================

#[tokio::test]
async fn test_scenario_b_compensated_after_timeout() {
    let h = Harness::new();
    let (_, id2, _) = three_requests(&h).await;
    h.container.transport.drop_in_flight(h.source_chain());

    // Exactly at the timeout nothing happens
    let at_timeout = h.container.compensation.sweep_timeouts(TIMEOUT).await;
    assert_eq!(at_timeout.count(), 0);
    assert_eq!(h.status(id2), RequestStatus::Pending);

    let report = h.container.compensation.sweep_timeouts(TIMEOUT + 1).await;
    assert_eq!(report.count(), 3);
    assert_eq!(h.status(id2), RequestStatus::Compensated);

    let held = h.container.compensation.credentials_of(&BOB);
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].source_request_id, id2);
    assert_eq!(held[0].original_requester, BOB);
    assert!(!held[0].redeemed);

    // A second sweep mints nothing more
    let again = h.container.compensation.sweep_timeouts(TIMEOUT + 50).await;
    assert_eq!(again.count(), 0);
    assert_eq!(h.container.compensation.credentials_of(&BOB).len(), 1);
    assert_eq!(h.consumer.deliveries_for(id2), 0);
}

// =============================================================================
// SCENARIO C: LATE FULFILLMENT
// =============================================================================

#[tokio::test]
async fn test_scenario_c_late_fulfillment_rejected() {
    let h = Harness::new();
    let (_, _, id3) = three_requests(&h).await;

    // The requests stay in flight past the timeout
    let report = h.container.compensation.sweep_timeouts(TIMEOUT + 1).await;
    assert!(report.compensated.iter().any(|c| c.request_id == id3));
    let credential = h
        .container
        .compensation
        .credential_for_request(id3)
        .expect("credential minted");

    let fulfillments = h.capture_fulfillments(150).await;
    assert_eq!(fulfillments.len(), 3);
    for msg in &fulfillments {
        let result = h.submit(msg, 150).await;
        assert!(matches!(
            result,
            Err(LedgerError::AlreadyTerminal {
                status: RequestStatus::Compensated,
                ..
            })
        ));
    }

    let request = h.container.ledger.get_request(id3).unwrap();
    assert_eq!(request.status, RequestStatus::Compensated);
    assert!(request.random_value.is_none());
    assert_eq!(h.consumer.deliveries_for(id3), 0);

    let receipt = h
        .container
        .compensation
        .redeem(credential.id, &Caller::account(CAROL), 160)
        .await
        .expect("credential still redeemable");
    assert_eq!(receipt.source_request_id, id3);
}

// =============================================================================
// SCENARIO D: CONTRACT CALLER
// =============================================================================

#[tokio::test]
async fn test_scenario_d_contract_caller_rejected() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    let fulfillments = h.capture_fulfillments(5).await;
    let msg = &fulfillments[0];

    let contract = Caller::contract(h.container.config.relayer);
    let result = h.submit_as(&contract, msg, 5).await;
    assert_eq!(
        result,
        Err(LedgerError::UnauthorizedCaller(AuthFailure::ContractCaller))
    );

    let request = h.container.ledger.get_request(id).unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.random_value.is_none());
    assert_eq!(h.consumer.deliveries_for(id), 0);

    let security = h
        .container
        .bus
        .history(&EventFilter::topics(vec![EventTopic::Security]));
    assert!(security.iter().any(|e| matches!(
        e,
        VrfEvent::AuthorizationFailed { caller, .. } if *caller == h.container.config.relayer
    )));

    // The same message from the relayer account is accepted
    assert_eq!(h.submit(msg, 6).await, Ok(id));
}

// =============================================================================
// SCENARIO E: REPLAY
// =============================================================================

#[tokio::test]
async fn test_scenario_e_replayed_fulfillment() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    let fulfillments = h.capture_fulfillments(5).await;
    let msg = &fulfillments[0];

    assert_eq!(h.submit(msg, 5).await, Ok(id));
    let first_value = h.container.ledger.get_request(id).unwrap().random_value;

    let replay = h.submit(msg, 6).await;
    assert_eq!(
        replay,
        Err(LedgerError::AlreadyTerminal {
            id,
            status: RequestStatus::Fulfilled,
        })
    );

    let request = h.container.ledger.get_request(id).unwrap();
    assert_eq!(request.random_value, first_value);
    assert_eq!(request.resolved_at, Some(5));
    assert_eq!(h.consumer.deliveries_for(id), 1);
}
