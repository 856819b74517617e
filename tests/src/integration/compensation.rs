//! # Credential Lifecycle Tests
//!
//! Credentials minted by the sweep, moved between holders and redeemed,
//! with the relay still running around them.

use node_runtime::NodeConfig;
use shared_bus::{EventFilter, EventTopic, VrfEvent};
use shared_types::Caller;
use xv_02_request_ledger::{CompensationApi, LedgerError, RequestLedgerApi, RequestStatus};

use super::fixtures::{Harness, ALICE, BOB, CAROL, TIMEOUT};

#[tokio::test]
async fn test_credential_redeemed_once() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    h.driver.sweep(TIMEOUT + 1).await;

    let credential = h.container.compensation.credential_for_request(id).unwrap();
    let alice = Caller::account(ALICE);

    let receipt = h
        .container
        .compensation
        .redeem(credential.id, &alice, 200)
        .await
        .unwrap();
    assert_eq!(receipt.owner, ALICE);
    assert_eq!(receipt.redeemed_at, 200);

    assert_eq!(
        h.container.compensation.redeem(credential.id, &alice, 201).await,
        Err(LedgerError::AlreadyRedeemed(credential.id))
    );
    let stored = h.container.compensation.credential(credential.id).unwrap();
    assert!(stored.redeemed);
    assert_eq!(stored.redeemed_at, Some(200));
    assert_eq!(h.container.ledger.metrics().credentials_redeemed, 1);

    let redemptions = h
        .container
        .bus
        .history(&EventFilter::topics(vec![EventTopic::Compensation]))
        .into_iter()
        .filter(|e| matches!(e, VrfEvent::CredentialRedeemed { .. }))
        .count();
    assert_eq!(redemptions, 1);
}

#[tokio::test]
async fn test_transferred_credential_redeemed_by_new_holder() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    h.driver.sweep(TIMEOUT + 1).await;
    let credential = h.container.compensation.credential_for_request(id).unwrap();

    h.container
        .compensation
        .transfer(credential.id, &Caller::account(ALICE), BOB, 150)
        .await
        .unwrap();
    assert!(h.container.compensation.credentials_of(&ALICE).is_empty());
    assert_eq!(h.container.compensation.credentials_of(&BOB).len(), 1);

    assert_eq!(
        h.container
            .compensation
            .redeem(credential.id, &Caller::account(ALICE), 160)
            .await,
        Err(LedgerError::NotOwner(credential.id))
    );
    let receipt = h
        .container
        .compensation
        .redeem(credential.id, &Caller::account(BOB), 161)
        .await
        .unwrap();
    assert_eq!(receipt.owner, BOB);

    // The credential still names the requester it compensated
    let stored = h.container.compensation.credential(credential.id).unwrap();
    assert_eq!(stored.original_requester, ALICE);

    assert_eq!(
        h.container
            .compensation
            .transfer(credential.id, &Caller::account(BOB), CAROL, 170)
            .await,
        Err(LedgerError::AlreadyRedeemed(credential.id))
    );
}

#[tokio::test]
async fn test_fulfilled_and_compensated_requesters_in_one_run() {
    let h = Harness::new();
    let served = h.create(ALICE, 0).await;
    let starved = h.create(BOB, 0).await;

    // Only the first request makes it across
    let inbound = h.container.transport.take_for(h.source_chain());
    for msg in inbound.into_iter().take(1) {
        h.container.transport.inject(msg);
    }
    h.driver.relay_round(10).await;
    h.driver.sweep(TIMEOUT + 1).await;

    assert_eq!(h.status(served), RequestStatus::Fulfilled);
    assert_eq!(h.status(starved), RequestStatus::Compensated);
    assert!(h.container.compensation.credentials_of(&ALICE).is_empty());
    assert_eq!(h.container.compensation.credentials_of(&BOB).len(), 1);
    assert!((h.container.ledger.compensation_rate() - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_sweep_batch_limit_spreads_compensation() {
    let mut config = NodeConfig::default();
    config.compensation.timeout_secs = TIMEOUT;
    config.compensation.max_sweep_batch = 2;
    config.source = config.source.with_destination_timeout(TIMEOUT);
    let h = Harness::from_config(config);
    for _ in 0..5 {
        h.create(ALICE, 0).await;
    }

    let first = h.driver.sweep(TIMEOUT + 1).await;
    assert_eq!(first.count(), 2);
    assert!(first.batch_limited);
    assert_eq!(first.still_pending, 3);

    h.driver.sweep(TIMEOUT + 2).await;
    let last = h.driver.sweep(TIMEOUT + 3).await;
    assert_eq!(last.count(), 1);
    assert!(!last.batch_limited);
    assert_eq!(h.container.compensation.credentials_of(&ALICE).len(), 5);
}

#[tokio::test]
async fn test_token_uri_follows_base_uri() {
    let h = Harness::new();
    let id = h.create(ALICE, 0).await;
    h.driver.sweep(TIMEOUT + 1).await;
    let credential = h.container.compensation.credential_for_request(id).unwrap();

    let admin = Caller::account(h.container.config.ledger.admin);
    h.container
        .compensation
        .set_base_uri(&admin, "ipfs://credentials/".into(), 120)
        .await
        .unwrap();
    assert_eq!(
        h.container.compensation.token_uri(credential.id),
        Ok(format!("ipfs://credentials/{}", credential.id))
    );

    assert!(matches!(
        h.container
            .compensation
            .set_base_uri(&Caller::account(ALICE), "https://evil/".into(), 121)
            .await,
        Err(LedgerError::NotAdmin(_))
    ));
    assert_eq!(
        h.container.compensation.token_uri(credential.id + 1),
        Err(LedgerError::UnknownCredential(credential.id + 1))
    );
}

#[tokio::test]
async fn test_registered_entries_alongside_swept_requests() {
    let h = Harness::new();
    let admin = Caller::account(h.container.config.ledger.admin);
    let swept = h.create(ALICE, 0).await;
    h.container.transport.drop_in_flight(h.source_chain());

    let entry = h
        .container
        .compensation
        .register_entry(&admin, ALICE, 750, 10)
        .await
        .unwrap();
    h.container
        .compensation
        .register_entry(&admin, BOB, 300, 11)
        .await
        .unwrap();
    assert_ne!(entry.request_id, swept);

    h.driver.sweep(TIMEOUT + 1).await;
    assert_eq!(h.status(swept), RequestStatus::Compensated);
    assert_eq!(h.status(entry.request_id), RequestStatus::Compensated);

    let c = &h.container.compensation;
    let default_value = h.container.config.compensation.credential_value;
    assert_eq!(c.credential_count_of(&ALICE), 2);
    assert_eq!(c.outstanding_value_of(&ALICE), 750 + default_value);
    assert_eq!(c.credentials_of(&BOB)[0].value, 300);

    // Entries never reach the source chain
    assert_eq!(h.container.provider.submissions(), 0);
    assert_eq!(h.container.ledger.stats().compensated, 3);

    let receipt = c
        .redeem(entry.credential_id, &Caller::account(ALICE), 20)
        .await
        .unwrap();
    assert_eq!(receipt.value, 750);
    assert_eq!(c.outstanding_value_of(&ALICE), default_value);

    assert!(matches!(
        c.register_entry(&Caller::account(CAROL), CAROL, 1, 30).await,
        Err(LedgerError::NotAdmin(_))
    ));
    assert_eq!(c.credential_count_of(&CAROL), 0);
}
