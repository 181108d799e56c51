//! Retention sweeper scenarios: trial expiry, purge eligibility, data
//! retention and resilience to per-tenant failures.

mod common;

use common::harness;
use tableside::domain::retention::RetentionDays;
use tableside::domain::subscription::{SubscriptionEventType, SubscriptionStatus};
use tableside::ports::TenantRepository;

#[tokio::test]
async fn expire_trials_twice_changes_nothing_the_second_time() {
    let h = harness();
    h.register("cafe-one").await;
    h.register("cafe-two").await;
    h.clock.advance_days(8);

    let first = h.services.sweeper.expire_trials().await.unwrap();
    let second = h.services.sweeper.expire_trials().await.unwrap();

    assert_eq!(first.affected, 2);
    assert_eq!(second.affected, 0);
}

#[tokio::test]
async fn expire_trials_leaves_paying_tenants_alone() {
    let h = harness();
    let paid = h.register("paid").await;
    h.services
        .activate_subscription
        .handle(tableside::application::ActivateSubscriptionCommand {
            tenant_id: paid.id,
            plan: "basic".to_string(),
            payment_id: "pay_1".to_string(),
        })
        .await
        .unwrap();
    h.clock.advance_days(8);

    let outcome = h.services.sweeper.expire_trials().await.unwrap();

    assert_eq!(outcome.affected, 0);
    assert_eq!(h.reload(&paid).await.unwrap().status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn unpaid_tenant_is_purged_but_paid_twin_survives() {
    let h = harness();
    let unpaid = h.register("unpaid").await;
    let twin = h.register("twin").await;
    for tenant in [&unpaid, &twin] {
        h.store.add_order(tenant.id, 25_000, h.now());
        h.store.add_menu_items(tenant.id, 20);
        h.store.add_tables(tenant.id, 6);
    }

    h.clock.advance_days(8);
    h.services.sweeper.expire_trials().await.unwrap();

    // Identical except for a recorded payment.
    let mut twin_state = h.reload(&twin).await.unwrap();
    twin_state.last_payment_date = Some(h.now());
    h.store.seed_tenant(twin_state);

    h.clock.advance_days(365);
    let outcome = h.services.sweeper.purge_inactive_tenants().await.unwrap();

    assert_eq!(outcome.affected, 1);
    assert!(h.reload(&unpaid).await.is_none());
    assert_eq!(h.store.order_count(&unpaid.id), 0);
    assert_eq!(h.store.menu_item_count(&unpaid.id), 0);
    assert_eq!(h.store.table_count(&unpaid.id), 0);

    assert!(h.reload(&twin).await.is_some());
    assert_eq!(h.store.order_count(&twin.id), 1);
    assert_eq!(h.store.menu_item_count(&twin.id), 20);

    let deleted = h.store.events_for_tenant(&unpaid.id).await.unwrap();
    assert_eq!(deleted.last().unwrap().event_type, SubscriptionEventType::AccountDeleted);
}

#[tokio::test]
async fn signup_to_purge_timeline() {
    let h = harness();
    let t0 = h.now();
    let tenant = h.register("timeline").await;

    // T0 + 8d: trial expired and deactivated
    h.clock.set(t0.add_days(8));
    h.services.sweeper.expire_trials().await.unwrap();
    let expired = h.reload(&tenant).await.unwrap();
    assert_eq!(expired.status, SubscriptionStatus::TrialExpired);
    assert!(!expired.is_active);

    // T0 + 8d + 30d: still inside the threshold
    h.clock.set(t0.add_days(38));
    h.services.sweeper.purge_inactive_tenants().await.unwrap();
    assert!(h.reload(&tenant).await.is_some());

    // T0 + 8d + 31d: deleted
    h.clock.set(t0.add_days(39));
    let outcome = h.services.sweeper.purge_inactive_tenants().await.unwrap();
    assert_eq!(outcome.affected, 1);
    assert!(h.reload(&tenant).await.is_none());
}

#[tokio::test]
async fn payment_between_selection_and_delete_saves_tenant() {
    let h = harness();
    let tenant = h.register("late-payer").await;
    h.clock.advance_days(8);
    h.services.sweeper.expire_trials().await.unwrap();
    h.clock.advance_days(40);

    let now = h.now();
    let candidates = h.store.find_purge_candidates(now, 31).await.unwrap();
    assert_eq!(candidates.len(), 1);

    h.services
        .activate_subscription
        .handle(tableside::application::ActivateSubscriptionCommand {
            tenant_id: tenant.id,
            plan: "basic".to_string(),
            payment_id: "pay_late".to_string(),
        })
        .await
        .unwrap();

    let purged = h.store.purge_tenant(&tenant.id, now, 31).await.unwrap();
    assert!(purged.is_none());
    assert_eq!(h.reload(&tenant).await.unwrap().status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn sweep_continues_past_a_failing_tenant() {
    let h = harness();
    let broken = h.register("broken").await;
    let healthy = h.register("healthy").await;
    h.store.fail_writes_for(broken.id);
    h.clock.advance_days(8);

    let report = h.services.sweeper.run_all().await;

    assert_eq!(report.trials_expired.affected, 1);
    assert_eq!(report.trials_expired.failed, 1);
    assert!(report.has_failures());
    assert_eq!(
        h.reload(&healthy).await.unwrap().status,
        SubscriptionStatus::TrialExpired
    );
    assert_eq!(h.reload(&broken).await.unwrap().status, SubscriptionStatus::Trial);
}

#[tokio::test]
async fn operational_purge_uses_caller_window() {
    let h = harness();
    let tenant = h.register("cafe").await;
    let now = h.now();
    h.store.add_order(tenant.id, 1_000, now.minus_days(40));
    h.store.add_order(tenant.id, 1_000, now.minus_days(5));

    let counts = h
        .services
        .sweeper
        .purge_old_operational_data(RetentionDays::new(30).unwrap())
        .await
        .unwrap();

    assert_eq!(counts.orders, 1);
    assert_eq!(h.store.order_count(&tenant.id), 1);
    assert_eq!(h.store.deletion_logs()[0].days_retained, 30);
}
