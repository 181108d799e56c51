//! Shared harness: every service wired over the in-memory store, a manual
//! clock, a recording mail transport and a mock gateway.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;

use tableside::adapters::{InMemoryStore, ManualClock, MockPaymentGateway, RecordingMailTransport};
use tableside::application::{CheckoutOrder, CreateCheckoutOrderCommand, RegisterTenantCommand};
use tableside::bootstrap::{Backends, ServiceSettings, Services};
use tableside::domain::foundation::Timestamp;
use tableside::domain::subscription::{compute_signature, Tenant};

pub const KEY_SECRET: &str = "test_key_secret";

pub struct Harness {
    pub store: InMemoryStore,
    pub clock: ManualClock,
    pub mail: RecordingMailTransport,
    pub gateway: MockPaymentGateway,
    pub services: Services,
}

pub fn harness() -> Harness {
    harness_at(Timestamp::now())
}

pub fn harness_at(start: Timestamp) -> Harness {
    let store = InMemoryStore::new();
    let clock = ManualClock::new(start);
    let mail = RecordingMailTransport::new();
    let gateway = MockPaymentGateway::new();
    let backends = Backends::in_memory(
        &store,
        Arc::new(gateway.clone()),
        Some(Arc::new(mail.clone())),
        Arc::new(clock.clone()),
    );
    let services = Services::wire(
        backends,
        ServiceSettings::with_secret(SecretString::new(KEY_SECRET.to_string())),
    );
    Harness {
        store,
        clock,
        mail,
        gateway,
        services,
    }
}

impl Harness {
    /// Signs up a restaurant through the public handler.
    pub async fn register(&self, slug: &str) -> Tenant {
        self.services
            .register_tenant
            .handle(RegisterTenantCommand {
                name: format!("Restaurant {}", slug),
                slug: Some(slug.to_string()),
                owner_email: format!("owner@{}.in", slug),
                password_hash: "$argon2id$v=19$hash".to_string(),
            })
            .await
            .expect("registration succeeds")
            .tenant
    }

    /// Opens a gateway order for `plan`.
    pub async fn checkout(&self, tenant: &Tenant, plan: &str) -> CheckoutOrder {
        self.services
            .create_checkout_order
            .handle(CreateCheckoutOrderCommand {
                tenant_id: tenant.id,
                plan: plan.to_string(),
            })
            .await
            .expect("checkout succeeds")
    }

    pub fn now(&self) -> Timestamp {
        use tableside::ports::Clock;
        self.clock.now()
    }

    pub async fn reload(&self, tenant: &Tenant) -> Option<Tenant> {
        use tableside::ports::TenantRepository;
        self.store.find_by_id(&tenant.id).await.expect("store readable")
    }
}

pub fn sign(order_id: &str, payment_id: &str) -> String {
    compute_signature(order_id, payment_id, KEY_SECRET).expect("valid secret")
}
