//! In-process stand-ins for the catalog, coupon book and identity service,
//! plus optional demo data.

use std::sync::Arc;

use domain::{
    AccountId, CouponDefinition, CouponDiscount, IdentityError, InMemoryAccountDirectory,
    InMemoryCatalog, InMemoryCouponBook, Money, Principal, Product, Role,
};
use event_store::SequenceAllocator;

use crate::config::Config;
use crate::state::Collaborators;

/// Account behind `ADMIN_TOKEN`.
pub const ADMIN_ACCOUNT: &str = "000000000000000000000000";

/// Demo customer seeded by `DEMO_SEED`.
pub const DEMO_CUSTOMER: &str = "64b7f0c2a1e4d5f6a7b8c9d0";
pub const DEMO_CUSTOMER_TOKEN: &str = "demo-customer-token";

#[derive(Clone, Default)]
pub struct InMemoryCollaborators {
    pub catalog: Arc<InMemoryCatalog>,
    pub coupons: Arc<InMemoryCouponBook>,
    pub accounts: Arc<InMemoryAccountDirectory>,
}

impl InMemoryCollaborators {
    pub fn collaborators(&self, sequences: Arc<dyn SequenceAllocator>) -> Collaborators {
        Collaborators {
            catalog: self.catalog.clone(),
            coupons: self.coupons.clone(),
            accounts: self.accounts.clone(),
            sequences,
        }
    }

    /// Registers the admin token, and the demo data when enabled.
    pub async fn seed(&self, config: &Config) -> Result<(), IdentityError> {
        if let Some(token) = &config.admin_token {
            self.accounts
                .register(token.clone(), principal(ADMIN_ACCOUNT, Role::Admin)?)
                .await;
        }

        if !config.demo_seed {
            return Ok(());
        }

        self.accounts
            .register(DEMO_CUSTOMER_TOKEN, principal(DEMO_CUSTOMER, Role::Customer)?)
            .await;

        for product in demo_products() {
            self.catalog.upsert(product).await;
        }

        self.coupons
            .insert(CouponDefinition::new(
                "WELCOME10",
                CouponDiscount::Percentage(10),
            ))
            .await;
        self.coupons
            .insert(CouponDefinition::new(
                "FIVEOFF",
                CouponDiscount::Fixed(Money::from_cents(500)),
            ))
            .await;

        tracing::info!(customer = DEMO_CUSTOMER, "seeded demo catalog and coupons");
        Ok(())
    }
}

fn principal(account: &str, role: Role) -> Result<Principal, IdentityError> {
    Ok(Principal {
        account_id: AccountId::parse(account)?,
        role,
    })
}

fn demo_products() -> Vec<Product> {
    vec![
        Product::new("tee", "Classic Tee", "TEE-001", Money::from_cents(1999), 100)
            .with_variant("size", "S", None)
            .with_variant("size", "M", None)
            .with_variant("size", "L", None)
            .with_variant("size", "XL", Some(Money::from_cents(2299))),
        Product::new("mug", "Enamel Mug", "MUG-001", Money::from_cents(1250), 50),
        Product::new("hoodie", "Zip Hoodie", "HOOD-001", Money::from_cents(4500), 20),
    ]
}
