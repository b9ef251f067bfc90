//! Integration tests for the checkout coordinator.
//!
//! The store and catalog are wrapped so individual steps can be made to
//! fail, which is how compensation, stalls and resumes are exercised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use checkout::{
    CheckoutCoordinator, CheckoutError, CheckoutRequest, CheckoutState, CheckoutStep,
    StockMovement,
};
use chrono::Local;
use common::AggregateId;
use domain::cart::{AddItem, ApplyCoupon};
use domain::order::{CancelOrder, IssueRefund};
use domain::{
    AccountId, Address, Aggregate, CartService, CatalogError, CatalogStore, CouponDefinition,
    CouponDiscount, CustomerKey, DomainError, InMemoryCatalog, InMemoryCouponBook, Money,
    OrderError, OrderStatus, PaymentMethod, PricingConfig, Product, ProductId,
};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStream, InMemoryEventStore,
    InMemorySequenceAllocator, Snapshot, Version,
};
use tokio::sync::Notify;

/// Event store that can be told to reject cart writes, or to stop taking
/// checkout log writes once a given event has been recorded.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: InMemoryEventStore,
    fail_cart_writes: Arc<AtomicBool>,
    halt_checkout_after: Arc<Mutex<Option<&'static str>>>,
    checkout_halted: Arc<AtomicBool>,
}

impl FlakyStore {
    fn fail_cart_writes(&self, fail: bool) {
        self.fail_cart_writes.store(fail, Ordering::SeqCst);
    }

    fn halt_checkout_after(&self, event_type: &'static str) {
        *self.halt_checkout_after.lock().unwrap() = Some(event_type);
    }

    fn allow_checkout_writes(&self) {
        *self.halt_checkout_after.lock().unwrap() = None;
        self.checkout_halted.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> event_store::Result<Version> {
        let is_cart = events.first().is_some_and(|e| e.aggregate_type == "Cart");
        if is_cart && self.fail_cart_writes.load(Ordering::SeqCst) {
            return Err(EventStoreError::InvalidAppend("store unavailable".to_string()));
        }

        let is_checkout = events.first().is_some_and(|e| e.aggregate_type == "Checkout");
        if is_checkout && self.checkout_halted.load(Ordering::SeqCst) {
            return Err(EventStoreError::InvalidAppend("store unavailable".to_string()));
        }
        let halt_after = *self.halt_checkout_after.lock().unwrap();
        let halts = is_checkout
            && halt_after.is_some_and(|wanted| events.iter().any(|e| e.event_type == wanted));

        let version = self.inner.append(events, options).await?;
        if halts {
            self.checkout_halted.store(true, Ordering::SeqCst);
        }
        Ok(version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> event_store::Result<Vec<EventEnvelope>> {
        self.inner.get_events_for_aggregate(aggregate_id).await
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> event_store::Result<Vec<EventEnvelope>> {
        self.inner
            .get_events_for_aggregate_from_version(aggregate_id, from_version)
            .await
    }

    async fn get_events_by_type(&self, event_type: &str) -> event_store::Result<Vec<EventEnvelope>> {
        self.inner.get_events_by_type(event_type).await
    }

    async fn stream_all_events(&self) -> event_store::Result<EventStream> {
        self.inner.stream_all_events().await
    }

    async fn get_aggregate_version(
        &self,
        aggregate_id: &AggregateId,
    ) -> event_store::Result<Option<Version>> {
        self.inner.get_aggregate_version(aggregate_id).await
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> event_store::Result<()> {
        self.inner.save_snapshot(snapshot).await
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> event_store::Result<Option<Snapshot>> {
        self.inner.get_snapshot(aggregate_id).await
    }
}

/// Catalog that can reject the decrement of one product or every restore,
/// or hold decrements until released.
#[derive(Clone, Default)]
struct FlakyCatalog {
    inner: InMemoryCatalog,
    reject_decrement_of: Arc<Mutex<Option<ProductId>>>,
    fail_restores: Arc<AtomicBool>,
    decrement_gate: Arc<Mutex<Option<Arc<Gate>>>>,
}

/// Signals when a decrement is reached and lets it continue on release.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

impl FlakyCatalog {
    fn gate_decrements(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.decrement_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl CatalogStore for FlakyCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.inner.get_product(id).await
    }

    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        let gate = self.decrement_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let rejected = self.reject_decrement_of.lock().unwrap().clone();
        if rejected.as_ref() == Some(id) {
            // Someone else bought the last units between the check and the commit.
            return Err(CatalogError::InsufficientStock {
                product_id: id.clone(),
                requested: quantity,
                available: 0,
            });
        }
        self.inner.decrement_stock(id, quantity).await
    }

    async fn restore_stock(&self, id: &ProductId, quantity: u32) -> Result<u32, CatalogError> {
        if self.fail_restores.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog offline".to_string()));
        }
        self.inner.restore_stock(id, quantity).await
    }
}

struct Fixture {
    coordinator: Arc<CheckoutCoordinator<FlakyStore>>,
    carts: Arc<CartService<FlakyStore>>,
    store: FlakyStore,
    catalog: FlakyCatalog,
}

async fn fixture() -> Fixture {
    let store = FlakyStore::default();
    let catalog = FlakyCatalog::default();
    catalog
        .inner
        .upsert(Product::new("widget", "Widget", "WID-001", Money::from_cents(1000), 10))
        .await;
    catalog
        .inner
        .upsert(Product::new("gizmo", "Gizmo", "GIZ-001", Money::from_cents(2500), 5))
        .await;

    let coupons = InMemoryCouponBook::new();
    coupons
        .insert(CouponDefinition::new("SAVE10", CouponDiscount::Percentage(10)))
        .await;

    let carts = Arc::new(CartService::new(
        store.clone(),
        Arc::new(catalog.clone()),
        Arc::new(coupons),
        PricingConfig::default(),
    ));
    let coordinator = Arc::new(CheckoutCoordinator::new(
        store.clone(),
        carts.clone(),
        Arc::new(catalog.clone()),
        Arc::new(InMemorySequenceAllocator::new()),
    ));

    Fixture {
        coordinator,
        carts,
        store,
        catalog,
    }
}

fn customer(n: u8) -> AccountId {
    AccountId::parse(&format!("{n:x}").repeat(24)).unwrap()
}

fn address() -> Address {
    Address {
        full_name: "Grace Hopper".to_string(),
        line1: "1 Compiler Way".to_string(),
        line2: None,
        city: "Arlington".to_string(),
        state: Some("VA".to_string()),
        postal_code: "22201".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}

fn request(account: &AccountId) -> CheckoutRequest {
    CheckoutRequest::new(account.clone(), PaymentMethod::Card, address())
}

impl Fixture {
    async fn fill_cart(&self, account: &AccountId, lines: &[(&str, i64)]) {
        let key = CustomerKey::from(account.clone());
        for (product, quantity) in lines {
            self.carts
                .add_item(AddItem::new(key.clone(), *product, *quantity))
                .await
                .unwrap();
        }
    }

    async fn stock(&self, product: &str) -> u32 {
        self.catalog
            .inner
            .stock_of(&ProductId::new(product))
            .await
            .unwrap()
    }

    async fn cart_quantity(&self, account: &AccountId) -> u32 {
        self.carts
            .find(&CustomerKey::from(account.clone()))
            .await
            .unwrap()
            .map_or(0, |cart| cart.total_quantity())
    }

    async fn only_order_id(&self) -> AggregateId {
        let placed = self.store.get_events_by_type("OrderPlaced").await.unwrap();
        assert_eq!(placed.len(), 1);
        placed[0].aggregate_id.clone()
    }
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn worked_example_totals_stock_and_cart() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2), ("gizmo", 1)]).await;
        f.carts
            .apply_coupon(ApplyCoupon::new(CustomerKey::from(account.clone()), "save10"))
            .await
            .unwrap();

        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();

        assert_eq!(receipt.state, CheckoutState::Completed);
        let totals = receipt.order.totals();
        assert_eq!(totals.subtotal, Money::from_cents(4500));
        assert_eq!(totals.discount, Money::from_cents(450));
        assert_eq!(totals.tax, Money::from_cents(324));
        assert_eq!(totals.shipping_cost, Money::from_cents(599));
        assert_eq!(totals.total, Money::from_cents(4973));
        assert_eq!(receipt.order.status(), OrderStatus::Pending);
        assert!(receipt.order.stock_committed());
        assert_eq!(receipt.order.coupon_code(), Some("SAVE10"));

        assert_eq!(f.stock("widget").await, 8);
        assert_eq!(f.stock("gizmo").await, 4);
        assert_eq!(f.cart_quantity(&account).await, 0);
    }

    #[tokio::test]
    async fn log_records_every_forward_step() {
        let f = fixture().await;
        let account = customer(2);
        f.fill_cart(&account, &[("widget", 1)]).await;

        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();

        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Completed);
        assert_eq!(log.completed_steps(), &CheckoutStep::FORWARD);
        assert_eq!(
            log.decremented(),
            &[StockMovement::new(ProductId::new("widget"), 1)]
        );
        assert!(log.pending_decrements().is_empty());
        assert_eq!(log.order_number(), receipt.order.order_number());
    }

    #[tokio::test]
    async fn shipping_falls_back_to_billing_address() {
        let f = fixture().await;
        let account = customer(3);
        f.fill_cart(&account, &[("widget", 1)]).await;

        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();

        assert_eq!(receipt.order.shipping_address(), Some(&address()));
    }

    #[tokio::test]
    async fn same_day_order_numbers_increase() {
        let f = fixture().await;
        let prefix = format!("ORD{}", Local::now().date_naive().format("%y%m%d"));

        let mut numbers = Vec::new();
        for n in 4..7 {
            let account = customer(n);
            f.fill_cart(&account, &[("widget", 1)]).await;
            let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
            numbers.push(receipt.order.order_number().unwrap().to_string());
        }

        assert!(numbers.iter().all(|n| n.starts_with(&prefix)));
        assert_eq!(numbers[0], format!("{prefix}0001"));
        assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

mod rejected_before_any_write {
    use super::*;

    #[tokio::test]
    async fn empty_cart_writes_nothing() {
        let f = fixture().await;
        let account = customer(1);

        let result = f.coordinator.checkout(request(&account)).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(f.store.inner.event_count().await, 0);
    }

    #[tokio::test]
    async fn cart_emptied_by_the_customer_is_still_empty() {
        let f = fixture().await;
        let account = customer(1);
        f.carts
            .get_or_create(&CustomerKey::from(account.clone()))
            .await
            .unwrap();
        let before = f.store.inner.event_count().await;

        let result = f.coordinator.checkout(request(&account)).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(f.store.inner.event_count().await, before);
    }

    #[tokio::test]
    async fn over_stock_leaves_stock_and_cart_unchanged() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("gizmo", 3)]).await;
        // Stock drops after the items were added.
        f.catalog
            .inner
            .upsert(Product::new("gizmo", "Gizmo", "GIZ-001", Money::from_cents(2500), 2))
            .await;
        let before = f.store.inner.event_count().await;

        let result = f.coordinator.checkout(request(&account)).await;

        match result {
            Err(CheckoutError::InsufficientStock {
                product,
                requested,
                available,
            }) => {
                assert_eq!(product, "Gizmo");
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(f.stock("gizmo").await, 2);
        assert_eq!(f.cart_quantity(&account).await, 3);
        assert_eq!(f.store.inner.event_count().await, before);
    }

    #[tokio::test]
    async fn inactive_product_is_unavailable() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 1), ("gizmo", 1)]).await;
        f.catalog
            .inner
            .set_active(&ProductId::new("gizmo"), false)
            .await;

        let result = f.coordinator.checkout(request(&account)).await;

        assert!(matches!(result, Err(CheckoutError::ProductUnavailable(name)) if name == "Gizmo"));
        assert_eq!(f.stock("widget").await, 10);
    }

    #[tokio::test]
    async fn blank_billing_field_is_reported() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 1)]).await;
        let mut billing = address();
        billing.postal_code = " ".to_string();

        let result = f
            .coordinator
            .checkout(CheckoutRequest::new(account.clone(), PaymentMethod::Card, billing))
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidAddress(e)) if e.field == "postal_code"
        ));
    }
}

mod compensation {
    use super::*;

    #[tokio::test]
    async fn failed_decrement_restores_stock_and_cancels_order() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2), ("gizmo", 1)]).await;
        *f.catalog.reject_decrement_of.lock().unwrap() = Some(ProductId::new("gizmo"));

        let result = f.coordinator.checkout(request(&account)).await;

        assert!(matches!(
            result,
            Err(CheckoutError::InsufficientStock { ref product, .. }) if product == "Gizmo"
        ));
        assert_eq!(f.stock("widget").await, 10);
        assert_eq!(f.stock("gizmo").await, 5);
        assert_eq!(f.cart_quantity(&account).await, 3);

        let order_id = f.only_order_id().await;
        let order = f
            .coordinator
            .orders()
            .get_order(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(!order.stock_committed());
        assert!(
            order
                .cancellation_reason()
                .is_some_and(|reason| reason.contains("Insufficient stock for Gizmo"))
        );

        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Failed);
        assert!(log.has_compensated(CheckoutStep::RestoreStock));
        assert!(log.has_compensated(CheckoutStep::CancelOrder));
        assert!(log.outstanding_restores().is_empty());
    }

    #[tokio::test]
    async fn cancel_in_pending_restores_exact_quantities() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2), ("gizmo", 1), ("widget", 1)])
            .await;
        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();
        assert_eq!(f.stock("widget").await, 7);
        assert_eq!(f.stock("gizmo").await, 4);

        let order = f
            .coordinator
            .cancel_order(&order_id, "changed my mind".to_string(), "customer")
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(f.stock("widget").await, 10);
        assert_eq!(f.stock("gizmo").await, 5);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert!(log.outstanding_restores().is_empty());
        assert_eq!(log.state(), CheckoutState::Completed);
    }

    #[tokio::test]
    async fn second_cancel_is_rejected_without_restoring_again() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2)]).await;
        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();
        f.coordinator
            .cancel_order(&order_id, "first".to_string(), "customer")
            .await
            .unwrap();

        let again = f
            .coordinator
            .cancel_order(&order_id, "second".to_string(), "customer")
            .await;

        assert!(matches!(
            again,
            Err(CheckoutError::Domain(DomainError::Order(
                OrderError::InvalidStateTransition { .. }
            )))
        ));
        assert_eq!(f.stock("widget").await, 10);
    }

    #[tokio::test]
    async fn refund_above_total_leaves_order_unchanged() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2), ("gizmo", 1)]).await;
        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();
        let total = receipt.order.totals().total;

        let result = f
            .coordinator
            .orders()
            .refund(IssueRefund::new(
                order_id.clone(),
                total + Money::from_cents(1),
                "too much",
            ))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::Order(OrderError::RefundExceedsTotal { .. }))
        ));
        let order = f
            .coordinator
            .orders()
            .get_order(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.refunds().is_empty());
    }
}

mod stalls {
    use super::*;

    #[tokio::test]
    async fn cart_clear_failure_stalls_and_resume_finishes() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2)]).await;
        f.store.fail_cart_writes(true);

        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();

        assert_eq!(receipt.state, CheckoutState::Stalled);
        assert!(receipt.order.stock_committed());
        assert_eq!(f.stock("widget").await, 8);
        assert_eq!(f.cart_quantity(&account).await, 2);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.stalled_step(), Some(CheckoutStep::ClearCart));
        assert_eq!(log.remaining_steps(), vec![CheckoutStep::ClearCart]);

        let report = f.coordinator.resume_stalled().await.unwrap();
        assert_eq!(report.still_stalled, vec![order_id.clone()]);
        assert!(report.resumed.is_empty());

        f.store.fail_cart_writes(false);
        let report = f.coordinator.resume_stalled().await.unwrap();
        assert_eq!(report.resumed, vec![order_id.clone()]);

        assert_eq!(f.cart_quantity(&account).await, 0);
        assert_eq!(f.stock("widget").await, 8);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Completed);
    }

    #[tokio::test]
    async fn finished_checkout_cannot_be_resumed() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 1)]).await;
        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();

        let result = f.coordinator.resume(&order_id).await;

        assert!(matches!(
            result,
            Err(CheckoutError::NotResumable {
                state: CheckoutState::Completed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unknown_order_has_no_checkout() {
        let f = fixture().await;

        let result = f.coordinator.resume(&AggregateId::new()).await;

        assert!(matches!(result, Err(CheckoutError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_restore_on_cancel_is_retried_by_resume() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 3)]).await;
        let receipt = f.coordinator.checkout(request(&account)).await.unwrap();
        let order_id = receipt.order.id().unwrap().clone();
        f.catalog.fail_restores.store(true, Ordering::SeqCst);

        let order = f
            .coordinator
            .cancel_order(&order_id, "no longer needed".to_string(), "customer")
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(f.stock("widget").await, 7);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Stalled);
        assert_eq!(log.stalled_step(), Some(CheckoutStep::RestoreStock));

        f.catalog.fail_restores.store(false, Ordering::SeqCst);
        let resumed = f.coordinator.resume(&order_id).await.unwrap();

        assert_eq!(resumed.state, CheckoutState::Failed);
        assert_eq!(f.stock("widget").await, 10);
        assert_eq!(resumed.order.status(), OrderStatus::Cancelled);
    }
}

mod concurrent_cancel {
    use super::*;

    #[tokio::test]
    async fn cancel_during_stock_commit_gives_all_stock_back() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2)]).await;
        let gate = f.catalog.gate_decrements();

        let checkout = tokio::spawn({
            let coordinator = f.coordinator.clone();
            let request = request(&account);
            async move { coordinator.checkout(request).await }
        });
        gate.entered.notified().await;
        let order_id = f.only_order_id().await;

        let cancel = tokio::spawn({
            let coordinator = f.coordinator.clone();
            let order_id = order_id.clone();
            async move {
                coordinator
                    .cancel_order(&order_id, "changed my mind".to_string(), "customer")
                    .await
            }
        });
        tokio::task::yield_now().await;
        gate.release.notify_one();

        checkout.await.unwrap().unwrap();
        let order = cancel.await.unwrap().unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(f.stock("widget").await, 10);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert!(log.outstanding_restores().is_empty());

        let again = f
            .coordinator
            .cancel_order(&order_id, "again".to_string(), "customer")
            .await;
        assert!(again.is_err());
        assert_eq!(f.stock("widget").await, 10);
    }

    #[tokio::test]
    async fn order_cancelled_elsewhere_before_commit_is_rolled_back() {
        let f = fixture().await;
        let account = customer(1);
        f.fill_cart(&account, &[("widget", 2)]).await;
        let gate = f.catalog.gate_decrements();

        let checkout = tokio::spawn({
            let coordinator = f.coordinator.clone();
            let request = request(&account);
            async move { coordinator.checkout(request).await }
        });
        gate.entered.notified().await;
        let order_id = f.only_order_id().await;

        // Bypasses the coordinator, as another process would.
        f.coordinator
            .orders()
            .cancel(CancelOrder::new(order_id.clone(), "fraud check".to_string(), "admin"))
            .await
            .unwrap();
        gate.release.notify_one();

        let receipt = checkout.await.unwrap().unwrap();

        assert_eq!(receipt.state, CheckoutState::Failed);
        assert_eq!(receipt.order.status(), OrderStatus::Cancelled);
        assert!(!receipt.order.stock_committed());
        assert_eq!(f.stock("widget").await, 10);
        assert_eq!(f.cart_quantity(&account).await, 2);
    }
}

mod recovery {
    use super::*;

    /// Runs a checkout whose log stops taking writes right after the stock
    /// decrement was recorded, as if the process died there.
    async fn interrupted_checkout(f: &Fixture, account: &AccountId) -> AggregateId {
        f.fill_cart(account, &[("widget", 2)]).await;
        f.store.halt_checkout_after("StockDecremented");

        let result = f.coordinator.checkout(request(account)).await;
        assert!(matches!(result, Err(CheckoutError::EventStore(_))));
        f.store.allow_checkout_writes();

        let order_id = f.only_order_id().await;
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Running);
        assert_eq!(
            log.decremented(),
            &[StockMovement::new(ProductId::new("widget"), 2)]
        );
        order_id
    }

    #[tokio::test]
    async fn interrupted_checkout_is_finished_on_recover() {
        let f = fixture().await;
        let account = customer(1);
        let order_id = interrupted_checkout(&f, &account).await;
        assert_eq!(f.stock("widget").await, 8);

        let stalled_only = f.coordinator.resume_stalled().await.unwrap();
        assert!(stalled_only.resumed.is_empty());
        assert!(stalled_only.still_stalled.is_empty());

        let report = f.coordinator.recover().await.unwrap();

        assert_eq!(report.resumed, vec![order_id.clone()]);
        assert_eq!(f.stock("widget").await, 8);
        assert_eq!(f.cart_quantity(&account).await, 0);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Completed);
        let order = f.coordinator.orders().get_order(&order_id).await.unwrap().unwrap();
        assert!(order.stock_committed());
    }

    #[tokio::test]
    async fn cancelled_interrupted_checkout_is_rolled_back_on_recover() {
        let f = fixture().await;
        let account = customer(1);
        let order_id = interrupted_checkout(&f, &account).await;

        f.coordinator
            .cancel_order(&order_id, "changed my mind".to_string(), "customer")
            .await
            .unwrap();
        assert_eq!(f.stock("widget").await, 10);

        let report = f.coordinator.recover().await.unwrap();

        assert_eq!(report.resumed, vec![order_id.clone()]);
        assert_eq!(f.stock("widget").await, 10);
        assert_eq!(f.cart_quantity(&account).await, 2);
        let log = f.coordinator.checkout_log(&order_id).await.unwrap().unwrap();
        assert_eq!(log.state(), CheckoutState::Failed);
        assert!(log.outstanding_restores().is_empty());
    }
}
