use chrono::NaiveDate;
use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::order::{OrderLine, OrderNumber, PaymentMethod, PlaceOrder, TransitionOrder};
use domain::{AccountId, Address, Money, OrderService, OrderStatus, PricingConfig, ShippingMethod};
use event_store::InMemoryEventStore;
use projections::{OrderSummaryView, ProjectionProcessor};

fn address() -> Address {
    Address {
        full_name: "Bench Customer".into(),
        line1: "1 Loop Street".into(),
        line2: None,
        city: "Springfield".into(),
        state: None,
        postal_code: "00001".into(),
        country: "US".into(),
        phone: None,
    }
}

/// Places `n` orders and confirms each, two events per order.
async fn populate_store(store: &InMemoryEventStore, n: u64) {
    let service = OrderService::new(store.clone());
    let customer = AccountId::parse("0123456789abcdef01234567").unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

    for seq in 1..=n {
        let order_id = AggregateId::new();
        service
            .place_order(PlaceOrder {
                order_id: order_id.clone(),
                order_number: OrderNumber::format(day, seq),
                customer: customer.clone(),
                lines: vec![OrderLine::new("w", "Widget", "W-1", None, 2, Money::from_cents(1000))],
                billing_address: address(),
                shipping_address: address(),
                shipping_method: ShippingMethod::Standard,
                payment_method: PaymentMethod::Card,
                coupon: None,
                notes: None,
                pricing: PricingConfig::default(),
            })
            .await
            .unwrap();
        service
            .transition(TransitionOrder::new(order_id, OrderStatus::Confirmed, "bench"))
            .await
            .unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion, orders: u64) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, orders));

    c.bench_function(&format!("projections/catch_up_{}_events", orders * 2), |b| {
        b.iter(|| {
            rt.block_on(async {
                let view = OrderSummaryView::new();
                let mut processor = ProjectionProcessor::new(store.clone());
                processor.register(Box::new(view.clone()));
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_catch_up_100_orders(c: &mut Criterion) {
    bench_catch_up(c, 100);
}

fn bench_catch_up_1000_orders(c: &mut Criterion) {
    bench_catch_up(c, 1000);
}

fn bench_incremental_catch_up(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 500));

    let view = OrderSummaryView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Box::new(view));
    rt.block_on(processor.run_catch_up()).unwrap();

    c.bench_function("projections/incremental_catch_up_noop", |b| {
        b.iter(|| rt.block_on(processor.run_catch_up()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_catch_up_100_orders,
    bench_catch_up_1000_orders,
    bench_incremental_catch_up,
);
criterion_main!(benches);
