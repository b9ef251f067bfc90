//! Shared application state.

use std::sync::Arc;

use checkout::CheckoutCoordinator;
use domain::{AccountDirectory, CartService, CatalogStore, CouponBook, OrderService};
use event_store::{EventStore, SequenceAllocator};
use projections::{OrderSummaryView, Projection, ProjectionProcessor};

use crate::config::Config;

/// Services owned by neighbouring systems that the API talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogStore>,
    pub coupons: Arc<dyn CouponBook>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub sequences: Arc<dyn SequenceAllocator>,
}

/// Shared application state passed to all handlers.
pub struct AppState<S: EventStore> {
    pub carts: Arc<CartService<S>>,
    pub checkout: CheckoutCoordinator<S>,
    pub summaries: OrderSummaryView,
    pub projections: ProjectionProcessor<S>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    /// Wires services over one event store.
    pub fn new(store: S, collaborators: Collaborators, config: &Config) -> Self {
        let carts = Arc::new(
            CartService::new(
                store.clone(),
                collaborators.catalog.clone(),
                collaborators.coupons,
                config.pricing,
            )
            .with_retention(config.cart_retention()),
        );

        let checkout = CheckoutCoordinator::new(
            store.clone(),
            carts.clone(),
            collaborators.catalog,
            collaborators.sequences,
        );

        let summaries = OrderSummaryView::new();
        let mut projections = ProjectionProcessor::new(store);
        projections.register(Box::new(summaries.clone()) as Box<dyn Projection>);

        Self {
            carts,
            checkout,
            summaries,
            projections,
            accounts: collaborators.accounts,
        }
    }

    pub fn orders(&self) -> &OrderService<S> {
        self.checkout.orders()
    }
}
