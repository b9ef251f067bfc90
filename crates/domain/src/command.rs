//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, EventStoreExt, Snapshot, Version,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The version of the stream after the command.
    pub new_version: Version,
}

/// An intention to change one aggregate.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the stream this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Loads aggregates and runs commands against them.
///
/// Every append is conditional on the version the aggregate was loaded at,
/// so two read-modify-write cycles racing on one stream cannot both win.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for CommandHandler<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate, returning a default instance for an empty stream.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let version = snapshot.version;
                let mut restored: A = snapshot.into_state()?;
                restored.set_version(version);
                restored
            }
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if its stream is empty.
    pub async fn load_existing(&self, aggregate_id: &AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command against the current state and persists its events.
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.execute_expecting(aggregate_id, None, command_fn).await
    }

    /// Executes a command only if the aggregate is still at `expected_version`.
    ///
    /// Clients that read a version earlier pass it back here; a mismatch is
    /// reported as a concurrency conflict before the command runs.
    pub async fn execute_expecting<F>(
        &self,
        aggregate_id: &AggregateId,
        expected_version: Option<Version>,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        if let Some(expected) = expected_version
            && expected != current_version
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: aggregate_id.clone(),
                expected,
                actual: current_version,
            }
            .into());
        }

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = self.build_envelopes(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    fn build_envelopes(
        &self,
        aggregate_id: &AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id.clone())
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Executes a command and saves a snapshot when the interval is reached.
    pub async fn execute_with_snapshot<F>(
        &self,
        aggregate_id: &AggregateId,
        expected_version: Option<Version>,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self
            .execute_expecting(aggregate_id, expected_version, command_fn)
            .await?;

        if result.aggregate.should_snapshot() {
            let snapshot = Snapshot::from_state(
                aggregate_id.clone(),
                A::aggregate_type(),
                result.new_version,
                &result.aggregate,
            )?;
            self.store.save_snapshot(snapshot).await?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum LedgerEvent {
        Opened { id: AggregateId },
        Credited { amount: i64 },
    }

    impl DomainEvent for LedgerEvent {
        fn event_type(&self) -> &'static str {
            match self {
                LedgerEvent::Opened { .. } => "Opened",
                LedgerEvent::Credited { .. } => "Credited",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Ledger {
        id: Option<AggregateId>,
        balance: i64,
        #[serde(default)]
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("rejected credit of {0}")]
    struct Rejected(i64);

    impl From<Rejected> for DomainError {
        fn from(e: Rejected) -> Self {
            DomainError::AggregateNotFound {
                aggregate_type: "Ledger",
                aggregate_id: e.to_string(),
            }
        }
    }

    impl Aggregate for Ledger {
        type Event = LedgerEvent;
        type Error = Rejected;

        fn aggregate_type() -> &'static str {
            "Ledger"
        }

        fn id(&self) -> Option<&AggregateId> {
            self.id.as_ref()
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                LedgerEvent::Opened { id } => self.id = Some(id),
                LedgerEvent::Credited { amount } => self.balance += amount,
            }
        }
    }

    impl SnapshotCapable for Ledger {
        fn snapshot_interval() -> usize {
            2
        }
    }

    fn open(id: &AggregateId) -> impl FnOnce(&Ledger) -> Result<Vec<LedgerEvent>, Rejected> {
        let id = id.clone();
        move |_| Ok(vec![LedgerEvent::Opened { id }])
    }

    fn credit(amount: i64) -> impl FnOnce(&Ledger) -> Result<Vec<LedgerEvent>, Rejected> {
        move |_| {
            if amount <= 0 {
                Err(Rejected(amount))
            } else {
                Ok(vec![LedgerEvent::Credited { amount }])
            }
        }
    }

    #[tokio::test]
    async fn execute_persists_and_applies() {
        let handler: CommandHandler<_, Ledger> = CommandHandler::new(InMemoryEventStore::new());
        let id = AggregateId::from_key("ledger-1");

        let result = handler.execute(&id, open(&id)).await.unwrap();
        assert_eq!(result.new_version, Version::first());

        let result = handler.execute(&id, credit(40)).await.unwrap();
        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.balance, 40);

        let reloaded = handler.load(&id).await.unwrap();
        assert_eq!(reloaded.balance, 40);
        assert_eq!(reloaded.version(), Version::new(2));
    }

    #[tokio::test]
    async fn rejected_command_writes_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Ledger> = CommandHandler::new(store.clone());
        let id = AggregateId::from_key("ledger-2");

        assert!(handler.execute(&id, credit(-1)).await.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_conflict() {
        let handler: CommandHandler<_, Ledger> = CommandHandler::new(InMemoryEventStore::new());
        let id = AggregateId::from_key("ledger-3");
        handler.execute(&id, open(&id)).await.unwrap();
        handler.execute(&id, credit(5)).await.unwrap();

        let err = handler
            .execute_expecting(&id, Some(Version::first()), credit(5))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let ok = handler
            .execute_expecting(&id, Some(Version::new(2)), credit(5))
            .await
            .unwrap();
        assert_eq!(ok.aggregate.balance, 10);
    }

    #[tokio::test]
    async fn empty_event_list_is_not_persisted() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Ledger> = CommandHandler::new(store.clone());
        let id = AggregateId::from_key("ledger-4");

        let result = handler.execute(&id, |_| Ok(vec![])).await.unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::initial());
        assert!(handler.load_existing(&id).await.unwrap().is_none());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn snapshots_are_taken_and_used_on_load() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Ledger> = CommandHandler::new(store.clone());
        let id = AggregateId::from_key("ledger-5");

        handler.execute_with_snapshot(&id, None, open(&id)).await.unwrap();
        handler.execute_with_snapshot(&id, None, credit(7)).await.unwrap();
        let snapshot = store.get_snapshot(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(2));

        handler.execute(&id, credit(3)).await.unwrap();
        let reloaded = handler.load(&id).await.unwrap();
        assert_eq!(reloaded.balance, 10);
        assert_eq!(reloaded.version(), Version::new(3));
    }
}
