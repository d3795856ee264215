//! Concurrent allocation workload and duplicate detection.
//!
//! Each caller task repeatedly picks a random entity, allocates an id through
//! the shared [`IdAllocator`] and records `(entity, id)`. After all callers
//! finish (or the run is cancelled), ids are grouped by the counter they were
//! drawn from and checked for duplicates. Entities that share a counter are
//! checked together.

use crate::{
    config::StressConfig,
    telemetry::{increment_ids_allocated, increment_store_errors, record_allocation_latency},
};
use anyhow::bail;
use futures::future::try_join_all;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};
use tally::{CounterStore, IdAllocator};
use tokio_util::sync::CancellationToken;

/// Outcome of one caller task.
#[derive(Debug, Default)]
struct CallerOutcome {
    issued: Vec<(usize, u64)>,
    failures: u64,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct Report {
    /// Ids issued per counter, keyed by `collection/key`.
    pub issued: BTreeMap<String, usize>,
    pub failures: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl Report {
    pub fn total_issued(&self) -> usize {
        self.issued.values().sum()
    }
}

/// Runs the workload described by `config` against `allocator`.
///
/// Store failures are counted and the caller moves on to its next attempt;
/// nothing is retried. The run fails if any counter handed out the same id
/// twice.
pub async fn run<S>(
    config: &StressConfig,
    allocator: Arc<IdAllocator<S>>,
    token: CancellationToken,
) -> anyhow::Result<Report>
where
    S: CounterStore + 'static,
{
    let entities: Arc<[String]> = config.entities.clone().into();
    let start = Instant::now();

    let callers = (0..config.concurrency).map(|caller| {
        let allocator = Arc::clone(&allocator);
        let entities = Arc::clone(&entities);
        let token = token.clone();
        let attempts = config.ids_per_task;
        tokio::spawn(caller_loop(caller, allocator, entities, attempts, token))
    });
    let outcomes = try_join_all(callers).await?;
    let elapsed = start.elapsed();

    let mut seen: BTreeMap<String, HashSet<u64>> = BTreeMap::new();
    let mut failures = 0;
    for outcome in outcomes {
        failures += outcome.failures;
        for (entity, id) in outcome.issued {
            let counter = counter_name(&allocator, &entities[entity])?;
            if !seen.entry(counter.clone()).or_default().insert(id) {
                bail!("counter `{counter}` issued id {id} more than once");
            }
        }
    }

    Ok(Report {
        issued: seen
            .into_iter()
            .map(|(counter, ids)| (counter, ids.len()))
            .collect(),
        failures,
        elapsed,
        cancelled: token.is_cancelled(),
    })
}

async fn caller_loop<S>(
    caller: usize,
    allocator: Arc<IdAllocator<S>>,
    entities: Arc<[String]>,
    attempts: usize,
    token: CancellationToken,
) -> CallerOutcome
where
    S: CounterStore,
{
    tracing::trace!("Caller {caller} started");
    let mut outcome = CallerOutcome {
        issued: Vec::with_capacity(attempts),
        failures: 0,
    };

    for _ in 0..attempts {
        let entity = rand::random_range(0..entities.len());
        let name = entities[entity].as_str();

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            () = token.cancelled() => break,
            result = allocator.next_id(name) => result,
        };
        record_allocation_latency(started.elapsed().as_secs_f64() * 1_000_000.0);

        match result {
            Ok(id) => {
                increment_ids_allocated(name);
                outcome.issued.push((entity, id));
            }
            Err(err) => {
                increment_store_errors(name);
                tracing::warn!(caller, entity = name, "allocation failed: {err}");
                outcome.failures += 1;
            }
        }
    }

    tracing::trace!("Caller {caller} finished");
    outcome
}

fn counter_name<S>(allocator: &IdAllocator<S>, entity: &str) -> anyhow::Result<String>
where
    S: CounterStore,
{
    let config = allocator.registry().resolve(entity)?;
    Ok(format!("{}/{}", config.collection(), config.key()))
}
