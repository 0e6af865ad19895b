use std::{collections::HashMap, sync::Arc};

use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use tokio::{
    sync::Semaphore,
    task::{Id, JoinSet},
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use super::{selection, Registry, Round, RoundState};
use crate::{
    aggregation::Aggregator,
    config::FederationConfig,
    error::{FedErr, Result},
    evaluation::Evaluate,
    params::ParameterSet,
    participant::{self, LocalPlan, ParticipantErr, ParticipantId, Update},
    report::Reporter,
};

/// The training phase of an attempt, between the broadcast and the barrier.
struct InFlight {
    tasks: JoinSet<participant::Result<Update>>,
    pending: HashMap<Id, ParticipantId>,
    cancel: CancellationToken,
    started: Instant,
    deadline: Instant,
}

/// What came back from the participants of an attempt.
struct Collected {
    updates: Vec<Update>,
    failed: Vec<(ParticipantId, ParticipantErr)>,
}

/// Drives rounds through their lifecycle: selection, broadcast, parallel local training,
/// collection, aggregation and evaluation, retrying attempts that fail recoverably.
pub struct RoundScheduler {
    config: FederationConfig,
    aggregator: Box<dyn Aggregator>,
    rng: StdRng,
}

impl RoundScheduler {
    /// Creates a new `RoundScheduler`.
    ///
    /// # Arguments
    /// * `config` - A validated federation config.
    /// * `aggregator` - Combines every round's updates.
    pub fn new(config: FederationConfig, aggregator: Box<dyn Aggregator>) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            config,
            aggregator,
            rng,
        }
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Runs round `index` until one of its attempts completes.
    ///
    /// Every attempt, successful or not, is reported through `reporter`. Failed attempts
    /// never produce parameters, so the caller's global model stays untouched.
    ///
    /// # Arguments
    /// * `index` - The round index.
    /// * `global` - The global parameters entering the round.
    /// * `registry` - The federation's participants.
    /// * `evaluator` - Scores the aggregated parameters.
    /// * `reporter` - Receives a report per attempt.
    ///
    /// # Returns
    /// The completed round, or `FedErr::RetriesExhausted` once every attempt failed.
    pub async fn run_round(
        &mut self,
        index: usize,
        global: &Arc<ParameterSet>,
        registry: &mut Registry,
        evaluator: &mut dyn Evaluate,
        reporter: &mut Reporter,
    ) -> Result<Round> {
        registry.begin_round();
        let attempts = self.config.max_attempts();
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let mut round = Round::new(index, attempt);
            let res = self
                .run_attempt(&mut round, started, global, registry, evaluator)
                .await;

            if res.is_err() {
                round.fail(started.elapsed());
            }
            reporter.emit(&round);

            match res {
                Ok(()) => return Ok(round),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(round = index, attempt = attempt; "attempt failed, retrying: {e}");
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(FedErr::RetriesExhausted {
                        round: index,
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_attempt(
        &mut self,
        round: &mut Round,
        started: Instant,
        global: &Arc<ParameterSet>,
        registry: &mut Registry,
        evaluator: &mut dyn Evaluate,
    ) -> Result<()> {
        let (index, attempt) = (round.index(), round.attempt());
        let plan = self.config.local_plan(index, attempt)?;

        let selected = selection::select(
            &registry.selectable(),
            self.config.sample_fraction,
            &mut self.rng,
        );
        info!(round = index, attempt = attempt; "selected participants {selected:?}");
        round.set_selected(selected);

        round.advance(RoundState::Broadcasting);
        let in_flight = self.broadcast(round.selected(), registry, global, plan);

        round.advance(RoundState::Training);
        let collected = Self::collect(in_flight, global).await;

        round.advance(RoundState::Collecting);
        for update in &collected.updates {
            registry.record_success(update.participant());
        }
        for (id, err) in &collected.failed {
            warn!(round = index, participant = id.0, kind = err.kind(); "participant left out: {err}");
            registry.record_failure(*id, err);
        }
        round.set_failed(collected.failed);

        let got = collected.updates.len();
        let needed = self.config.min_participants;
        if got < needed {
            return Err(FedErr::QuorumNotMet {
                round: index,
                got,
                needed,
            });
        }

        round.advance(RoundState::Aggregating);
        let aggregate = self
            .aggregator
            .combine(collected.updates)
            .map_err(|source| FedErr::Aggregation {
                round: index,
                source,
            })?;

        let params = Arc::new(aggregate.params);
        round.set_aggregate(Arc::clone(&params), aggregate.contributors, aggregate.warnings);

        round.advance(RoundState::Evaluating);
        let metrics = evaluator.evaluate(&params).map_err(FedErr::Evaluation)?;
        round.finish(metrics, started.elapsed());

        info!(
            round = index,
            attempt = attempt,
            contributors = round.contributors().len(),
            samples = aggregate.total_samples,
            loss = metrics.loss,
            accuracy = metrics.accuracy;
            "round complete"
        );
        Ok(())
    }

    /// Spawns one training task per selected participant, at most `worker_pool_size`
    /// of them train at the same time.
    fn broadcast(
        &self,
        selected: &[ParticipantId],
        registry: &Registry,
        global: &Arc<ParameterSet>,
        plan: LocalPlan,
    ) -> InFlight {
        let started = Instant::now();
        let deadline = started + self.config.round_deadline();
        let cancel = CancellationToken::new();
        let permits = Arc::new(Semaphore::new(self.config.worker_pool_size));

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(selected.len());

        for &id in selected {
            let Some(participant) = registry.participant(id) else {
                continue;
            };

            let params = Arc::clone(global);
            let permits = Arc::clone(&permits);
            let cancel = cancel.child_token();

            let handle = tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| ParticipantErr::Cancelled)?;

                participant.train_local(params, plan, cancel).await
            });

            debug!(round = plan.round, participant = id.0; "global model sent");
            pending.insert(handle.id(), id);
        }

        InFlight {
            tasks,
            pending,
            cancel,
            started,
            deadline,
        }
    }

    /// Waits for every training task or the deadline, whichever comes first.
    ///
    /// Outstanding tasks are cancelled and aborted once the deadline elapses, updates that
    /// already arrived are kept.
    async fn collect(in_flight: InFlight, global: &ParameterSet) -> Collected {
        let InFlight {
            mut tasks,
            mut pending,
            cancel,
            started,
            deadline,
        } = in_flight;

        let mut updates = Vec::with_capacity(pending.len());
        let mut failed = Vec::new();

        loop {
            match time::timeout_at(deadline, tasks.join_next_with_id()).await {
                Ok(Some(Ok((task, res)))) => {
                    let Some(id) = pending.remove(&task) else {
                        continue;
                    };

                    match res.and_then(|update| Self::check_update(id, update, global)) {
                        Ok(update) => {
                            debug!(
                                participant = id.0,
                                samples = update.sample_count(),
                                ms = update.duration().as_millis() as u64;
                                "update received"
                            );
                            updates.push(update);
                        }
                        Err(e) => failed.push((id, e)),
                    }
                }
                Ok(Some(Err(e))) => {
                    if let Some(id) = pending.remove(&e.id()) {
                        failed.push((id, ParticipantErr::Panicked(e.to_string())));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    cancel.cancel();
                    tasks.abort_all();

                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    warn!(outstanding = pending.len(), elapsed_ms = elapsed_ms; "round deadline elapsed");
                    failed.extend(
                        pending
                            .drain()
                            .map(|(_, id)| (id, ParticipantErr::TrainingTimeout { elapsed_ms })),
                    );
                    break;
                }
            }
        }

        failed.sort_by_key(|(id, _)| *id);
        Collected { updates, failed }
    }

    /// Rejects updates that can't be averaged with the global model.
    fn check_update(
        id: ParticipantId,
        update: Update,
        global: &ParameterSet,
    ) -> participant::Result<Update> {
        if update.participant() != id {
            return Err(ParticipantErr::Transport(format!(
                "update from {id} claims to come from {}",
                update.participant()
            )));
        }

        update.params().check_compatible(global)?;
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        aggregation::FedAvg,
        evaluation::Metrics,
        model::ModelErr,
        params::Tensor,
        participant::Participant,
    };

    /// Returns a fixed scalar after an optional delay.
    struct Fixed {
        id: usize,
        value: f32,
        samples: usize,
        delay: Duration,
    }

    #[async_trait]
    impl Participant for Fixed {
        fn id(&self) -> ParticipantId {
            ParticipantId(self.id)
        }

        fn name(&self) -> &str {
            "fixed"
        }

        async fn train_local(
            &self,
            _params: Arc<ParameterSet>,
            _plan: LocalPlan,
            cancel: CancellationToken,
        ) -> participant::Result<Update> {
            tokio::select! {
                _ = time::sleep(self.delay) => {}
                _ = cancel.cancelled() => return Err(ParticipantErr::Cancelled),
            }

            let mut params = ParameterSet::new();
            params.insert("w", Tensor::scalar(self.value));
            Ok(Update::new(self.id(), params, self.samples, self.delay))
        }
    }

    struct Zero;

    impl Evaluate for Zero {
        fn evaluate(&mut self, _params: &ParameterSet) -> std::result::Result<Metrics, ModelErr> {
            Ok(Metrics {
                loss: 0.,
                accuracy: 1.,
            })
        }
    }

    /// Fails its first `failures` evaluations.
    struct Flaky {
        failures: usize,
        calls: usize,
    }

    impl Evaluate for Flaky {
        fn evaluate(&mut self, params: &ParameterSet) -> std::result::Result<Metrics, ModelErr> {
            self.calls += 1;
            if self.calls <= self.failures {
                return Err(ModelErr::InputMismatch {
                    got: 1,
                    expected: 2,
                });
            }

            Zero.evaluate(params)
        }
    }

    /// Tracks how many participants train at the same time.
    #[derive(Default)]
    struct Gauge {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    struct Gauged {
        id: usize,
        gauge: Arc<Gauge>,
    }

    #[async_trait]
    impl Participant for Gauged {
        fn id(&self) -> ParticipantId {
            ParticipantId(self.id)
        }

        fn name(&self) -> &str {
            "gauged"
        }

        async fn train_local(
            &self,
            _params: Arc<ParameterSet>,
            _plan: LocalPlan,
            _cancel: CancellationToken,
        ) -> participant::Result<Update> {
            let running = self.gauge.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.gauge.peak.fetch_max(running, Ordering::SeqCst);
            time::sleep(Duration::from_millis(50)).await;
            self.gauge.running.fetch_sub(1, Ordering::SeqCst);

            let mut params = ParameterSet::new();
            params.insert("w", Tensor::scalar(1.));
            Ok(Update::new(self.id(), params, 1, Duration::from_millis(50)))
        }
    }

    fn global() -> Arc<ParameterSet> {
        let mut params = ParameterSet::new();
        params.insert("w", Tensor::scalar(0.));
        Arc::new(params)
    }

    fn registry(participants: Vec<Fixed>) -> Registry {
        let mut registry = Registry::new(3);
        for p in participants {
            registry.register(Arc::new(p)).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn slow_participant_is_left_out() {
        let config = FederationConfig {
            round_deadline_ms: 100,
            ..Default::default()
        };
        let mut scheduler = RoundScheduler::new(config, Box::new(FedAvg::new()));
        let mut registry = registry(vec![
            Fixed {
                id: 0,
                value: 1.,
                samples: 10,
                delay: Duration::ZERO,
            },
            Fixed {
                id: 1,
                value: 5.,
                samples: 10,
                delay: Duration::from_secs(30),
            },
        ]);

        let round = scheduler
            .run_round(1, &global(), &mut registry, &mut Zero, &mut Reporter::new())
            .await
            .unwrap();

        assert_eq!(round.state(), RoundState::Done);
        assert_eq!(round.contributors(), &[ParticipantId(0)]);
        assert!(matches!(
            round.failed(),
            [(ParticipantId(1), ParticipantErr::TrainingTimeout { .. })]
        ));
        assert_eq!(round.params().unwrap().get("w").unwrap().values(), &[1.]);
    }

    #[tokio::test]
    async fn incompatible_update_is_a_participant_failure() {
        struct Wrong;

        #[async_trait]
        impl Participant for Wrong {
            fn id(&self) -> ParticipantId {
                ParticipantId(0)
            }

            fn name(&self) -> &str {
                "wrong"
            }

            async fn train_local(
                &self,
                _params: Arc<ParameterSet>,
                _plan: LocalPlan,
                _cancel: CancellationToken,
            ) -> participant::Result<Update> {
                let mut params = ParameterSet::new();
                params.insert("v", Tensor::scalar(1.));
                Ok(Update::new(self.id(), params, 1, Duration::ZERO))
            }
        }

        let config = FederationConfig {
            max_retries: 0,
            ..Default::default()
        };
        let mut scheduler = RoundScheduler::new(config, Box::new(FedAvg::new()));
        let mut registry = Registry::new(3);
        registry.register(Arc::new(Wrong)).unwrap();

        let err = scheduler
            .run_round(1, &global(), &mut registry, &mut Zero, &mut Reporter::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FedErr::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(registry.consecutive_failures(ParticipantId(0)), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_pool_bounds_concurrent_training() {
        let config = FederationConfig {
            worker_pool_size: 2,
            sample_fraction: 1.0,
            ..Default::default()
        };
        let mut scheduler = RoundScheduler::new(config, Box::new(FedAvg::new()));
        let gauge = Arc::new(Gauge::default());
        let mut registry = Registry::new(3);
        for id in 0..4 {
            let gauge = Arc::clone(&gauge);
            registry.register(Arc::new(Gauged { id, gauge })).unwrap();
        }

        let round = scheduler
            .run_round(1, &global(), &mut registry, &mut Zero, &mut Reporter::new())
            .await
            .unwrap();

        assert_eq!(round.contributors().len(), 4);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert_eq!(gauge.running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn evaluation_failure_is_retried() {
        let config = FederationConfig {
            max_retries: 1,
            ..Default::default()
        };
        let mut scheduler = RoundScheduler::new(config, Box::new(FedAvg::new()));
        let mut registry = registry(vec![Fixed {
            id: 0,
            value: 2.,
            samples: 1,
            delay: Duration::ZERO,
        }]);
        let mut evaluator = Flaky {
            failures: 1,
            calls: 0,
        };

        let round = scheduler
            .run_round(1, &global(), &mut registry, &mut evaluator, &mut Reporter::new())
            .await
            .unwrap();

        assert_eq!(round.attempt(), 2);
        assert_eq!(round.state(), RoundState::Done);

        let mut evaluator = Flaky {
            failures: 2,
            calls: 0,
        };
        let err = scheduler
            .run_round(2, &global(), &mut registry, &mut evaluator, &mut Reporter::new())
            .await
            .unwrap_err();

        match err {
            FedErr::RetriesExhausted {
                round: 2,
                attempts: 2,
                last,
            } => assert!(matches!(*last, FedErr::Evaluation(_))),
            other => panic!("unexpected error {other}"),
        }
    }
}
