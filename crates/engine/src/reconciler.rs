use crate::error::EngineError;
use crate::live_agent::LiveAgentSource;
use crate::market_data::MarketDataSource;
use crate::price_store::PriceStore;
use crate::simulated::SimulatedMarketSource;
use crate::source::PriceSource;
use api_client::{AgentHttpClient, MarketDataHttpClient, SimulatorHttpClient};
use chrono::Utc;
use configuration::{Config, ReconcilerConfig};
use core_types::{PriceQuote, Trade, TradeMode, dedupe_latest};
use events::PriceEvent;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// The set of open trades the reconciler is currently pricing.
///
/// A new generation starts whenever the set of trades, or which source is
/// responsible for one of them, changes. Results fetched for an older generation are
/// never written.
#[derive(Debug, Clone, Default)]
struct Scope {
    generation: u64,
    trades: Arc<Vec<Trade>>,
    ids: Arc<HashSet<String>>,
}

/// Keeps the `PriceStore` current for the open trades it is told about.
///
/// Each registered source polls on its own timer. Sources are ranked by registration
/// order, and a source only asks about trades that every higher-ranked source
/// responsible for them has already tried without producing a fresh quote.
pub struct PriceReconciler {
    store: PriceStore,
    sources: Arc<Vec<Arc<dyn PriceSource>>>,
    scope: watch::Sender<Scope>,
    paused: watch::Sender<bool>,
    scan: Arc<Notify>,
    enabled: bool,
    request_timeout: Duration,
}

impl PriceReconciler {
    pub fn new(config: &ReconcilerConfig, sources: Vec<Arc<dyn PriceSource>>) -> Self {
        let (scope, _) = watch::channel(Scope::default());
        let (paused, _) = watch::channel(false);
        Self {
            store: PriceStore::new(config.priority_window()),
            sources: Arc::new(sources),
            scope,
            paused,
            scan: Arc::new(Notify::new()),
            enabled: config.enabled,
            request_timeout: config.request_timeout(),
        }
    }

    /// Wires the HTTP clients described by `config` in their fixed priority order:
    /// simulator, connected live agent (when configured), public market data.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let rc = &config.reconciler;
        let timeout = rc.request_timeout();
        let mut sources: Vec<Arc<dyn PriceSource>> = Vec::new();

        let simulator = SimulatorHttpClient::from_config(&config.api, timeout)?;
        sources.push(Arc::new(SimulatedMarketSource::new(
            Arc::new(simulator),
            rc.simulated_interval(),
        )));

        match &config.api.live_agent {
            Some(agent) => {
                let client = AgentHttpClient::new(agent, timeout)?;
                sources.push(Arc::new(LiveAgentSource::new(
                    Arc::new(client),
                    rc.live_agent_interval(),
                )));
            }
            None => info!("No live agent configured; live trades fall back to market data."),
        }

        let market = MarketDataHttpClient::from_config(&config.api, timeout)?;
        sources.push(Arc::new(MarketDataSource::new(
            Arc::new(market),
            rc.market_data_interval(),
            rc.market_data_batch_size,
        )));

        Ok(Self::new(rc, sources))
    }

    /// A read handle on the prices this reconciler maintains.
    pub fn store(&self) -> PriceStore {
        self.store.clone()
    }

    pub fn get_current_price(&self, trade_id: &str) -> Option<Decimal> {
        self.store.get(trade_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PriceEvent> {
        self.store.subscribe()
    }

    /// Replaces the set of trades being priced. Only OPEN trades are kept, and prices
    /// for trades that left the set are dropped immediately.
    ///
    /// Re-publishing the same trades only refreshes their records: in-flight requests
    /// keep running and no source polls earlier than its interval.
    pub fn set_open_trades(&self, trades: &[Trade]) {
        let open: Vec<Trade> = dedupe_latest(trades)
            .into_iter()
            .filter(|t| t.is_open())
            .cloned()
            .collect();
        let ids: HashSet<String> = open.iter().map(|t| t.id.clone()).collect();

        // Publish the new scope before pruning, so no fetch that validated against the
        // old scope can write after the prune.
        let rescoped = self.scope.send_if_modified(|scope| {
            if same_routing(&scope.trades, &open) {
                // Unannounced on purpose; pollers read the records on their next cycle.
                scope.trades = Arc::new(open);
                return false;
            }
            scope.generation += 1;
            scope.trades = Arc::new(open);
            scope.ids = Arc::new(ids.clone());
            true
        });
        let removed = self.store.retain(&ids);
        debug!(open = ids.len(), removed = removed.len(), rescoped, "Open trade set updated.");
    }

    /// While paused no requests are issued; in-flight requests are cancelled.
    pub fn set_paused(&self, paused: bool) {
        self.paused.send_replace(paused);
    }

    /// Signals that the simulator finished a scan, prompting an early simulator cycle.
    pub fn notify_scan(&self) {
        self.scan.notify_waiters();
    }

    /// Starts one polling task per source. Must be called inside a Tokio runtime.
    pub fn spawn(&self) -> ReconcilerHandle {
        let (shutdown, _) = watch::channel(false);
        if !self.enabled {
            info!("Price reconciler disabled by configuration.");
            return ReconcilerHandle {
                shutdown,
                tasks: Vec::new(),
            };
        }

        let attempts: Arc<Vec<AtomicU64>> =
            Arc::new(self.sources.iter().map(|_| AtomicU64::new(0)).collect());

        let tasks = self
            .sources
            .iter()
            .enumerate()
            .map(|(rank, source)| {
                info!(source = source.name(), rank, interval = ?source.interval(), "Starting price source.");
                let poller = SourcePoller {
                    rank,
                    source: source.clone(),
                    sources: self.sources.clone(),
                    attempts: attempts.clone(),
                    store: self.store.clone(),
                    scope_rx: self.scope.subscribe(),
                    paused_rx: self.paused.subscribe(),
                    scan: self.scan.clone(),
                    shutdown_rx: shutdown.subscribe(),
                    request_timeout: self.request_timeout,
                    cycle: Arc::new(AtomicU64::new(0)),
                };
                tokio::spawn(poller.run())
            })
            .collect();

        ReconcilerHandle { shutdown, tasks }
    }
}

/// What decides which source is responsible for a trade and what it is asked for.
fn routing_key(trade: &Trade) -> (&str, TradeMode, &str, &str) {
    (
        trade.id.as_str(),
        trade.mode,
        trade.agent_id.as_str(),
        trade.token_address.trim(),
    )
}

/// Whether both sets hold the same trades with the same routing. Ids are unique in
/// either set.
fn same_routing(current: &[Trade], next: &[Trade]) -> bool {
    if current.len() != next.len() {
        return false;
    }
    let keys: HashSet<_> = current.iter().map(routing_key).collect();
    next.iter().all(|t| keys.contains(&routing_key(t)))
}

/// Owns the polling tasks started by `PriceReconciler::spawn`.
pub struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ReconcilerHandle {
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Stops every source loop and waits for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Price source task ended abnormally.");
            }
        }
    }
}

struct SourcePoller {
    rank: usize,
    source: Arc<dyn PriceSource>,
    sources: Arc<Vec<Arc<dyn PriceSource>>>,
    /// Per rank, the scope generation of the last completed attempt.
    attempts: Arc<Vec<AtomicU64>>,
    store: PriceStore,
    scope_rx: watch::Receiver<Scope>,
    paused_rx: watch::Receiver<bool>,
    scan: Arc<Notify>,
    shutdown_rx: watch::Receiver<bool>,
    request_timeout: Duration,
    cycle: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Tick,
    Scan,
    ScopeChanged,
}

struct InFlight {
    generation: u64,
    started: Instant,
    task: JoinHandle<()>,
}

impl SourcePoller {
    async fn run(mut self) {
        let mut ticker = interval(self.source.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<InFlight> = None;

        loop {
            let wake = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                _ = ticker.tick() => Wake::Tick,
                _ = self.scan.notified(), if self.source.follows_scan_events() => {
                    debug!(source = self.source.name(), "Scan event received.");
                    Wake::Scan
                }
                changed = self.scope_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    Wake::ScopeChanged
                }
                changed = self.paused_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *self.paused_rx.borrow() {
                        if let Some(running) = in_flight.take() {
                            running.task.abort();
                        }
                    }
                    continue;
                }
            };

            let generation = self.scope_rx.borrow_and_update().generation;
            if let Some(running) = in_flight.as_ref().filter(|r| !r.task.is_finished()) {
                // A tick or scope change landing right after a cycle started for the
                // same scope joins that cycle instead of restarting it.
                if wake != Wake::Scan
                    && running.generation == generation
                    && running.started.elapsed() < self.source.interval()
                {
                    continue;
                }
            }

            // A new cycle supersedes whatever the previous one still has in flight.
            self.cycle.fetch_add(1, Ordering::SeqCst);
            if let Some(running) = in_flight.take() {
                if !running.task.is_finished() {
                    debug!(source = self.source.name(), ?wake, "Cancelling superseded fetch.");
                    running.task.abort();
                    // Only a fetch that had its full chance to answer counts as tried;
                    // lower-ranked sources may then take over.
                    if running.started.elapsed() >= self.attempt_budget() {
                        self.attempts[self.rank].fetch_max(running.generation, Ordering::SeqCst);
                    }
                }
            }

            if *self.paused_rx.borrow() {
                continue;
            }
            let (generation, candidates) = self.candidates();
            if candidates.is_empty() {
                continue;
            }
            in_flight = Some(InFlight {
                generation,
                started: Instant::now(),
                task: tokio::spawn(self.fetch(generation, candidates)),
            });
        }

        if let Some(running) = in_flight {
            running.task.abort();
        }
        debug!(source = self.source.name(), "Price source stopped.");
    }

    /// How long a fetch must have run before cancelling it still counts as an attempt.
    fn attempt_budget(&self) -> Duration {
        self.source.interval().min(self.request_timeout)
    }

    /// Open trades this source should price now, with the scope generation they
    /// belong to.
    fn candidates(&self) -> (u64, Vec<Trade>) {
        let scope = self.scope_rx.borrow();
        let trades = scope
            .trades
            .iter()
            .filter(|t| self.source.is_candidate(t))
            .filter(|t| self.higher_sources_tried(t, scope.generation))
            .filter(|t| !self.store.has_fresh_quote_above(&t.id, self.rank_u8()))
            .cloned()
            .collect();
        (scope.generation, trades)
    }

    /// Whether every higher-ranked source responsible for `trade` completed at least
    /// one attempt for the current scope.
    fn higher_sources_tried(&self, trade: &Trade, generation: u64) -> bool {
        self.sources[..self.rank]
            .iter()
            .zip(self.attempts.iter())
            .all(|(source, attempted)| {
                !source.is_candidate(trade) || attempted.load(Ordering::SeqCst) >= generation
            })
    }

    fn rank_u8(&self) -> u8 {
        u8::try_from(self.rank).unwrap_or(u8::MAX)
    }

    fn fetch(&self, generation: u64, trades: Vec<Trade>) -> impl Future<Output = ()> + Send + 'static {
        let source = self.source.clone();
        let store = self.store.clone();
        let scope_rx = self.scope_rx.clone();
        let attempts = self.attempts.clone();
        let cycle_counter = self.cycle.clone();
        let cycle = cycle_counter.load(Ordering::SeqCst);
        let rank = self.rank;
        let source_rank = self.rank_u8();
        let timeout = self.request_timeout;

        async move {
            let outcome = match tokio::time::timeout(timeout, source.try_fetch(&trades)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout(source.name(), timeout)),
            };
            attempts[rank].fetch_max(generation, Ordering::SeqCst);

            let prices = match outcome {
                Ok(prices) => prices,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Price fetch failed; trades keep their last known price.");
                    return;
                }
            };

            if cycle_counter.load(Ordering::SeqCst) != cycle {
                debug!(source = source.name(), "Discarding response from a superseded cycle.");
                return;
            }

            // Holding the borrow keeps the scope from changing until all writes land.
            let scope = scope_rx.borrow();
            if scope.generation != generation {
                debug!(source = source.name(), "Discarding response for a replaced trade set.");
                return;
            }

            let fetched_at = Utc::now();
            let mut accepted = 0usize;
            for (trade_id, price) in prices {
                if price <= Decimal::ZERO || !scope.ids.contains(&trade_id) {
                    continue;
                }
                let quote = PriceQuote {
                    trade_id,
                    price,
                    source_rank,
                    fetched_at,
                };
                if store.set_if_higher_priority(quote) {
                    accepted += 1;
                }
            }
            debug!(source = source.name(), requested = trades.len(), accepted, "Price cycle complete.");
        }
    }
}
