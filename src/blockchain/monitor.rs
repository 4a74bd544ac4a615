use log::{debug, error, info, warn};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};

use crate::blockchain::address::display_address;
use crate::blockchain::address_filter::AddressFilter;
use crate::blockchain::rpc_client::RpcTransaction;
use crate::blockchain::status::StatusResolver;
use crate::blockchain::transfer_decoder::TokenTransferDecoder;
use crate::blockchain::transport::EthTransport;
use crate::config::MonitorConfig;
use crate::error::TransportError;
use crate::logging::{LogContext, MetricsLogger};
use crate::models::{format_amount, TransactionStatus, TransferEvent, ETHER_DECIMALS};

/// User callback invoked once per matching observation
pub type TransferCallback = Arc<dyn Fn(TransferEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Ether,
    Token,
}

/// Event pushed by the filter pollers to the dispatch task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainNotification {
    PendingTransaction(String),
    NewBlock(String),
}

impl ChainNotification {
    fn kind(&self) -> &'static str {
        match self {
            ChainNotification::PendingTransaction(_) => "pending_transaction",
            ChainNotification::NewBlock(_) => "new_block",
        }
    }

    fn id(&self) -> &str {
        match self {
            ChainNotification::PendingTransaction(hash) | ChainNotification::NewBlock(hash) => hash,
        }
    }
}

/// Returned by every `monitor_*` call; cancelling stops that watcher only
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    cancelled: Arc<AtomicBool>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

struct Watcher {
    kind: WatchKind,
    filter: AddressFilter,
    callback: TransferCallback,
    cancelled: Arc<AtomicBool>,
}

impl Watcher {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn notify(&self, event: TransferEvent) {
        if self.is_cancelled() {
            return;
        }
        MetricsLogger::log_transfer_observed(
            &event.transaction_id,
            event.status.as_str(),
            &event.amount,
            event.is_token,
        );

        // a panicking callback must not take the shared dispatcher down with it
        let transaction_id = event.transaction_id.clone();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(event))) {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Transfer callback panicked on {}: {}", transaction_id, reason);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    PendingTransactions,
    NewBlocks,
}

impl StreamKind {
    async fn install(&self, transport: &dyn EthTransport) -> Result<String, TransportError> {
        match self {
            StreamKind::PendingTransactions => transport.new_pending_transaction_filter().await,
            StreamKind::NewBlocks => transport.new_block_filter().await,
        }
    }

    fn notification(&self, hash: String) -> ChainNotification {
        match self {
            StreamKind::PendingTransactions => ChainNotification::PendingTransaction(hash),
            StreamKind::NewBlocks => ChainNotification::NewBlock(hash),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::PendingTransactions => f.write_str("pending transactions"),
            StreamKind::NewBlocks => f.write_str("new blocks"),
        }
    }
}

/// Node filter id shared between a poller and `stop`
type FilterSlot = Arc<Mutex<Option<String>>>;

/// Running pollers and dispatcher
struct Streams {
    shutdown_signal: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    filters: Vec<FilterSlot>,
    pollers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
}

/// Upper bound on waiting for a poller to reach a point where its filter id is recorded
const POLLER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the dispatch task needs to turn notifications into callbacks
struct Dispatcher {
    transport: Arc<dyn EthTransport>,
    decoder: TokenTransferDecoder,
    resolver: StatusResolver,
    watchers: Arc<RwLock<Vec<Arc<Watcher>>>>,
    verify_native_receipts: bool,
}

/// Watches the pending pool and new blocks for transfers matching registered filters.
///
/// The two node subscriptions are created on first use and shared by every watcher.
pub struct TransactionMonitor {
    transport: Arc<dyn EthTransport>,
    decoder: TokenTransferDecoder,
    resolver: StatusResolver,
    config: MonitorConfig,
    watchers: Arc<RwLock<Vec<Arc<Watcher>>>>,
    streams: Mutex<Option<Streams>>,
}

impl TransactionMonitor {
    pub fn new(
        transport: Arc<dyn EthTransport>,
        decoder: TokenTransferDecoder,
        resolver: StatusResolver,
        config: MonitorConfig,
    ) -> Self {
        Self {
            transport,
            decoder,
            resolver,
            config,
            watchers: Arc::new(RwLock::new(Vec::new())),
            streams: Mutex::new(None),
        }
    }

    /// Register a watcher, starting the shared streams if they are not running
    pub async fn watch(&self, kind: WatchKind, filter: AddressFilter, callback: TransferCallback) -> MonitorHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let watcher = Arc::new(Watcher {
            kind,
            filter,
            callback,
            cancelled: Arc::clone(&cancelled),
        });

        // holding the streams lock while attaching makes first use from several tasks create one set of streams
        let mut streams = self.streams.lock().await;
        self.watchers.write().await.push(watcher);
        if streams.is_none() {
            *streams = Some(self.start_streams());
        }

        LogContext::new("monitor", "watch")
            .with_metadata("kind", serde_json::json!(format!("{:?}", kind)))
            .info("Registered transaction watcher");

        MonitorHandle { cancelled }
    }

    pub async fn is_running(&self) -> bool {
        self.streams.lock().await.is_some()
    }

    /// Stop pollers and dispatcher, uninstall node filters and cancel every watcher
    pub async fn stop(&self) {
        let streams = self.streams.lock().await.take();

        {
            let mut watchers = self.watchers.write().await;
            for watcher in watchers.iter() {
                watcher.cancelled.store(true, Ordering::Relaxed);
            }
            watchers.clear();
        }

        let Some(streams) = streams else {
            return;
        };

        // pollers stop between node calls so every installed filter id is in its slot
        streams.shutdown_signal.store(true, Ordering::Relaxed);
        streams.shutdown_notify.notify_waiters();
        for mut poller in streams.pollers {
            if timeout(POLLER_SHUTDOWN_TIMEOUT, &mut poller).await.is_err() {
                warn!("Poller did not stop in time, aborting");
                poller.abort();
            }
        }
        streams.dispatcher.abort();

        for slot in &streams.filters {
            let filter_id = slot.lock().await.take();
            if let Some(filter_id) = filter_id {
                if let Err(e) = self.transport.uninstall_filter(&filter_id).await {
                    warn!("Failed to uninstall filter {}: {}", filter_id, e);
                }
            }
        }

        info!("Transaction monitor stopped");
    }

    fn start_streams(&self) -> Streams {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity);
        let shutdown_signal = Arc::new(AtomicBool::new(false));
        let shutdown_notify = Arc::new(Notify::new());
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        let mut filters = Vec::new();
        let mut pollers = Vec::new();

        for kind in [StreamKind::PendingTransactions, StreamKind::NewBlocks] {
            let slot: FilterSlot = Arc::new(Mutex::new(None));
            filters.push(Arc::clone(&slot));
            pollers.push(tokio::spawn(poll_stream(
                kind,
                Arc::clone(&self.transport),
                slot,
                sender.clone(),
                Arc::clone(&shutdown_signal),
                Arc::clone(&shutdown_notify),
                poll_interval,
            )));
        }
        drop(sender);

        let dispatcher = Dispatcher {
            transport: Arc::clone(&self.transport),
            decoder: self.decoder.clone(),
            resolver: self.resolver.clone(),
            watchers: Arc::clone(&self.watchers),
            verify_native_receipts: self.config.verify_native_receipts,
        };
        let dispatcher = tokio::spawn(dispatch_loop(receiver, dispatcher));

        info!("Started transaction monitor with {}ms polling interval", self.config.poll_interval_ms);

        Streams {
            shutdown_signal,
            shutdown_notify,
            filters,
            pollers,
            dispatcher,
        }
    }
}

impl Drop for TransactionMonitor {
    fn drop(&mut self) {
        if let Some(streams) = self.streams.get_mut().take() {
            streams.shutdown_signal.store(true, Ordering::Relaxed);
            for poller in streams.pollers {
                poller.abort();
            }
            streams.dispatcher.abort();
        }
    }
}

/// Poll one node filter and forward every reported hash to the dispatcher.
///
/// A filter the node no longer knows is installed again on the next tick.
async fn poll_stream(
    kind: StreamKind,
    transport: Arc<dyn EthTransport>,
    slot: FilterSlot,
    sender: mpsc::Sender<ChainNotification>,
    shutdown_signal: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    poll_interval: Duration,
) {
    let mut ticker = interval(poll_interval);

    loop {
        if shutdown_signal.load(Ordering::Relaxed) {
            return;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_notify.notified() => {}
        }

        if shutdown_signal.load(Ordering::Relaxed) {
            debug!("Shutdown signal received, stopping {} poller", kind);
            return;
        }

        let filter_id = {
            let mut slot = slot.lock().await;
            match slot.as_ref() {
                Some(filter_id) => filter_id.clone(),
                None => match kind.install(transport.as_ref()).await {
                    Ok(filter_id) => {
                        debug!("Installed {} filter {}", kind, filter_id);
                        *slot = Some(filter_id.clone());
                        filter_id
                    }
                    Err(e) => {
                        warn!("Failed to install {} filter: {}", kind, e);
                        continue;
                    }
                },
            }
        };

        match transport.get_filter_changes(&filter_id).await {
            Ok(hashes) => {
                for hash in hashes {
                    if sender.send(kind.notification(hash)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!("Polling {} filter {} failed, reinstalling: {}", kind, filter_id, e);
                // the node may still hold the filter after a transient failure
                if let Err(e) = transport.uninstall_filter(&filter_id).await {
                    debug!("Could not uninstall {} filter {}: {}", kind, filter_id, e);
                }
                *slot.lock().await = None;
            }
        }
    }
}

async fn dispatch_loop(mut receiver: mpsc::Receiver<ChainNotification>, dispatcher: Dispatcher) {
    while let Some(notification) = receiver.recv().await {
        dispatcher.dispatch(notification).await;
    }
    debug!("Notification channel closed, dispatcher exiting");
}

impl Dispatcher {
    /// Snapshot of live watchers; cancelled ones are pruned
    async fn live_watchers(&self) -> Vec<Arc<Watcher>> {
        let mut watchers = self.watchers.write().await;
        watchers.retain(|w| !w.is_cancelled());
        watchers.clone()
    }

    async fn dispatch(&self, notification: ChainNotification) {
        let watchers = self.live_watchers().await;
        if watchers.is_empty() {
            return;
        }

        match &notification {
            ChainNotification::PendingTransaction(hash) => self.handle_pending(hash, &watchers).await,
            ChainNotification::NewBlock(hash) => self.handle_block(hash, &watchers).await,
        }

        MetricsLogger::log_notification_dispatched(notification.kind(), notification.id(), watchers.len());
    }

    async fn handle_pending(&self, tx_hash: &str, watchers: &[Arc<Watcher>]) {
        let tx = match self.transport.get_transaction_by_hash(tx_hash).await {
            Ok(Some(tx)) => tx,
            // already dropped from the pool
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to fetch pending transaction {}: {}", tx_hash, e);
                return;
            }
        };

        for watcher in watchers {
            let event = match watcher.kind {
                WatchKind::Ether => native_transfer(&tx, &watcher.filter, TransactionStatus::Pending),
                WatchKind::Token => self
                    .decoder
                    .decode_matching(&tx, &watcher.filter)
                    .map(|transfer| transfer.into_event(TransactionStatus::Pending)),
            };
            if let Some(event) = event {
                watcher.notify(event);
            }
        }
    }

    async fn handle_block(&self, block_hash: &str, watchers: &[Arc<Watcher>]) {
        let block = match self.transport.get_block_by_hash(block_hash).await {
            Ok(Some(block)) => block,
            Ok(None) => {
                debug!("Block {} no longer available", block_hash);
                return;
            }
            Err(e) => {
                warn!("Failed to fetch block {}: {}", block_hash, e);
                return;
            }
        };

        for tx in &block.transactions {
            // receipt is fetched at most once per transaction, and only on a match
            let mut receipt_status: Option<TransactionStatus> = None;

            for watcher in watchers {
                let event = match watcher.kind {
                    WatchKind::Ether => {
                        if native_transfer(tx, &watcher.filter, TransactionStatus::Success).is_none() {
                            continue;
                        }
                        let status = if self.verify_native_receipts {
                            match self.receipt_status(tx, &mut receipt_status).await {
                                Some(status) => status,
                                None => continue,
                            }
                        } else {
                            TransactionStatus::Success
                        };
                        native_transfer(tx, &watcher.filter, status)
                    }
                    WatchKind::Token => {
                        let Some(transfer) = self.decoder.decode_matching(tx, &watcher.filter) else {
                            continue;
                        };
                        match self.receipt_status(tx, &mut receipt_status).await {
                            Some(status) => Some(transfer.into_event(status)),
                            None => continue,
                        }
                    }
                };

                if let Some(event) = event {
                    watcher.notify(event);
                }
            }
        }
    }

    async fn receipt_status(&self, tx: &RpcTransaction, cached: &mut Option<TransactionStatus>) -> Option<TransactionStatus> {
        if let Some(status) = cached {
            return Some(*status);
        }
        match self.resolver.resolve_mined(tx).await {
            Ok(status) => {
                *cached = Some(status);
                Some(status)
            }
            Err(e) => {
                warn!("Skipping transaction {}: cannot resolve status: {}", tx.hash, e);
                None
            }
        }
    }
}

/// Plain value transfer matching the filter. Transactions with call data are not plain transfers.
fn native_transfer(tx: &RpcTransaction, filter: &AddressFilter, status: TransactionStatus) -> Option<TransferEvent> {
    if tx.has_payload() {
        return None;
    }
    let to = tx.to.as_deref()?;
    if !filter.matches(&tx.from, Some(to)) {
        return None;
    }
    let value = tx.value_wei().ok()?;

    Some(TransferEvent {
        transaction_id: tx.hash.clone(),
        status,
        from_address: display_address(&tx.from),
        to_address: display_address(to),
        amount: format_amount(value, ETHER_DECIMALS),
        is_token: false,
    })
}
