//! Capability dispatcher
//!
//! Keeps, per channel, the ordered list of objects subscribed to it. Pumps
//! run over a snapshot so handlers may store or purge entries (including
//! their own) while the pump is in progress:
//!
//! - an entry purged mid-pump is skipped for the rest of that pump;
//! - an entry stored mid-pump is first invoked on the next pump;
//! - no entry is invoked twice in one pump.

use crate::capability::{CapabilityTable, Delivery, Invoke};
use crate::handle::{Handle, ObjectId};
use crate::metrics::{ChannelMetrics, MetricsSnapshot};
use fiber_types::{Channel, Event, NodeId};
use hashbrown::HashMap;
use std::any::TypeId;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{trace, warn};

/// One object's subscription to one channel
#[derive(Clone)]
struct Subscriber {
    handle: Handle,
    invoke: Invoke,
    scope: Option<NodeId>,
    live: Rc<Cell<bool>>,
}

/// Per-channel subscriber lists plus the cached capability tables
pub struct Dispatcher {
    channels: HashMap<Channel, Vec<Subscriber>>,
    tables: HashMap<TypeId, CapabilityTable>,
    metrics: HashMap<Channel, Rc<ChannelMetrics>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let metrics = Channel::ALL
            .iter()
            .map(|channel| (*channel, Rc::new(ChannelMetrics::new(*channel))))
            .collect();
        Self {
            channels: HashMap::new(),
            tables: HashMap::new(),
            metrics,
        }
    }

    fn table(&mut self, handle: &Handle) -> &CapabilityTable {
        self.tables
            .entry(handle.type_id())
            .or_insert_with(|| handle.capability_table())
    }

    /// Subscribe an object to every channel its type declares.
    ///
    /// `scope` is the node the object's triad is bound to; node-scoped
    /// deliveries only reach matching subscribers. Returns the number of
    /// channels joined; channels the object is already on are left alone.
    pub fn store(&mut self, handle: &Handle, scope: Option<NodeId>) -> usize {
        let entries: Vec<(Channel, Invoke)> = self.table(handle).entries().to_vec();
        if entries.is_empty() {
            return 0;
        }

        let live = Rc::new(Cell::new(true));
        let mut joined = 0;
        for (channel, invoke) in entries {
            let list = self.channels.entry(channel).or_default();
            if list.iter().any(|s| s.handle.id() == handle.id()) {
                continue;
            }
            list.push(Subscriber {
                handle: handle.clone(),
                invoke,
                scope,
                live: live.clone(),
            });
            joined += 1;
        }

        trace!(object = %handle.id(), kind = handle.type_name(), joined, "stored");
        joined
    }

    /// Remove an object from every channel. Never fails; returns the number
    /// of channels it was removed from.
    pub fn purge(&mut self, handle: &Handle) -> usize {
        let id = handle.id();
        let mut removed = 0;
        for list in self.channels.values_mut() {
            list.retain(|s| {
                if s.handle.id() == id {
                    s.live.set(false);
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.channels.retain(|_, list| !list.is_empty());

        if removed > 0 {
            trace!(object = %id, kind = handle.type_name(), removed, "purged");
        }
        removed
    }

    pub fn is_subscribed(&self, handle: &Handle, channel: Channel) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|list| list.iter().any(|s| s.handle.id() == handle.id()))
    }

    /// Whether the object is on any channel
    pub fn contains(&self, id: ObjectId) -> bool {
        self.channels
            .values()
            .any(|list| list.iter().any(|s| s.handle.id() == id))
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.channels.get(&channel).map_or(0, Vec::len)
    }

    /// Objects on a channel, in subscription order
    pub fn subscribers(&self, channel: Channel) -> Vec<Handle> {
        self.channels
            .get(&channel)
            .map(|list| list.iter().map(|s| s.handle.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot the subscribers for one pump.
    ///
    /// With a `scope`, only subscribers bound to that node are included.
    pub fn batch(&self, channel: Channel, scope: Option<NodeId>) -> Batch {
        let subscribers = self
            .channels
            .get(&channel)
            .map(|list| {
                list.iter()
                    .filter(|s| scope.is_none() || s.scope == scope)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let metrics = match self.metrics.get(&channel) {
            Some(metrics) => metrics.clone(),
            None => Rc::new(ChannelMetrics::new(channel)),
        };

        Batch {
            channel,
            subscribers,
            metrics,
        }
    }

    /// Snapshot, then invoke every subscriber of the event's channel
    pub fn pump(&self, event: &Event) -> usize {
        self.batch(event.channel(), None).run(event, true)
    }

    /// Drop every subscription. Cached tables and metrics are kept.
    pub fn clear(&mut self) {
        for list in self.channels.values() {
            for subscriber in list {
                subscriber.live.set(false);
            }
        }
        self.channels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Snapshots for every channel that has been pumped
    pub fn metrics(&self) -> Vec<MetricsSnapshot> {
        let mut snapshots: Vec<_> = self
            .metrics
            .values()
            .map(|m| m.snapshot())
            .filter(|s| s.pumps > 0)
            .collect();
        snapshots.sort_by_key(|s| s.channel);
        snapshots
    }

    pub fn reset_metrics(&self) {
        for metrics in self.metrics.values() {
            metrics.reset();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .channels
            .iter()
            .map(|(channel, list)| (*channel, list.len()))
            .collect();
        counts.sort();
        f.debug_struct("Dispatcher")
            .field("channels", &counts)
            .field("cached_tables", &self.tables.len())
            .finish()
    }
}

/// A snapshot of one channel's subscribers, detached from the dispatcher
pub struct Batch {
    channel: Channel,
    subscribers: Vec<Subscriber>,
    metrics: Rc<ChannelMetrics>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Invoke every subscriber still live. Returns the number of deliveries.
    pub fn run(&self, event: &Event, warn_on_busy: bool) -> usize {
        self.run_then(event, warn_on_busy, || {})
    }

    /// Like [`run`](Self::run), calling `after_each` once each handler that
    /// ran has returned
    pub fn run_then(&self, event: &Event, warn_on_busy: bool, mut after_each: impl FnMut()) -> usize {
        self.metrics.record_pump();
        trace!(channel = %self.channel, subscribers = self.subscribers.len(), "pump");

        let mut delivered = 0;
        for subscriber in &self.subscribers {
            if !subscriber.live.get() {
                self.metrics.record_stale();
                continue;
            }

            match (subscriber.invoke)(subscriber.handle.cell(), event) {
                Delivery::Delivered => {
                    self.metrics.record_delivered();
                    delivered += 1;
                    after_each();
                }
                Delivery::Busy => {
                    self.metrics.record_busy();
                    if warn_on_busy {
                        warn!(
                            channel = %self.channel,
                            kind = subscriber.handle.type_name(),
                            "handler skipped: target already borrowed"
                        );
                    }
                }
                Delivery::Mismatch => {
                    warn!(
                        channel = %self.channel,
                        kind = subscriber.handle.type_name(),
                        "handler skipped: capability table does not match object"
                    );
                }
            }
        }
        delivered
    }
}
