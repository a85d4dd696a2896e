use crate::models::event::{EventRow, EventVenueRow, EventWithVenues};
use crate::realtime::change::{Change, ChangeFeedMessage, EventChange, VenueChange};
use crate::realtime::handlers::{EventSubscriptionHandlers, VenueSubscriptionHandlers};
use crate::realtime::reconcile;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};

pub const MAX_PENDING_EVENTS: usize = 256;
pub const MAX_PENDING_OPS_PER_EVENT: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingVenueOp {
    Add(String),
    Remove(String),
    Rename { old: String, new: String },
}

/// The dashboard's local event collection, kept in step with the change feed.
///
/// Venue notifications for an event that is not known yet are held back and
/// replayed once the event row arrives, so the converged collection does not
/// depend on whether event or venue notifications came first. The buffer is
/// bounded; the oldest entries are dropped when it fills.
#[derive(Debug, Default)]
pub struct DashboardEvents {
    events: Vec<EventWithVenues>,
    pending: HashMap<String, Vec<PendingVenueOp>>,
    pending_order: VecDeque<String>,
    revision: u64,
}

impl DashboardEvents {
    pub fn new(initial: Vec<EventWithVenues>) -> Self {
        Self {
            events: reconcile::sort_events(initial),
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[EventWithVenues] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EventWithVenues> {
        self.events
    }

    /// Incremented on every applied change; derived views key on it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending_len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Reseeds from a fresh query result and forgets buffered venue changes.
    pub fn reset(&mut self, events: Vec<EventWithVenues>) {
        self.events = reconcile::sort_events(events);
        self.pending.clear();
        self.pending_order.clear();
        self.revision += 1;
    }

    fn replace(&mut self, f: impl FnOnce(Vec<EventWithVenues>) -> Vec<EventWithVenues>) {
        let events = std::mem::take(&mut self.events);
        self.events = f(events);
        self.revision += 1;
    }

    fn contains(&self, event_id: &str) -> bool {
        self.events.iter().any(|event| event.id == event_id)
    }

    pub fn upsert_event(&mut self, row: EventRow) {
        let event_id = row.id.clone();
        let is_new = !self.contains(&event_id);
        self.replace(|events| reconcile::upsert_event(events, row));
        if is_new {
            self.replay_pending(&event_id);
        }
    }

    pub fn remove_event(&mut self, event_id: &str) {
        self.drop_pending(event_id);
        self.replace(|events| reconcile::remove_event(events, event_id));
    }

    pub fn add_venue(&mut self, event_id: &str, venue_name: &str) {
        if self.contains(event_id) {
            self.replace(|events| reconcile::add_venue(events, event_id, venue_name));
        } else {
            self.buffer(event_id, PendingVenueOp::Add(venue_name.to_string()));
        }
    }

    pub fn remove_venue(&mut self, event_id: &str, venue_name: &str) {
        if self.contains(event_id) {
            self.replace(|events| reconcile::remove_venue(events, event_id, venue_name));
        } else {
            self.buffer(event_id, PendingVenueOp::Remove(venue_name.to_string()));
        }
    }

    pub fn update_venue(&mut self, event_id: &str, old_name: &str, new_name: &str) {
        if old_name == new_name {
            return;
        }
        if self.contains(event_id) {
            self.replace(|events| reconcile::update_venue(events, event_id, old_name, new_name));
        } else {
            self.buffer(
                event_id,
                PendingVenueOp::Rename {
                    old: old_name.to_string(),
                    new: new_name.to_string(),
                },
            );
        }
    }

    /// Applies one feed message. Undecodable messages are ignored.
    pub fn apply(&mut self, message: &ChangeFeedMessage) {
        let Some(change) = message.decode() else {
            debug!("Ignoring incomplete change notification: {}", message);
            return;
        };
        match change {
            Change::Event(EventChange::Insert(row)) | Change::Event(EventChange::Update(row)) => {
                self.upsert_event(row)
            }
            Change::Event(EventChange::Delete(event_id)) => self.remove_event(&event_id),
            Change::Venue(VenueChange::Insert(row)) => self.add_venue(&row.event_id, &row.name),
            Change::Venue(VenueChange::Delete(row)) => self.remove_venue(&row.event_id, &row.name),
            Change::Venue(VenueChange::Update { new, old }) => {
                self.update_venue(&new.event_id, &old.name, &new.name)
            }
        }
    }

    fn buffer(&mut self, event_id: &str, op: PendingVenueOp) {
        if !self.pending.contains_key(event_id) {
            if self.pending_order.len() >= MAX_PENDING_EVENTS {
                if let Some(evicted) = self.pending_order.pop_front() {
                    warn!("Dropping buffered venue changes for event_id={}", evicted);
                    self.pending.remove(&evicted);
                }
            }
            self.pending_order.push_back(event_id.to_string());
        }

        let ops = self.pending.entry(event_id.to_string()).or_default();
        if ops.len() >= MAX_PENDING_OPS_PER_EVENT {
            warn!("Venue change buffer full for event_id={}, dropping oldest", event_id);
            ops.remove(0);
        }
        ops.push(op);
    }

    fn drop_pending(&mut self, event_id: &str) {
        if self.pending.remove(event_id).is_some() {
            self.pending_order.retain(|id| id != event_id);
        }
    }

    fn replay_pending(&mut self, event_id: &str) {
        let Some(ops) = self.pending.remove(event_id) else {
            return;
        };
        self.pending_order.retain(|id| id != event_id);
        debug!("Replaying {} buffered venue changes for event_id={}", ops.len(), event_id);

        for op in ops {
            match op {
                PendingVenueOp::Add(name) => self.add_venue(event_id, &name),
                PendingVenueOp::Remove(name) => self.remove_venue(event_id, &name),
                PendingVenueOp::Rename { old, new } => self.update_venue(event_id, &old, &new),
            }
        }
    }
}

impl EventSubscriptionHandlers for DashboardEvents {
    fn on_insert(&mut self, row: EventRow) {
        self.upsert_event(row);
    }

    fn on_update(&mut self, row: EventRow) {
        self.upsert_event(row);
    }

    fn on_delete(&mut self, event_id: String) {
        self.remove_event(&event_id);
    }
}

impl VenueSubscriptionHandlers for DashboardEvents {
    fn on_insert(&mut self, row: EventVenueRow) {
        self.add_venue(&row.event_id, &row.name);
    }

    fn on_delete(&mut self, row: EventVenueRow) {
        self.remove_venue(&row.event_id, &row.name);
    }

    fn on_update(&mut self, new: EventVenueRow, old: EventVenueRow) {
        self.update_venue(&new.event_id, &old.name, &new.name);
    }
}
