use crate::models::event::{EventRow, EventVenueRow};
use crate::realtime::change::{Change, ChangeFeedMessage, EventChange, VenueChange};

/// Callbacks for changes on the `events` table.
pub trait EventSubscriptionHandlers {
    fn on_insert(&mut self, row: EventRow);
    fn on_update(&mut self, row: EventRow);
    fn on_delete(&mut self, event_id: String);
}

/// Callbacks for changes on the `event_venues` table.
pub trait VenueSubscriptionHandlers {
    fn on_insert(&mut self, row: EventVenueRow);
    fn on_delete(&mut self, row: EventVenueRow);
    fn on_update(&mut self, new: EventVenueRow, old: EventVenueRow);
}

/// Routes an event-table change to `handlers`. Returns false when the message
/// was for another table or could not be decoded.
pub fn dispatch_event_change<H>(message: &ChangeFeedMessage, handlers: &mut H) -> bool
where
    H: EventSubscriptionHandlers + ?Sized,
{
    match message.decode() {
        Some(Change::Event(EventChange::Insert(row))) => handlers.on_insert(row),
        Some(Change::Event(EventChange::Update(row))) => handlers.on_update(row),
        Some(Change::Event(EventChange::Delete(event_id))) => handlers.on_delete(event_id),
        _ => return false,
    }
    true
}

/// Routes a venue-table change to `handlers`.
pub fn dispatch_venue_change<H>(message: &ChangeFeedMessage, handlers: &mut H) -> bool
where
    H: VenueSubscriptionHandlers + ?Sized,
{
    match message.decode() {
        Some(Change::Venue(VenueChange::Insert(row))) => handlers.on_insert(row),
        Some(Change::Venue(VenueChange::Delete(row))) => handlers.on_delete(row),
        Some(Change::Venue(VenueChange::Update { new, old })) => handlers.on_update(new, old),
        _ => return false,
    }
    true
}
