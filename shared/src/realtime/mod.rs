//! Client-side view of the realtime change feed.

pub mod change;
pub mod dashboard;
pub mod handlers;
pub mod reconcile;

pub use change::{
    dashboard_channel, Change, ChangeFeedMessage, ChangeKind, ChannelStatus, EventChange,
    ServerFrame, StatusFrame, VenueChange,
};
pub use dashboard::DashboardEvents;
pub use handlers::{
    dispatch_event_change, dispatch_venue_change, EventSubscriptionHandlers,
    VenueSubscriptionHandlers,
};
pub use reconcile::{
    add_venue, remove_event, remove_venue, sort_events, update_event_venues, update_venue,
    upsert_event,
};
