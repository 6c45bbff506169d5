//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by UI/adapter into the application
//! - Outbound: Called by application into the data store

pub mod inbound;
pub mod outbound;

pub use inbound::InputPort;
pub use outbound::{BillingRepoPort, ChangeFeedPort, ChantierRepoPort, NotificationPort, TaskRepoPort};

/// Full data store: every outbound port at once. Blanket-implemented.
pub trait DataStore:
    ChantierRepoPort + TaskRepoPort + BillingRepoPort + NotificationPort + ChangeFeedPort
{
}

impl<T> DataStore for T where
    T: ChantierRepoPort + TaskRepoPort + BillingRepoPort + NotificationPort + ChangeFeedPort
{
}
