//! Dashboard session for one contract at a time: fetch orchestration,
//! 7-day analytics, pagination and timed/pushed refreshes.

pub mod analytics;
pub mod format;
pub mod live;
pub mod session;
pub mod source;

pub use analytics::{AnalyticsSummary, DayBucket, VolumeMode, aggregate, aggregate_on};
pub use live::{EventFeed, LiveUpdates, WsEventFeed};
pub use session::{Category, DashboardSession, DashboardState, LoadMore, LoadOutcome};
pub use source::{ApiClient, ContractDataSource};
