//! Coordination Store — a run-scoped multi-agent bus
//! with poll cursors and scope claims (leases), backed by Postgres.

mod store;
mod types;

pub use store::{init_pool, run_migrations, CoordinationStore};
pub use types::{
    truncate_body, ClaimOutcome, CollabClaim, CollabMessage, MessagePage, Run, DEFAULT_CLAIM_TTL_SECS,
    DEFAULT_POLL_LIMIT, DUPLICATE_WINDOW_SECS, MAX_BODY_CHARS, MAX_POLL_LIMIT, SCOPELESS_KINDS,
};
