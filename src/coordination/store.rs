//! Coordination Store: a run-scoped multi-agent bus backed by three
//! tables (`coordination_runs`, `coordination_messages`,
//! `coordination_claims`). Every write is a single-statement upsert so
//! concurrent agents never race on a read-then-write round trip.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{Error, Result};

use super::types::{
    truncate_body, ClaimOutcome, CollabClaim, CollabMessage, MessagePage, DEFAULT_CLAIM_TTL_SECS,
    DEFAULT_POLL_LIMIT, DUPLICATE_WINDOW_SECS, MAX_POLL_LIMIT, SCOPELESS_KINDS,
};

/// Initialize the connection pool backing the coordination store.
pub async fn init_pool(url: &str, max_connections: u32, connect_timeout_secs: u64) -> Result<PgPool> {
    info!("initializing coordination store connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
        .connect(url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

/// Create the coordination tables if they don't already exist.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coordination_runs (
            run_id TEXT PRIMARY KEY,
            session_id TEXT,
            root_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coordination_messages (
            id BIGSERIAL PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES coordination_runs(run_id) ON DELETE CASCADE,
            session_id TEXT,
            from_agent TEXT NOT NULL,
            to_agent TEXT,
            kind TEXT NOT NULL,
            scope TEXT,
            body TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_coordination_messages_run_id ON coordination_messages(run_id, id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coordination_claims (
            run_id TEXT NOT NULL REFERENCES coordination_runs(run_id) ON DELETE CASCADE,
            scope TEXT NOT NULL,
            claimed_by TEXT NOT NULL,
            claimed_at TIMESTAMPTZ NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (run_id, scope)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct CoordinationStore {
    pool: PgPool,
}

impl CoordinationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn touch_run(&self, run_id: &str) -> Result<()> {
        sqlx::query("UPDATE coordination_runs SET updated_at = NOW() WHERE run_id = $1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Create or upsert a run. `root_id` follows `session_id` when
    /// given, else falls back to `run_id` itself.
    pub async fn start_run(&self, run_id: &str, session_id: Option<&str>) -> Result<()> {
        let root_id = session_id.unwrap_or(run_id);
        sqlx::query(
            r#"
            INSERT INTO coordination_runs (run_id, session_id, root_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', NOW(), NOW())
            ON CONFLICT (run_id) DO UPDATE SET
                session_id = EXCLUDED.session_id,
                updated_at = NOW()
            "#,
        )
        .bind(run_id)
        .bind(session_id)
        .bind(root_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Post a message, enforcing the role/scope/dedup rules.
    /// Returns the id of the (possibly pre-existing, deduped) message.
    #[allow(clippy::too_many_arguments)]
    pub async fn post_message(
        &self,
        run_id: &str,
        session_id: Option<&str>,
        from_agent: &str,
        to_agent: Option<&str>,
        kind: &str,
        scope: Option<&str>,
        body: &str,
    ) -> Result<i64> {
        let kind = kind.to_lowercase();
        let body = truncate_body(body);

        if (kind == "announce" || kind == "decision") && !from_agent.starts_with("Coordinator") {
            return Err(Error::Permission(format!(
                "only agents named Coordinator* may post kind \"{kind}\""
            )));
        }

        if !SCOPELESS_KINDS.contains(&kind.as_str()) {
            let Some(scope) = scope else {
                return Err(Error::InvalidInput(format!(
                    "kind \"{kind}\" requires a scope"
                )));
            };
            let claim = self.get_claim(run_id, scope).await?;
            let holds_claim = claim
                .as_ref()
                .map(|c| c.claimed_by == from_agent && !c.is_expired(Utc::now()))
                .unwrap_or(false);
            if !holds_claim {
                return Err(Error::Permission(format!(
                    "{from_agent} does not hold a live claim on scope \"{scope}\""
                )));
            }
        }

        let dedup_floor = Utc::now() - ChronoDuration::seconds(DUPLICATE_WINDOW_SECS);
        let existing: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM coordination_messages
            WHERE run_id = $1 AND from_agent = $2 AND kind = $3
              AND scope IS NOT DISTINCT FROM $4 AND body = $5
              AND created_at >= $6
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(run_id)
        .bind(from_agent)
        .bind(&kind)
        .bind(scope)
        .bind(&body)
        .bind(dedup_floor)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = existing {
            return Ok(id);
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO coordination_messages (run_id, session_id, from_agent, to_agent, kind, scope, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id
            "#,
        )
        .bind(run_id)
        .bind(session_id)
        .bind(from_agent)
        .bind(to_agent)
        .bind(&kind)
        .bind(scope)
        .bind(&body)
        .fetch_one(&self.pool)
        .await?;

        self.touch_run(run_id).await?;
        Ok(id)
    }

    /// Messages strictly after `since_id`, ascending, plus the new
    /// watermark (max id seen, or `since_id` if the page is empty).
    pub async fn poll_messages(&self, run_id: &str, since_id: i64, limit: Option<i64>) -> Result<MessagePage> {
        let limit = limit.unwrap_or(DEFAULT_POLL_LIMIT).clamp(1, MAX_POLL_LIMIT);
        let messages: Vec<CollabMessage> = sqlx::query_as(
            r#"
            SELECT id, run_id, session_id, from_agent, to_agent, kind, scope, body, created_at
            FROM coordination_messages
            WHERE run_id = $1 AND id > $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(run_id)
        .bind(since_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let watermark = messages.last().map(|m| m.id).unwrap_or(since_id);
        Ok(MessagePage { messages, watermark })
    }

    async fn get_claim(&self, run_id: &str, scope: &str) -> Result<Option<CollabClaim>> {
        let claim: Option<CollabClaim> = sqlx::query_as(
            "SELECT run_id, scope, claimed_by, claimed_at, expires_at FROM coordination_claims WHERE run_id = $1 AND scope = $2",
        )
        .bind(run_id)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await?;
        Ok(claim)
    }

    /// Atomically claim or refresh ownership of `scope` within `run_id`.
    pub async fn claim_scope(
        &self,
        run_id: &str,
        scope: &str,
        claimed_by: &str,
        ttl: Option<std::time::Duration>,
    ) -> Result<ClaimOutcome> {
        let ttl_secs = ttl.map(|d| d.as_secs() as i64).unwrap_or(DEFAULT_CLAIM_TTL_SECS);
        let now: DateTime<Utc> = Utc::now();
        let expires_at = now + ChronoDuration::seconds(ttl_secs);

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            INSERT INTO coordination_claims (run_id, scope, claimed_by, claimed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (run_id, scope) DO UPDATE SET
                claimed_by = EXCLUDED.claimed_by,
                claimed_at = EXCLUDED.claimed_at,
                expires_at = EXCLUDED.expires_at
            WHERE coordination_claims.claimed_by = EXCLUDED.claimed_by
               OR coordination_claims.expires_at <= EXCLUDED.claimed_at
            RETURNING claimed_by
            "#,
        )
        .bind(run_id)
        .bind(scope)
        .bind(claimed_by)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        let outcome = match row {
            Some((owner,)) => {
                self.touch_run(run_id).await?;
                ClaimOutcome { got_it: true, current_owner: owner }
            }
            None => {
                let (owner,): (String,) =
                    sqlx::query_as("SELECT claimed_by FROM coordination_claims WHERE run_id = $1 AND scope = $2")
                        .bind(run_id)
                        .bind(scope)
                        .fetch_one(&self.pool)
                        .await?;
                ClaimOutcome { got_it: false, current_owner: owner }
            }
        };
        Ok(outcome)
    }

    /// All claims for a run, ordered by when they were taken.
    pub async fn list_claims(&self, run_id: &str) -> Result<Vec<CollabClaim>> {
        let claims: Vec<CollabClaim> = sqlx::query_as(
            "SELECT run_id, scope, claimed_by, claimed_at, expires_at FROM coordination_claims WHERE run_id = $1 ORDER BY claimed_at ASC",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(claims)
    }

    /// Release a claim iff `claimed_by` matches the current owner.
    /// Returns whether a row was actually deleted.
    pub async fn release_claim(&self, run_id: &str, scope: &str, claimed_by: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM coordination_claims WHERE run_id = $1 AND scope = $2 AND claimed_by = $3",
        )
        .bind(run_id)
        .bind(scope)
        .bind(claimed_by)
        .execute(&self.pool)
        .await?;

        let released = result.rows_affected() > 0;
        if released {
            self.touch_run(run_id).await?;
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_window_constant_matches_spec() {
        assert_eq!(DUPLICATE_WINDOW_SECS, 10);
    }

    #[test]
    fn poll_limit_defaults_match_spec() {
        assert_eq!(DEFAULT_POLL_LIMIT, 50);
        assert_eq!(MAX_POLL_LIMIT, 200);
    }

    #[test]
    fn claim_ttl_default_matches_spec() {
        assert_eq!(DEFAULT_CLAIM_TTL_SECS, 120);
    }

    // Exercising start_run/post_message/claim_scope end-to-end needs a
    // live Postgres instance; see database/tasks.rs's teacher tests for
    // the same constraint. Pure-logic pieces (truncation, constants) are
    // covered here and in types.rs without one.
}
