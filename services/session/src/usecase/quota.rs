use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, SecondsFormat, Utc};

use crate::domain::store::{Counter, CounterSeed, Decrement, KvStore};
use crate::domain::types::{QuotaKind, QuotaPolicy, QuotaRecord, QuotaScope};
use crate::error::SessionError;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Monday of the ISO week containing `now`.
pub fn week_start(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today - Days::new(u64::from(today.weekday().num_days_from_monday()))
}

/// Next Monday 00:00 UTC strictly after `now`'s week start.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    (week_start(now) + Days::new(7))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Random identifier for clients that have no device fingerprint yet.
pub fn generate_device_fingerprint() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Per-scope usage allotment on top of the key-value store.
pub struct QuotaLedger<S: KvStore> {
    pub store: S,
    pub policy: QuotaPolicy,
}

impl<S: KvStore> QuotaLedger<S> {
    fn seed(&self, scope: &QuotaScope, now: DateTime<Utc>) -> CounterSeed {
        match scope {
            QuotaScope::Anonymous(_) => CounterSeed {
                total: i64::from(self.policy.anonymous_total),
                window_start: now.to_rfc3339_opts(SecondsFormat::Secs, true),
                ttl: Some(Duration::from_secs(
                    u64::from(self.policy.anonymous_window_days) * SECS_PER_DAY,
                )),
            },
            QuotaScope::User(_) => CounterSeed {
                total: i64::from(self.policy.user_weekly_total),
                window_start: week_start(now).to_string(),
                ttl: None,
            },
        }
    }

    fn reset_hint(scope: &QuotaScope, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match scope.kind() {
            QuotaKind::User => Some(next_reset(now)),
            QuotaKind::Anonymous => None,
        }
    }

    fn record(
        scope: &QuotaScope,
        counter: Counter,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, SessionError> {
        let remaining = u32::try_from(counter.remaining)
            .map_err(|_| anyhow::anyhow!("counter {} out of range", scope.key()))?;
        let total = u32::try_from(counter.total)
            .map_err(|_| anyhow::anyhow!("counter total {} out of range", scope.key()))?;
        Ok(QuotaRecord {
            scope_key: scope.key(),
            kind: scope.kind(),
            remaining,
            total,
            window_start: counter.window_start,
            reset_at: Self::reset_hint(scope, now),
        })
    }

    pub async fn get_or_init(&self, scope: &QuotaScope) -> Result<QuotaRecord, SessionError> {
        self.get_or_init_at(scope, Utc::now()).await
    }

    pub async fn get_or_init_at(
        &self,
        scope: &QuotaScope,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, SessionError> {
        let counter = self
            .store
            .counter_get_or_init(&scope.key(), &self.seed(scope, now))
            .await?;
        Self::record(scope, counter, now)
    }

    /// Refill a user scope once `now` has crossed into a later ISO week than
    /// the stored window. Anonymous scopes never reset; they expire instead.
    pub async fn reset_if_new_week_at(
        &self,
        scope: &QuotaScope,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        if scope.kind() != QuotaKind::User {
            return Ok(false);
        }
        let seed = self.seed(scope, now);
        let reset = self
            .store
            .counter_reset_window(&scope.key(), &seed)
            .await?;
        if reset {
            tracing::info!(scope = %scope.key(), window_start = %seed.window_start, "weekly quota reset");
        }
        Ok(reset)
    }

    pub async fn decrement(&self, scope: &QuotaScope) -> Result<u32, SessionError> {
        self.decrement_at(scope, Utc::now()).await
    }

    /// Consume one unit and return what is left.
    pub async fn decrement_at(
        &self,
        scope: &QuotaScope,
        now: DateTime<Utc>,
    ) -> Result<u32, SessionError> {
        self.reset_if_new_week_at(scope, now).await?;
        let outcome = self
            .store
            .counter_decrement(&scope.key(), &self.seed(scope, now))
            .await?;
        match outcome {
            Decrement::Applied(remaining) => {
                tracing::debug!(scope = %scope.key(), remaining, "quota decremented");
                u32::try_from(remaining)
                    .map_err(|_| anyhow::anyhow!("counter {} out of range", scope.key()).into())
            }
            Decrement::Exhausted => {
                tracing::info!(scope = %scope.key(), "quota exhausted");
                Err(SessionError::QuotaExhausted {
                    reset_at: Self::reset_hint(scope, now),
                })
            }
        }
    }

    pub async fn get_quota(&self, scope: &QuotaScope) -> Result<QuotaRecord, SessionError> {
        self.get_quota_at(scope, Utc::now()).await
    }

    /// Current allotment as a caller should see it; user scopes are
    /// refilled first so last week's exhaustion never shows through.
    pub async fn get_quota_at(
        &self,
        scope: &QuotaScope,
        now: DateTime<Utc>,
    ) -> Result<QuotaRecord, SessionError> {
        self.reset_if_new_week_at(scope, now).await?;
        self.get_or_init_at(scope, now).await
    }
}
