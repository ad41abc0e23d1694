use std::{sync::RwLock, time::Duration};

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

/// Expected capacity and false-positive rate of the filter.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Answers "is this username taken?" without touching the database when
/// possible.
///
/// The cuckoo filter gives fast negatives (never a false "free"), the cache
/// gives fast positives for recently active accounts. Everything else falls
/// through to the `users` table.
pub struct UsernameIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

impl Default for UsernameIndex {
    fn default() -> Self {
        Self::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)
    }
}

impl UsernameIndex {
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(capacity, false_positive_rate)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// False positives possible; a poisoned lock answers "maybe".
    pub fn might_exist(&self, username: &str) -> bool {
        let username = normalize(username);
        self.filter
            .read()
            .map(|f| f.contains(&username))
            .unwrap_or(true)
    }

    pub async fn is_cached_taken(&self, username: &str) -> bool {
        self.taken.get(&normalize(username)).await.is_some()
    }

    pub async fn mark_taken(&self, username: &str) {
        let username = normalize(username);
        if let Ok(mut filter) = self.filter.write() {
            filter.add(&username);
        }
        self.taken.insert(username, ()).await;
    }

    /// true  => username AVAILABLE
    /// false => username TAKEN
    pub async fn is_available(&self, username: &str, pool: &MySqlPool) -> bool {
        if !self.might_exist(username) {
            return true;
        }
        if self.is_cached_taken(username).await {
            return false;
        }

        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
        )
        .bind(normalize(username))
        .fetch_one(pool)
        .await
        .map(|found| found != 0)
        .unwrap_or(true); // fail-safe

        if exists {
            self.taken.insert(normalize(username), ()).await;
        }
        !exists
    }

    fn insert_batch(&self, usernames: &[String]) {
        if let Ok(mut filter) = self.filter.write() {
            for username in usernames {
                filter.add(username);
            }
        }
    }

    /// Streams every username into the filter and recently active ones into
    /// the cache.
    pub async fn warmup(&self, pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT username,
                   CAST(COALESCE(last_login_at >= NOW() - INTERVAL ? DAY, 0) AS SIGNED) AS recent
            FROM users
            "#,
        )
        .bind(recent_days)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;
        let mut recent = 0usize;

        while let Some(row) = stream.next().await {
            let (username, recent_flag) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
            let username = normalize(&username);
            total += 1;

            if recent_flag != 0 {
                self.taken.insert(username.clone(), ()).await;
                recent += 1;
            }

            batch.push(username);
            if batch.len() >= batch_size {
                self.insert_batch(&batch);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch);
        }

        tracing::info!(total, recent, recent_days, "Username index warmup complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_names_are_taken_case_insensitively() {
        let index = UsernameIndex::new(1_000, 0.001);
        assert!(!index.might_exist("Nimal"));

        index.mark_taken("Nimal").await;
        assert!(index.might_exist("nimal"));
        assert!(index.is_cached_taken(" NIMAL ").await);
    }

    #[actix_web::test]
    async fn unknown_names_short_circuit_before_the_database() {
        let index = UsernameIndex::new(1_000, 0.001);
        // The lazy pool would fail if queried; a filter miss never gets there.
        assert!(index.is_available("fresh-user", &crate::db::lazy_pool()).await);
    }
}
