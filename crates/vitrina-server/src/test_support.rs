//! Fixtures shared by the server's unit tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use vitrina_core::{sync_key, AppConfig, CatalogRow, Environment, SyncStrategy};
use vitrina_db::DbError;

use crate::sync::SyncStore;

pub(crate) fn test_config(zureo_base_url: &str) -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/vitrina_test".to_string(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
        category_synonyms_path: PathBuf::from("./config/category_synonyms.yaml"),
        db_max_connections: 5,
        db_min_connections: 1,
        db_acquire_timeout_secs: 5,
        zureo_base_url: zureo_base_url.to_string(),
        zureo_username: Some("user".to_string()),
        zureo_password: Some("pass".to_string()),
        zureo_domain: Some("acme.uy".to_string()),
        zureo_company_id: Some("7".to_string()),
        zureo_request_timeout_secs: 5,
        zureo_page_size: 10,
        zureo_page_delay_ms: 0,
        zureo_slow_page_every: 0,
        zureo_slow_page_delay_ms: 0,
        zureo_rate_limit_cooldown_secs: 0,
        zureo_max_rate_limit_retries: 0,
        sync_strategy: SyncStrategy::Upsert,
        sync_batch_size: 100,
        sync_freshness_hours: 24,
        sync_lease_secs: 900,
        sync_schedule: "0 0 4 * * *".to_string(),
        placeholder_image_url: "/placeholder.svg".to_string(),
    }
}

pub(crate) fn catalog_row(code: &str, variety_id: Option<i64>) -> CatalogRow {
    CatalogRow {
        external_product_id: 1,
        external_code: code.to_string(),
        external_variety_id: variety_id,
        sync_key: sync_key(code, variety_id),
        name: format!("Producto {code}"),
        slug: code.to_lowercase(),
        description: None,
        short_description: None,
        price: 122,
        source_price: Decimal::new(100, 0),
        tax_multiplier: Decimal::new(122, 2),
        stock: 1,
        category: None,
        subcategory: None,
        brand: None,
        color: None,
        size: None,
        attributes_inferred: false,
        image_url: "/placeholder.svg".to_string(),
        is_featured: false,
        raw_payload: serde_json::json!({}),
        synced_at: Utc::now(),
    }
}

#[derive(Debug, Default)]
struct FakeState {
    /// `sync_key -> (row, is_active)`
    rows: BTreeMap<String, (CatalogRow, bool)>,
    batch_sizes: Vec<usize>,
    fail_key: Option<String>,
    subcategories: Vec<String>,
    lease: Option<Uuid>,
    /// The next renewal finds the lease claimed by another run.
    lose_lease_on_renew: bool,
    renewals: usize,
    status: Option<&'static str>,
    last_completed_at: Option<DateTime<Utc>>,
    total_records: Option<i32>,
    error_message: Option<String>,
}

/// In-memory [`SyncStore`].
#[derive(Debug, Default)]
pub(crate) struct FakeStore {
    state: Mutex<FakeState>,
}

impl FakeStore {
    pub(crate) fn seed_row(&self, row: CatalogRow) {
        let mut state = self.state.lock().unwrap();
        state.rows.insert(row.sync_key.clone(), (row, true));
    }

    /// Any batch containing `sync_key` fails to write.
    pub(crate) fn fail_batches_containing(&self, sync_key: &str) {
        self.state.lock().unwrap().fail_key = Some(sync_key.to_string());
    }

    pub(crate) fn set_subcategories(&self, names: &[&str]) {
        self.state.lock().unwrap().subcategories =
            names.iter().map(ToString::to_string).collect();
    }

    pub(crate) fn set_last_completed_at(&self, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.status = Some("completed");
        state.last_completed_at = Some(at);
    }

    pub(crate) fn hold_lease(&self) {
        let mut state = self.state.lock().unwrap();
        state.lease = Some(Uuid::new_v4());
        state.status = Some("in_progress");
    }

    pub(crate) fn renewals(&self) -> usize {
        self.state.lock().unwrap().renewals
    }

    pub(crate) fn lose_lease_on_renew(&self) {
        self.state.lock().unwrap().lose_lease_on_renew = true;
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    pub(crate) fn contains(&self, sync_key: &str) -> bool {
        self.state.lock().unwrap().rows.contains_key(sync_key)
    }

    pub(crate) fn is_active(&self, sync_key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(sync_key)
            .is_some_and(|(_, active)| *active)
    }

    pub(crate) fn row(&self, sync_key: &str) -> Option<CatalogRow> {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(sync_key)
            .map(|(row, _)| row.clone())
    }

    pub(crate) fn status(&self) -> Option<&'static str> {
        self.state.lock().unwrap().status
    }

    pub(crate) fn lease_held(&self) -> bool {
        self.state.lock().unwrap().lease.is_some()
    }

    pub(crate) fn total_records(&self) -> Option<i32> {
        self.state.lock().unwrap().total_records
    }

    pub(crate) fn error_message(&self) -> Option<String> {
        self.state.lock().unwrap().error_message.clone()
    }

    fn record_batch(&self, rows: &[CatalogRow]) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state.batch_sizes.push(rows.len());
        let poisoned = state
            .fail_key
            .as_ref()
            .is_some_and(|key| rows.iter().any(|r| &r.sync_key == key));
        if poisoned {
            return Err(DbError::Sqlx(sqlx::Error::Protocol(
                "simulated batch failure".to_string(),
            )));
        }
        Ok(())
    }
}

impl SyncStore for FakeStore {
    async fn last_completed_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        Ok(self.state.lock().unwrap().last_completed_at)
    }

    async fn claim_lease(&self, _lease_secs: i64) -> Result<Option<Uuid>, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.lease.is_some() {
            return Ok(None);
        }
        let lease = Uuid::new_v4();
        state.lease = Some(lease);
        state.status = Some("in_progress");
        state.error_message = None;
        Ok(Some(lease))
    }

    async fn renew_lease(&self, lease: Uuid, _lease_secs: i64) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        state.renewals += 1;
        if std::mem::take(&mut state.lose_lease_on_renew) {
            state.lease = Some(Uuid::new_v4());
        }
        Ok(state.lease == Some(lease))
    }

    async fn complete(&self, lease: Uuid, total_records: i32) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.lease != Some(lease) {
            return Ok(false);
        }
        state.lease = None;
        state.status = Some("completed");
        state.last_completed_at = Some(Utc::now());
        state.total_records = Some(total_records);
        Ok(true)
    }

    async fn fail(&self, lease: Uuid, error_message: &str) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.lease != Some(lease) {
            return Ok(false);
        }
        state.lease = None;
        state.status = Some("failed");
        state.error_message = Some(error_message.to_string());
        Ok(true)
    }

    async fn subcategory_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.state.lock().unwrap().subcategories.clone())
    }

    async fn insert_rows(&self, rows: &[CatalogRow]) -> Result<u64, DbError> {
        self.record_batch(rows)?;
        let mut state = self.state.lock().unwrap();
        for row in rows {
            state.rows.insert(row.sync_key.clone(), (row.clone(), true));
        }
        Ok(rows.len() as u64)
    }

    async fn upsert_rows(&self, rows: &[CatalogRow]) -> Result<(u64, u64), DbError> {
        self.record_batch(rows)?;
        let mut state = self.state.lock().unwrap();
        let (mut inserted, mut updated) = (0, 0);
        for row in rows {
            if state.rows.contains_key(&row.sync_key) {
                updated += 1;
            } else {
                inserted += 1;
            }
            state.rows.insert(row.sync_key.clone(), (row.clone(), true));
        }
        Ok((inserted, updated))
    }

    async fn delete_all_rows(&self) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let count = state.rows.len() as u64;
        state.rows.clear();
        Ok(count)
    }

    async fn deactivate_missing(&self, seen_keys: &[String]) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for (key, (_, active)) in &mut state.rows {
            if *active && !seen_keys.contains(key) {
                *active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}
