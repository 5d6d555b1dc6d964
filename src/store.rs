// Storage seam shared by the HTTP handlers and the bot

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::ApiResult, models::UserRecord};

/// Tables the generic reader may select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
        }
    }
}

/// Read and write access to the registered users.
///
/// Readers return `Ok(None)` both when nothing matched and when the storage
/// could not be reached; the two cases differ only in the logs. `Err` is
/// reserved for failures after rows were fetched.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts the record, or replaces the stored data if the id already exists.
    async fn upsert_user(&self, record: &UserRecord) -> ApiResult<()>;

    async fn get_all_rows(&self, table: Table) -> ApiResult<Option<Vec<Value>>>;

    async fn get_user_by_telegram_id(&self, telegram_id: i64) -> ApiResult<Option<Value>>;
}

/// Store handle shared by the router and the bot dispatcher.
pub type SharedStore = Arc<dyn UserStore>;

#[cfg(test)]
pub mod memory {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::ApiError;

    /// In-memory store for handler and bot tests.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<BTreeMap<i64, Value>>,
        writes: AtomicUsize,
        offline: AtomicBool,
        broken: AtomicBool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_rows(records: &[UserRecord]) -> Self {
            let store = Self::new();
            {
                let mut rows = store.rows.lock().unwrap();
                for record in records {
                    rows.insert(record.telegram_id, record.data.clone());
                }
            }
            store
        }

        /// Behave like an unreachable database: writes fail, reads come back empty-handed.
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        /// Make reads fail after fetching, like an undecodable row.
        pub fn set_broken(&self, broken: bool) {
            self.broken.store(broken, Ordering::SeqCst);
        }

        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn data_of(&self, telegram_id: i64) -> Option<Value> {
            self.rows.lock().unwrap().get(&telegram_id).cloned()
        }

        fn check_reads(&self) -> ApiResult<bool> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(ApiError::from(anyhow::anyhow!("unsupported column type")));
            }
            Ok(!self.offline.load(Ordering::SeqCst))
        }
    }

    fn row(telegram_id: i64, data: Value) -> Value {
        UserRecord { telegram_id, data }.to_row()
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn upsert_user(&self, record: &UserRecord) -> ApiResult<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(ApiError::Database("connection refused".to_string()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.rows
                .lock()
                .unwrap()
                .insert(record.telegram_id, record.data.clone());
            Ok(())
        }

        async fn get_all_rows(&self, table: Table) -> ApiResult<Option<Vec<Value>>> {
            assert_eq!(table, Table::Users);
            if !self.check_reads()? {
                return Ok(None);
            }
            let rows = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .map(|(id, data)| row(*id, data.clone()))
                .collect();
            Ok(Some(rows))
        }

        async fn get_user_by_telegram_id(&self, telegram_id: i64) -> ApiResult<Option<Value>> {
            if !self.check_reads()? {
                return Ok(None);
            }
            Ok(self.data_of(telegram_id).map(|data| row(telegram_id, data)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Users.name(), "users");
    }
}
