//! In-memory schedule store using DashMap

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::store::{not_pending, ScheduleStore};
use super::types::{
    NewScheduledNotification, ScheduleError, ScheduleFilter, ScheduleStatus,
    ScheduledNotification,
};
use crate::domain::storage::StoreError;

/// In-memory schedule store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryScheduleStore {
    items: DashMap<Uuid, ScheduledNotification>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully built item as-is
    pub fn insert(&self, item: ScheduledNotification) {
        self.items.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sorted(&self, mut items: Vec<ScheduledNotification>) -> Vec<ScheduledNotification> {
        items.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.created_at.cmp(&b.created_at)));
        items
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn fetch_due(
        &self,
        reference: DateTime<Utc>,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let due = self
            .items
            .iter()
            .filter(|entry| entry.is_due(reference))
            .map(|entry| entry.value().clone())
            .collect();
        Ok(self.sorted(due))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError> {
        let mut item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if item.status != ScheduleStatus::Pending {
            return Err(not_pending(id, item.status));
        }

        item.apply_sent(at);
        Ok(item.clone())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError> {
        let mut item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if item.status != ScheduleStatus::Pending {
            return Err(not_pending(id, item.status));
        }

        item.apply_failure(error, at);
        Ok(item.clone())
    }

    async fn schedule(
        &self,
        item: NewScheduledNotification,
    ) -> Result<ScheduledNotification, StoreError> {
        let item = ScheduledNotification::new(item);
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>, StoreError> {
        Ok(self.items.get(&id).map(|entry| entry.clone()))
    }

    async fn list(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let matching = self
            .items
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        let mut items = self.sorted(matching);
        if let Some(limit) = filter.limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn cancel(&self, id: Uuid) -> Result<ScheduledNotification, ScheduleError> {
        let mut item = self.items.get_mut(&id).ok_or(ScheduleError::NotFound(id))?;
        item.apply_cancel(Utc::now())?;
        Ok(item.clone())
    }

    async fn requeue(
        &self,
        id: Uuid,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledNotification, ScheduleError> {
        let mut item = self.items.get_mut(&id).ok_or(ScheduleError::NotFound(id))?;
        item.apply_requeue(due_at, Utc::now())?;
        Ok(item.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
