//! In-memory implementations of every core port.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pocket_core::{
    ActivityLogRepository, ChangeRequestRepository, CredentialRepository, FailedLoginRepository,
    KeyValueStore, SessionRepository, SupportTicketRepository, SystemConfigRepository,
    VersionedValue,
};
use pocket_domain::{
    ActivityLog, ChangeRequest, CredentialRecord, PocketError, RequestStatus,
    Result as DomainResult, Session, SupportTicket, SystemKeyState,
};
use serde_json::Value;
use uuid::Uuid;

/// Versioned map. `inject_conflicts(n)` makes the next `n`
/// compare-and-set calls fail as if another writer got there first.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, VersionedValue>>,
    pending_conflicts: AtomicU32,
}

impl InMemoryKeyValueStore {
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn raw_put(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock();
        let version = entries.get(key).map_or(1, |v| v.version + 1);
        entries.insert(key.to_string(), VersionedValue { value, version, updated_at: Utc::now() });
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> DomainResult<Option<Value>> {
        Ok(self.entries.lock().get(key).map(|v| v.value.clone()))
    }

    async fn get_versioned(&self, key: &str) -> DomainResult<Option<VersionedValue>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> DomainResult<u64> {
        self.raw_put(key, value);
        Ok(self.entries.lock().get(key).map_or(0, |v| v.version))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Value,
    ) -> DomainResult<u64> {
        let injected = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PocketError::Conflict(format!("injected conflict on {key}")));
        }

        let mut entries = self.entries.lock();
        let current = entries.get(key).map(|v| v.version);
        if current != expected_version {
            return Err(PocketError::Conflict(format!(
                "{key}: expected {expected_version:?}, found {current:?}"
            )));
        }
        let version = current.map_or(1, |v| v + 1);
        entries.insert(key.to_string(), VersionedValue { value, version, updated_at: Utc::now() });
        Ok(version)
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn delete_prefix(&self, prefix: &str) -> DomainResult<u64> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> DomainResult<Vec<String>> {
        Ok(self.entries.lock().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<ActivityLog>>,
}

impl InMemoryActivityLog {
    pub fn all(&self) -> Vec<ActivityLog> {
        self.entries.lock().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.action.to_string()).collect()
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryActivityLog {
    async fn append(&self, entry: ActivityLog) -> DomainResult<()> {
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<ActivityLog>> {
        Ok(self.entries.lock().iter().rev().take(limit).cloned().collect())
    }

    async fn for_user(&self, username: &str, limit: usize) -> DomainResult<Vec<ActivityLog>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .filter(|e| e.target_user.as_deref() == Some(username))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ActivityLog>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp < end)
            .cloned()
            .collect())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemorySystemConfig {
    key: Mutex<Option<SystemKeyState>>,
}

impl InMemorySystemConfig {
    pub fn stored(&self) -> Option<SystemKeyState> {
        self.key.lock().clone()
    }
}

#[async_trait]
impl SystemConfigRepository for InMemorySystemConfig {
    async fn load_system_key(&self) -> DomainResult<Option<SystemKeyState>> {
        Ok(self.key.lock().clone())
    }

    async fn store_system_key(&self, state: &SystemKeyState) -> DomainResult<()> {
        *self.key.lock() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCredentials {
    records: Mutex<BTreeMap<String, CredentialRecord>>,
}

impl InMemoryCredentials {
    pub fn stored(&self, username: &str) -> Option<CredentialRecord> {
        self.records.lock().get(username).cloned()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentials {
    async fn get(&self, username: &str) -> DomainResult<Option<CredentialRecord>> {
        Ok(self.records.lock().get(username).cloned())
    }

    async fn insert(&self, record: &CredentialRecord) -> DomainResult<()> {
        let mut records = self.records.lock();
        if records.contains_key(&record.username) {
            return Err(PocketError::Conflict(format!("username '{}' is taken", record.username)));
        }
        records.insert(record.username.clone(), record.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .records
            .lock()
            .get_mut(username)
            .map(|record| {
                record.password_hash = password_hash.to_string();
                record.password_changed_at = changed_at;
            })
            .is_some())
    }

    async fn delete(&self, username: &str) -> DomainResult<bool> {
        Ok(self.records.lock().remove(username).is_some())
    }

    async fn list_usernames(&self) -> DomainResult<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryFailedLogins {
    counts: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl FailedLoginRepository for InMemoryFailedLogins {
    async fn increment(&self, username: &str) -> DomainResult<u32> {
        let mut counts = self.counts.lock();
        let count = counts.entry(username.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn get(&self, username: &str) -> DomainResult<u32> {
        Ok(self.counts.lock().get(username).copied().unwrap_or(0))
    }

    async fn reset(&self, username: &str) -> DomainResult<()> {
        self.counts.lock().remove(username);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessions {
    session: Mutex<Option<Session>>,
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn load(&self) -> DomainResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn store(&self, session: &Session) -> DomainResult<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> DomainResult<()> {
        *self.session.lock() = None;
        Ok(())
    }
}

/// `reject_before_next_resolve()` makes the next `resolve` find the request
/// already rejected by another admin.
#[derive(Default)]
pub struct InMemoryChangeRequests {
    requests: Mutex<Vec<ChangeRequest>>,
    interleaved_reject: AtomicBool,
}

impl InMemoryChangeRequests {
    pub fn reject_before_next_resolve(&self) {
        self.interleaved_reject.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChangeRequestRepository for InMemoryChangeRequests {
    async fn insert(&self, request: &ChangeRequest) -> DomainResult<()> {
        self.requests.lock().push(request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ChangeRequest>> {
        Ok(self.requests.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, status: Option<RequestStatus>) -> DomainResult<Vec<ChangeRequest>> {
        Ok(self
            .requests
            .lock()
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, username: &str) -> DomainResult<Vec<ChangeRequest>> {
        Ok(self.requests.lock().iter().filter(|r| r.username == username).cloned().collect())
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: &str,
        resolved_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut requests = self.requests.lock();
        if self.interleaved_reject.swap(false, Ordering::SeqCst) {
            if let Some(request) = requests.iter_mut().find(|r| r.id == id) {
                request.status = RequestStatus::Rejected;
                request.resolved_by = Some("other-admin".to_string());
                request.resolved_at = Some(resolved_at);
            }
        }
        match requests.iter_mut().find(|r| r.id == id && r.is_pending()) {
            Some(request) => {
                request.status = status;
                request.resolved_by = Some(resolved_by.to_string());
                request.resolved_at = Some(resolved_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_for_user(&self, username: &str) -> DomainResult<u64> {
        let mut requests = self.requests.lock();
        let before = requests.len();
        requests.retain(|r| r.username != username);
        Ok((before - requests.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemorySupportTickets {
    tickets: Mutex<Vec<SupportTicket>>,
}

#[async_trait]
impl SupportTicketRepository for InMemorySupportTickets {
    async fn insert(&self, ticket: &SupportTicket) -> DomainResult<()> {
        self.tickets.lock().push(ticket.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<SupportTicket>> {
        Ok(self.tickets.lock().iter().find(|t| t.id == id).cloned())
    }

    async fn update(&self, ticket: &SupportTicket) -> DomainResult<()> {
        let mut tickets = self.tickets.lock();
        let existing = tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or_else(|| PocketError::NotFound(format!("ticket {}", ticket.id)))?;
        *existing = ticket.clone();
        Ok(())
    }

    async fn list_for_user(&self, username: &str) -> DomainResult<Vec<SupportTicket>> {
        Ok(self.tickets.lock().iter().rev().filter(|t| t.username == username).cloned().collect())
    }

    async fn list_all(&self) -> DomainResult<Vec<SupportTicket>> {
        Ok(self.tickets.lock().iter().rev().cloned().collect())
    }

    async fn delete_for_user(&self, username: &str) -> DomainResult<u64> {
        let mut tickets = self.tickets.lock();
        let before = tickets.len();
        tickets.retain(|t| t.username != username);
        Ok((before - tickets.len()) as u64)
    }
}
