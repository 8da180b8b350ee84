use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{AllocationStore, LeaveRequestStore, LeaveStore, LeaveTransaction};
use crate::error::StoreError;
use crate::model::allocation::{Allocation, AllocationKey, AllocationPolicy};
use crate::model::leave_request::{
    LeavePage, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

fn lock_slots<K>(slots: &Mutex<HashMap<K, Arc<AsyncMutex<()>>>>) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One async mutex per key, kept only while someone holds or awaits it.
struct KeyedLocks<K> {
    slots: Slots<K>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn lock(&self, key: &K) -> KeyGuard<K> {
        let slot = lock_slots(&self.slots).entry(key.clone()).or_default().clone();
        let guard = slot.lock_owned().await;
        KeyGuard {
            slots: Arc::clone(&self.slots),
            key: key.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

/// Held lock on one key; the last holder removes the key's slot on release.
struct KeyGuard<K: Eq + Hash> {
    slots: Slots<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones of a slot are only taken under this mutex, so a count of one
        // means nobody holds or waits on it.
        let mut slots = lock_slots(&self.slots);
        if slots.get(&self.key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&self.key);
        }
    }
}

#[derive(Default)]
struct Committed {
    allocations: HashMap<AllocationKey, Allocation>,
    requests: BTreeMap<u64, LeaveRequest>,
    next_id: u64,
}

struct Shared {
    policy: AllocationPolicy,
    committed: Mutex<Committed>,
    allocation_locks: KeyedLocks<AllocationKey>,
    request_locks: KeyedLocks<u64>,
}

impl Shared {
    fn committed(&self) -> MutexGuard<'_, Committed> {
        // Committed state is only replaced wholesale per entry, so a panic
        // elsewhere cannot leave it half-written.
        self.committed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-local leave store.
///
/// Units of work lock allocation keys and request ids individually and stage
/// their writes; commit publishes them in one short critical section.
#[derive(Clone)]
pub struct InMemoryLeaveStore {
    shared: Arc<Shared>,
}

impl InMemoryLeaveStore {
    pub fn new(policy: AllocationPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                policy,
                committed: Mutex::new(Committed::default()),
                allocation_locks: KeyedLocks::new(),
                request_locks: KeyedLocks::new(),
            }),
        }
    }

    /// Committed allocation for `key`, if one was ever created.
    pub fn allocation(&self, key: &AllocationKey) -> Option<Allocation> {
        self.shared.committed().allocations.get(key).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.shared.committed().requests.len()
    }
}

impl Default for InMemoryLeaveStore {
    fn default() -> Self {
        Self::new(AllocationPolicy::default())
    }
}

pub struct InMemoryTransaction {
    shared: Arc<Shared>,
    allocation_guards: Vec<KeyGuard<AllocationKey>>,
    request_guards: Vec<KeyGuard<u64>>,
    allocations: HashMap<AllocationKey, Allocation>,
    requests: HashMap<u64, LeaveRequest>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            Err(StoreError::Finished)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AllocationStore for InMemoryTransaction {
    async fn get_or_create(&mut self, key: &AllocationKey) -> Result<Allocation, StoreError> {
        self.ensure_open()?;
        if let Some(staged) = self.allocations.get(key) {
            return Ok(staged.clone());
        }

        let guard = self.shared.allocation_locks.lock(key).await;
        self.allocation_guards.push(guard);

        let allocation = self
            .shared
            .committed()
            .allocations
            .get(key)
            .cloned()
            .unwrap_or_else(|| {
                Allocation::fresh(key.clone(), self.shared.policy.default_for(&key.leave_type))
            });

        self.allocations.insert(key.clone(), allocation.clone());
        Ok(allocation)
    }

    async fn write_used(&mut self, key: &AllocationKey, used: u32) -> Result<(), StoreError> {
        self.ensure_open()?;
        let staged = self.allocations.get_mut(key).ok_or_else(|| {
            StoreError::Corrupt(format!("allocation {key:?} written before it was loaded"))
        })?;
        staged.used = used;
        Ok(())
    }
}

#[async_trait]
impl LeaveRequestStore for InMemoryTransaction {
    async fn insert_request(&mut self, new: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        self.ensure_open()?;
        let id = {
            let mut committed = self.shared.committed();
            committed.next_id += 1;
            committed.next_id
        };

        // Nobody else can see the id yet; the lock only keeps the ordering uniform.
        let guard = self.shared.request_locks.lock(&id).await;
        self.request_guards.push(guard);

        let request = new.into_request(id, Utc::now());
        self.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        self.ensure_open()?;
        if let Some(staged) = self.requests.get(&id) {
            return Ok(Some(staged.clone()));
        }

        let guard = self.shared.request_locks.lock(&id).await;
        let found = self.shared.committed().requests.get(&id).cloned();
        match found {
            Some(request) => {
                self.request_guards.push(guard);
                self.requests.insert(id, request.clone());
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    async fn write_status(
        &mut self,
        id: u64,
        status: LeaveStatus,
        approved_by: Option<u64>,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let staged = self.requests.get_mut(&id).ok_or(StoreError::NotLocked(id))?;
        staged.status = status;
        staged.approved_by = approved_by;
        Ok(())
    }
}

#[async_trait]
impl LeaveTransaction for InMemoryTransaction {
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let mut committed = self.shared.committed();
            for (key, allocation) in self.allocations.drain() {
                committed.allocations.insert(key, allocation);
            }
            for (id, request) in self.requests.drain() {
                committed.requests.insert(id, request);
            }
        }
        self.finished = true;
        self.request_guards.clear();
        self.allocation_guards.clear();
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            allocation_guards: Vec::new(),
            request_guards: Vec::new(),
            allocations: HashMap::new(),
            requests: HashMap::new(),
            finished: false,
        }))
    }

    async fn find_allocations(&self, employee_id: u64, year: i32) -> Result<Vec<Allocation>, StoreError> {
        let committed = self.shared.committed();
        Ok(committed
            .allocations
            .values()
            .filter(|a| a.key.employee_id == employee_id && a.key.year == year)
            .cloned()
            .collect())
    }

    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.shared.committed().requests.get(&id).cloned())
    }

    async fn list_requests(&self, query: &LeaveQuery) -> Result<LeavePage, StoreError> {
        let committed = self.shared.committed();
        let mut matching: Vec<&LeaveRequest> = committed
            .requests
            .values()
            .filter(|r| query.matches(r))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(LeavePage {
            data,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }
}
