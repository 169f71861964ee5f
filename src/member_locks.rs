use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// One async mutex per member id.
///
/// Update and remove each run a non-atomic local+remote sequence; while one
/// of those sequences is in flight for a member, a second one on the same
/// member must wait for it to finish, or both could read the same stored
/// state and race to persist conflicting local and remote versions.
/// Operations on distinct members never wait on each other.
///
/// All actix workers share the single registry (it is wrapped in `Data` at
/// startup, like the connection pool).
#[derive(Default)]
pub struct MemberLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemberLocks {
    /// Wait until no other operation holds `member_id`. The guard is meant
    /// to be held across the whole local+remote sequence; it releases on
    /// drop.
    pub async fn acquire(
        &self,
        member_id: Uuid,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("member lock registry poisoned");
            // entries nobody holds or awaits (strong count 1: the map's own
            // Arc) are dropped here, keeping the registry bounded by the
            // number of in-flight operations
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(member_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize { self.locks.lock().unwrap().len() }
}
