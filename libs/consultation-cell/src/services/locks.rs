use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-doctor critical section around the check-then-insert sequence.
///
/// Two concurrent bookings for the same doctor could both pass the
/// availability check before either persists; holding this lock from the
/// conflict scan through the consultation insert closes that window.
/// Bookings for different doctors never contend.
pub struct DoctorSlotLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl DoctorSlotLocks {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide registry. Handlers build services per request, so the
    /// registry itself must outlive them.
    pub fn global() -> &'static DoctorSlotLocks {
        static REGISTRY: OnceLock<DoctorSlotLocks> = OnceLock::new();
        REGISTRY.get_or_init(DoctorSlotLocks::new)
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            Arc::clone(locks.entry(doctor_id).or_default())
        };

        entry.lock_owned().await
    }
}
