use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::error::AdmissionError;
use super::handle::{AdmissionCommand, AdmissionHandle, AdmissionPermit};
use super::types::{AdmissionRoute, AdmissionStatus};
use crate::metrics::{ADMISSIONS_TOTAL, ADMISSION_ACTIVE, ADMISSION_WAIT, ADMISSION_WAITING};

struct Waiter {
    id: Uuid,
    reply: oneshot::Sender<Result<AdmissionPermit, AdmissionError>>,
    since: Instant,
}

/// Background task owning the admission set and the wait list.
///
/// Invariants, upheld between any two commands:
/// - `admitted.len() <= capacity`
/// - the wait list is empty whenever a slot is free
/// - no id is both admitted and waiting
pub struct AdmissionCoordinator {
    rx: mpsc::UnboundedReceiver<AdmissionCommand>,
    // Weak so the coordinator stops once every handle and permit is gone.
    tx: mpsc::WeakUnboundedSender<AdmissionCommand>,
    capacity: usize,
    admitted: HashSet<Uuid>,
    waiting: VecDeque<Waiter>,
}

impl AdmissionCoordinator {
    fn new(
        rx: mpsc::UnboundedReceiver<AdmissionCommand>,
        tx: mpsc::WeakUnboundedSender<AdmissionCommand>,
        capacity: usize,
    ) -> Self {
        Self {
            rx,
            tx,
            capacity,
            admitted: HashSet::with_capacity(capacity),
            waiting: VecDeque::new(),
        }
    }

    /// Run the coordinator until every handle and permit has been dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        tracing::info!("Admission coordinator started (capacity {})", self.capacity);

        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }

        tracing::info!("Admission coordinator shutting down");
    }

    fn handle(&mut self, command: AdmissionCommand) {
        match command {
            AdmissionCommand::Admit { id, reply } => self.on_admit(id, reply),
            AdmissionCommand::Release { id } => {
                if self.admitted.remove(&id) {
                    tracing::debug!("Request {} released its slot", id);
                }
                self.promote();
            }
            AdmissionCommand::Withdraw { id } => {
                let before = self.waiting.len();
                self.waiting.retain(|waiter| waiter.id != id);
                if self.waiting.len() != before {
                    tracing::debug!("Request {} left the wait list", id);
                }
            }
            AdmissionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
        self.update_gauges();
    }

    fn on_admit(
        &mut self,
        id: Uuid,
        reply: oneshot::Sender<Result<AdmissionPermit, AdmissionError>>,
    ) {
        if self.admitted.contains(&id) || self.waiting.iter().any(|w| w.id == id) {
            let _ = reply.send(Err(AdmissionError::Duplicate(id)));
            return;
        }

        if self.admitted.len() < self.capacity {
            self.grant(id, reply, AdmissionRoute::Direct, None);
        } else {
            tracing::debug!(
                "Request {} waiting for a slot ({} ahead)",
                id,
                self.waiting.len()
            );
            self.waiting.push_back(Waiter {
                id,
                reply,
                since: Instant::now(),
            });
        }
    }

    /// Moves waiters into free slots, head first.
    fn promote(&mut self) {
        while self.admitted.len() < self.capacity {
            let Some(waiter) = self.waiting.pop_front() else {
                break;
            };
            self.grant(
                waiter.id,
                waiter.reply,
                AdmissionRoute::Promoted,
                Some(waiter.since),
            );
        }
    }

    /// Hands a permit to the caller. A caller that went away frees the slot again.
    fn grant(
        &mut self,
        id: Uuid,
        reply: oneshot::Sender<Result<AdmissionPermit, AdmissionError>>,
        route: AdmissionRoute,
        waiting_since: Option<Instant>,
    ) {
        let Some(tx) = self.tx.upgrade() else {
            return;
        };

        self.admitted.insert(id);
        match reply.send(Ok(AdmissionPermit::new(id, route, tx))) {
            Ok(()) => {
                ADMISSIONS_TOTAL.with_label_values(&[route.as_str()]).inc();
                if let Some(since) = waiting_since {
                    ADMISSION_WAIT.observe(since.elapsed().as_secs_f64());
                }
                tracing::debug!("Request {} admitted ({})", id, route.as_str());
            }
            Err(returned) => {
                if let Ok(permit) = returned {
                    permit.defuse();
                }
                self.admitted.remove(&id);
            }
        }
    }

    fn status(&self) -> AdmissionStatus {
        let mut admitted: Vec<Uuid> = self.admitted.iter().copied().collect();
        admitted.sort();
        AdmissionStatus {
            capacity: self.capacity,
            admitted,
            waiting: self.waiting.iter().map(|w| w.id).collect(),
        }
    }

    fn update_gauges(&self) {
        ADMISSION_ACTIVE.set(self.admitted.len() as i64);
        ADMISSION_WAITING.set(self.waiting.len() as i64);
    }
}

/// Create a complete admission system
///
/// Returns:
/// - `AdmissionHandle` - for requesting slots (clone this to share across tasks)
/// - `AdmissionCoordinator` - spawn this with `tokio::spawn(coordinator.run())`
///
/// A capacity of zero is raised to one.
pub fn create_admission_system(capacity: usize) -> (AdmissionHandle, AdmissionCoordinator) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::unbounded_channel();
    let coordinator = AdmissionCoordinator::new(rx, tx.downgrade(), capacity);
    let handle = AdmissionHandle::new(tx, capacity);
    (handle, coordinator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawn_system(capacity: usize) -> AdmissionHandle {
        let (handle, coordinator) = create_admission_system(capacity);
        tokio::spawn(coordinator.run());
        handle
    }

    async fn wait_for_waiting(handle: &AdmissionHandle, count: usize) {
        for _ in 0..200 {
            if handle.status().await.unwrap().waiting.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("wait list never reached {count} entries");
    }

    #[tokio::test]
    async fn test_direct_admission_up_to_capacity() {
        let handle = spawn_system(2);
        let a = handle.admit(Uuid::new_v4()).await.unwrap();
        let b = handle.admit(Uuid::new_v4()).await.unwrap();

        assert_eq!(a.route(), AdmissionRoute::Direct);
        assert_eq!(b.route(), AdmissionRoute::Direct);

        let status = handle.status().await.unwrap();
        assert_eq!(status.capacity, 2);
        assert_eq!(status.admitted.len(), 2);
        assert!(status.waiting.is_empty());
    }

    #[tokio::test]
    async fn test_release_promotes_head_of_wait_list() {
        let handle = spawn_system(1);
        let first = handle.admit(Uuid::new_v4()).await.unwrap();

        let waiter_id = Uuid::new_v4();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.admit(waiter_id).await })
        };
        wait_for_waiting(&handle, 1).await;
        assert_eq!(handle.status().await.unwrap().waiting, vec![waiter_id]);

        drop(first);
        let promoted = waiter.await.unwrap().unwrap();

        assert_eq!(promoted.id(), waiter_id);
        assert_eq!(promoted.route(), AdmissionRoute::Promoted);
        assert_eq!(handle.status().await.unwrap().admitted, vec![waiter_id]);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_is_withdrawn() {
        let handle = spawn_system(1);
        let first = handle.admit(Uuid::new_v4()).await.unwrap();

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.admit(Uuid::new_v4()).await })
        };
        wait_for_waiting(&handle, 1).await;

        waiter.abort();
        let _ = waiter.await;
        wait_for_waiting(&handle, 0).await;

        drop(first);
        let status = handle.status().await.unwrap();
        assert!(status.admitted.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let handle = spawn_system(2);
        let id = Uuid::new_v4();
        let _permit = handle.admit(id).await.unwrap();

        assert_eq!(
            handle.admit(id).await.unwrap_err(),
            AdmissionError::Duplicate(id)
        );
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let handle = spawn_system(0);
        assert_eq!(handle.capacity(), 1);
        let _permit = handle.admit(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_coordinator_stops_when_handles_dropped() {
        let (handle, coordinator) = create_admission_system(1);
        let task = tokio::spawn(coordinator.run());
        let permit = handle.admit(Uuid::new_v4()).await.unwrap();

        drop(handle);
        drop(permit);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("coordinator should stop")
            .unwrap();
    }
}
