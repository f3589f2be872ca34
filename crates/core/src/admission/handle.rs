use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::error::AdmissionError;
use super::types::{AdmissionRoute, AdmissionStatus};

/// Messages processed by the `AdmissionCoordinator`.
#[derive(Debug)]
pub(crate) enum AdmissionCommand {
    Admit {
        id: Uuid,
        reply: oneshot::Sender<Result<AdmissionPermit, AdmissionError>>,
    },
    Release {
        id: Uuid,
    },
    Withdraw {
        id: Uuid,
    },
    Status {
        reply: oneshot::Sender<AdmissionStatus>,
    },
}

/// Proof that a request occupies one admission slot.
///
/// Dropping the permit releases the slot, whatever the outcome of the work
/// it guarded.
#[derive(Debug)]
pub struct AdmissionPermit {
    id: Uuid,
    route: AdmissionRoute,
    tx: Option<mpsc::UnboundedSender<AdmissionCommand>>,
}

impl AdmissionPermit {
    pub(crate) fn new(
        id: Uuid,
        route: AdmissionRoute,
        tx: mpsc::UnboundedSender<AdmissionCommand>,
    ) -> Self {
        Self {
            id,
            route,
            tx: Some(tx),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn route(&self) -> AdmissionRoute {
        self.route
    }

    /// Drops the permit without notifying the coordinator.
    pub(crate) fn defuse(mut self) {
        self.tx = None;
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            // A stopped coordinator has nothing left to release.
            let _ = tx.send(AdmissionCommand::Release { id: self.id });
        }
    }
}

/// Withdraws a waiting request if its `admit` future is dropped.
struct PendingAdmission {
    id: Uuid,
    tx: Option<mpsc::UnboundedSender<AdmissionCommand>>,
}

impl PendingAdmission {
    fn disarm(&mut self) {
        self.tx = None;
    }
}

impl Drop for PendingAdmission {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(AdmissionCommand::Withdraw { id: self.id });
        }
    }
}

/// Handle for requesting admission slots.
///
/// This is cheaply cloneable and can be shared across tasks. All decisions
/// are taken by the single `AdmissionCoordinator` task, so capacity checks
/// and slot grants are one atomic step.
#[derive(Clone)]
pub struct AdmissionHandle {
    tx: mpsc::UnboundedSender<AdmissionCommand>,
    capacity: usize,
}

impl AdmissionHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<AdmissionCommand>, capacity: usize) -> Self {
        Self { tx, capacity }
    }

    /// Configured number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits for a slot for `id`.
    ///
    /// Returns at once when a slot is free, otherwise joins the tail of the
    /// wait list and returns when promoted. Dropping the returned future while
    /// waiting removes `id` from the wait list.
    pub async fn admit(&self, id: Uuid) -> Result<AdmissionPermit, AdmissionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdmissionCommand::Admit { id, reply })
            .map_err(|_| AdmissionError::Closed)?;

        let mut pending = PendingAdmission {
            id,
            tx: Some(self.tx.clone()),
        };
        let outcome = rx.await;
        pending.disarm();

        outcome.map_err(|_| AdmissionError::Closed)?
    }

    /// Runs `work` once `id` holds a slot and releases the slot afterwards.
    pub async fn submit<F, T>(&self, id: Uuid, work: F) -> Result<T, AdmissionError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.admit(id).await?;
        Ok(work.await)
    }

    /// Current admitted and waiting requests.
    pub async fn status(&self) -> Result<AdmissionStatus, AdmissionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdmissionCommand::Status { reply })
            .map_err(|_| AdmissionError::Closed)?;
        rx.await.map_err(|_| AdmissionError::Closed)
    }
}
