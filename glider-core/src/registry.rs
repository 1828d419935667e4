use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use glider_model::{
    BuildId, BuildPhase, BuildRecord, BuildSubmission, SessionEndpoints,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::RegistryError,
    log_channel::LogChannel,
    rendezvous::{BitsPayload, Rendezvous},
};

pub type BitsSlot = Rendezvous<BitsPayload>;

#[derive(Debug)]
struct BuildEntry {
    record: BuildRecord,
    seq: u64,
    log: Arc<LogChannel>,
    bits: Arc<BitsSlot>,
}

/// In-memory map of every build this process has accepted.
///
/// Entries are fully constructed before they are inserted, and are only
/// mutated through the methods below while the write lock is held. Callers
/// get clones of the records.
#[derive(Debug, Default)]
pub struct BuildRegistry {
    builds: RwLock<HashMap<BuildId, BuildEntry>>,
    next_seq: AtomicU64,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        submission: BuildSubmission,
    ) -> Result<BuildRecord, RegistryError> {
        submission.validate()?;

        let record = BuildRecord::new(submission);
        let entry = BuildEntry {
            record: record.clone(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            log: Arc::new(LogChannel::new()),
            bits: Arc::new(Rendezvous::new()),
        };

        self.builds.write().insert(record.guid, entry);
        debug!(
            build_id = %record.guid,
            image = %record.image(),
            "build registered"
        );
        Ok(record)
    }

    pub fn get(&self, id: &BuildId) -> Result<BuildRecord, RegistryError> {
        self.builds
            .read()
            .get(id)
            .map(|entry| entry.record.clone())
            .ok_or(RegistryError::NotFound(*id))
    }

    /// Every record, newest first. Builds created in the same instant keep
    /// their registration order reversed as well.
    pub fn list(&self) -> Vec<BuildRecord> {
        let mut snapshot: Vec<(u64, BuildRecord)> = self
            .builds
            .read()
            .values()
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();

        snapshot.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        snapshot.into_iter().map(|(_, record)| record).collect()
    }

    pub fn set_status(
        &self,
        id: &BuildId,
        status: impl Into<String>,
    ) -> Result<BuildRecord, RegistryError> {
        let status = status.into();
        self.update(id, |record| {
            record.status = Some(status);
            Ok(())
        })
    }

    /// Moves the build to `phase`. A completed build stays completed.
    pub fn set_phase(
        &self,
        id: &BuildId,
        phase: BuildPhase,
    ) -> Result<BuildRecord, RegistryError> {
        self.update(id, |record| {
            if record.phase != BuildPhase::Completed {
                record.phase = phase;
            }
            Ok(())
        })
    }

    /// Claims the build for delegation to the executor. Only a fresh build,
    /// or one the executor turned down, may be claimed; the phase moves to
    /// `BitsPending` in the same write.
    pub fn begin_delegation(
        &self,
        id: &BuildId,
    ) -> Result<BuildRecord, RegistryError> {
        self.update(id, |record| match record.phase {
            BuildPhase::Created | BuildPhase::Rejected => {
                record.phase = BuildPhase::BitsPending;
                Ok(())
            }
            _ => Err(RegistryError::AlreadyDelegated(record.guid)),
        })
    }

    /// Records the executor's session endpoints. Only the first call for a
    /// build is accepted.
    pub fn set_session_endpoints(
        &self,
        id: &BuildId,
        endpoints: SessionEndpoints,
    ) -> Result<BuildRecord, RegistryError> {
        self.update(id, |record| {
            if record.session.is_some() {
                return Err(RegistryError::SessionAlreadySet(record.guid));
            }
            record.session = Some(endpoints);
            Ok(())
        })
    }

    /// Stores the terminal status and closes the build's log in one step.
    /// A second call for the same build fails without touching the record.
    pub fn complete(
        &self,
        id: &BuildId,
        status: impl Into<String>,
    ) -> Result<BuildRecord, RegistryError> {
        let mut builds = self.builds.write();
        let entry = builds.get_mut(id).ok_or(RegistryError::NotFound(*id))?;

        entry
            .log
            .close()
            .map_err(|_| RegistryError::AlreadyCompleted(*id))?;
        entry.record.status = Some(status.into());
        entry.record.phase = BuildPhase::Completed;
        Ok(entry.record.clone())
    }

    pub fn log_channel(
        &self,
        id: &BuildId,
    ) -> Result<Arc<LogChannel>, RegistryError> {
        self.builds
            .read()
            .get(id)
            .map(|entry| Arc::clone(&entry.log))
            .ok_or(RegistryError::NotFound(*id))
    }

    pub fn bits(&self, id: &BuildId) -> Result<Arc<BitsSlot>, RegistryError> {
        self.builds
            .read()
            .get(id)
            .map(|entry| Arc::clone(&entry.bits))
            .ok_or(RegistryError::NotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.builds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.read().is_empty()
    }

    fn update<F>(
        &self,
        id: &BuildId,
        mutate: F,
    ) -> Result<BuildRecord, RegistryError>
    where
        F: FnOnce(&mut BuildRecord) -> Result<(), RegistryError>,
    {
        let mut builds = self.builds.write();
        let entry = builds.get_mut(id).ok_or(RegistryError::NotFound(*id))?;
        mutate(&mut entry.record)?;
        Ok(entry.record.clone())
    }
}
