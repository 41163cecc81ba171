//! Orphan detection and repair

use std::collections::HashSet;
use tracing::{error, info, warn};

use super::walker::TreeWalker;
use crate::domain::models::{Entry, ReconcileReport};
use crate::domain::ports::{EntryRepository, MetaRepository};
use crate::error::Result;

/// Removes entries that cannot be reached from any root
///
/// Run it against a repository bound to one write transaction so the scan
/// and the repair are observed together.
pub struct Reconciler<'r, R: ?Sized> {
    repo: &'r R,
}

impl<'r, R> Reconciler<'r, R>
where
    R: EntryRepository + MetaRepository + ?Sized,
{
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// Stored IDs the walker never reaches, ordered by `(type, entry_id)`
    pub fn find_orphans(&self) -> Result<Vec<String>> {
        let reachable = TreeWalker::new(self.repo)
            .map(|entry| entry.map(|e| e.entry_id))
            .collect::<Result<HashSet<_>>>()?;

        let orphans = self
            .repo
            .list_entry_ids()?
            .into_iter()
            .filter(|id| !reachable.contains(id))
            .collect();
        Ok(orphans)
    }

    pub fn run(&self) -> Result<ReconcileReport> {
        let orphans = self.find_orphans()?;
        if orphans.is_empty() {
            info!("no orphan entries found");
            return Ok(ReconcileReport::default());
        }

        let reported = self.report(&orphans);

        // Surviving children are detached, not spliced: an orphan has no
        // trustworthy ancestor to hand them to.
        let removed = self.repo.purge_entries(&orphans)?;
        let metadata_removed = self.repo.delete_all_by_entries(&orphans)?;

        info!(removed, metadata_removed, "orphan entries removed");
        Ok(ReconcileReport { removed, reported })
    }

    fn report(&self, orphans: &[String]) -> Vec<Entry> {
        let mut reported = Vec::with_capacity(orphans.len());
        for entry_id in orphans {
            match self.repo.get_stored_entry(entry_id) {
                Ok(Some(entry)) => {
                    warn!(
                        entry_id = %entry.entry_id,
                        entry_type = %entry.entry_type,
                        parent = entry.parent_entry_id.as_deref().unwrap_or("-"),
                        name = %entry.name,
                        "orphan entry"
                    );
                    reported.push(entry);
                }
                Ok(None) => warn!(entry_id = %entry_id, "orphan entry vanished before report"),
                Err(e) => error!(entry_id = %entry_id, error = %e, "failed to fetch orphan entry"),
            }
        }
        reported
    }
}
