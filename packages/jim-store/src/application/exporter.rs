//! Forest export

use std::iter::FusedIterator;

use super::walker::TreeWalker;
use crate::domain::models::{ExportStatistics, ForestRecord};
use crate::domain::ports::{EntryRepository, MetaRepository};
use crate::error::Result;

/// Walker-ordered `(Entry, [Meta])` records
///
/// Orphans are excluded by construction, so re-importing the output in order
/// never references a parent that has not been written yet.
pub struct Exporter<'r, R: ?Sized> {
    repo: &'r R,
    walker: TreeWalker<'r, R>,
    stats: ExportStatistics,
    failed: bool,
}

impl<'r, R> Exporter<'r, R>
where
    R: EntryRepository + MetaRepository + ?Sized,
{
    pub fn new(repo: &'r R) -> Self {
        Self {
            repo,
            walker: TreeWalker::new(repo),
            stats: ExportStatistics::default(),
            failed: false,
        }
    }

    /// Counts of records yielded so far
    pub fn statistics(&self) -> ExportStatistics {
        self.stats
    }
}

impl<R> Iterator for Exporter<'_, R>
where
    R: EntryRepository + MetaRepository + ?Sized,
{
    type Item = Result<ForestRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let record = self.walker.next()?.and_then(|entry| {
            let metadata = self.repo.list_by_entry(&entry.entry_id)?;
            Ok(ForestRecord::from_parts(entry, metadata))
        });

        match &record {
            Ok(r) => {
                self.stats.entries += 1;
                self.stats.metadata += r.metadata.len() as u64;
            }
            Err(_) => self.failed = true,
        }
        Some(record)
    }
}

impl<R> FusedIterator for Exporter<'_, R> where R: EntryRepository + MetaRepository + ?Sized {}
