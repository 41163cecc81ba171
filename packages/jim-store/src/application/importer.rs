//! Forest import

use tracing::{debug, info};

use crate::domain::models::{ForestRecord, ImportStatistics, NewMeta};
use crate::domain::ports::{EntryRepository, MetaRepository};
use crate::domain::rules;
use crate::error::Result;

/// Applies caller-ordered records one by one
///
/// Ordering is trusted: a child that precedes its parent fails on the parent
/// lookup. The first failure aborts the whole call; bind the importer to a
/// write transaction so that abort rolls everything back.
pub struct Importer<'r, R: ?Sized> {
    repo: &'r R,
    overwrite: bool,
    stats: ImportStatistics,
}

impl<'r, R> Importer<'r, R>
where
    R: EntryRepository + MetaRepository + ?Sized,
{
    pub fn new(repo: &'r R, overwrite: bool) -> Self {
        Self {
            repo,
            overwrite,
            stats: ImportStatistics::default(),
        }
    }

    /// Running totals, for callers that drive [`import_record`](Self::import_record) themselves
    pub fn statistics(&self) -> ImportStatistics {
        self.stats
    }

    pub fn import_all<I>(mut self, records: I) -> Result<ImportStatistics>
    where
        I: IntoIterator<Item = ForestRecord>,
    {
        for record in records {
            self.import_record(record)?;
        }

        let s = self.stats;
        info!(
            entries = s.entries_imported,
            entries_overwritten = s.entries_overwritten,
            entries_skipped = s.entries_skipped,
            metadata = s.metadata_imported,
            metadata_overwritten = s.metadata_overwritten,
            metadata_skipped = s.metadata_skipped,
            "import finished"
        );
        Ok(s)
    }

    /// Entry first, then its metadata
    pub fn import_record(&mut self, record: ForestRecord) -> Result<()> {
        let (entry, metas) = record.into_requests();
        let valid = rules::validate_entry(entry)?;

        match self.repo.get_by_id(&valid.entry_id)? {
            None => {
                self.repo.insert_entry(valid.into())?;
            }
            Some(stored) if self.overwrite && !valid.matches(&stored) => {
                debug!(entry_id = %stored.entry_id, "overwriting entry");
                self.repo.update_entry(valid.into())?;
                self.stats.entries_overwritten += 1;
            }
            Some(stored) => {
                debug!(entry_id = %stored.entry_id, "skipping existing entry");
                self.stats.entries_skipped += 1;
            }
        }
        self.stats.entries_imported += 1;

        for meta in metas {
            self.import_meta(meta)?;
        }
        Ok(())
    }

    fn import_meta(&mut self, meta: NewMeta) -> Result<()> {
        let valid = rules::validate_meta(meta)?;

        match self.repo.get_meta(&valid.entry_id, &valid.name)? {
            None => {
                self.repo.insert_meta(valid)?;
            }
            Some(stored)
                if self.overwrite
                    && (stored.meta_type != valid.meta_type || stored.value != valid.value) =>
            {
                debug!(entry_id = %stored.entry_id, name = %stored.name, "overwriting metadata");
                self.repo.update_meta(valid)?;
                self.stats.metadata_overwritten += 1;
            }
            Some(stored) => {
                debug!(entry_id = %stored.entry_id, name = %stored.name, "skipping existing metadata");
                self.stats.metadata_skipped += 1;
            }
        }
        self.stats.metadata_imported += 1;
        Ok(())
    }
}
