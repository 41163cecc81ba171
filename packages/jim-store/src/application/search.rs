//! Keyword search

use std::collections::{HashSet, VecDeque};
use std::iter::FusedIterator;

use crate::domain::models::Entry;
use crate::domain::ports::EntryRepository;
use crate::domain::rules::validate_keyword;
use crate::error::Result;

/// Union of per-keyword matches, deduplicated by entry ID in first-seen order
///
/// Every keyword is validated before any query runs.
pub fn search_entries<'r, R, S>(repo: &'r R, keywords: &[S]) -> Result<SearchResults<'r, R>>
where
    R: EntryRepository + ?Sized,
    S: AsRef<str>,
{
    for keyword in keywords {
        validate_keyword(keyword.as_ref())?;
    }

    let mut seen = HashSet::new();
    let mut ids = VecDeque::new();
    for keyword in keywords {
        for id in repo.search_entry_ids(keyword.as_ref())? {
            if seen.insert(id.clone()) {
                ids.push_back(id);
            }
        }
    }
    Ok(SearchResults::new(repo, ids))
}

/// Entries carrying a TAG whose name contains `keyword`
pub fn search_tagged_entries<'r, R>(repo: &'r R, keyword: &str) -> Result<SearchResults<'r, R>>
where
    R: EntryRepository + ?Sized,
{
    validate_keyword(keyword)?;
    let ids = repo.search_tagged_entry_ids(keyword)?;
    Ok(SearchResults::new(repo, ids.into()))
}

/// Matched entries, each re-read when yielded
///
/// An entry deleted between the match and the read is skipped.
pub struct SearchResults<'r, R: ?Sized> {
    repo: &'r R,
    ids: VecDeque<String>,
}

impl<'r, R> SearchResults<'r, R>
where
    R: EntryRepository + ?Sized,
{
    fn new(repo: &'r R, ids: VecDeque<String>) -> Self {
        Self { repo, ids }
    }

    /// IDs not yet yielded
    pub fn remaining(&self) -> usize {
        self.ids.len()
    }
}

impl<R> Iterator for SearchResults<'_, R>
where
    R: EntryRepository + ?Sized,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.ids.pop_front() {
            match self.repo.get_by_id(&id) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => {
                    self.ids.clear();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<R> FusedIterator for SearchResults<'_, R> where R: EntryRepository + ?Sized {}
