//! Breadth-first forest traversal

use std::collections::VecDeque;
use std::iter::FusedIterator;

use crate::domain::models::Entry;
use crate::domain::ports::EntryRepository;
use crate::error::Result;

/// Lazy BFS over the forest rooted at `parent = null`
///
/// A parent is always yielded before any of its descendants. Each expansion
/// issues one `list_stored_children` query; memory is bounded by the queue width.
/// Entries unreachable from a root (dangling parent, cycle) are never visited.
///
/// The walk is not restartable. After the first error it yields that error
/// once and then ends.
pub struct TreeWalker<'r, R: ?Sized> {
    repo: &'r R,
    queue: VecDeque<Option<String>>,
    pending: VecDeque<Entry>,
    failed: bool,
}

impl<'r, R> TreeWalker<'r, R>
where
    R: EntryRepository + ?Sized,
{
    pub fn new(repo: &'r R) -> Self {
        Self {
            repo,
            queue: VecDeque::from([None]),
            pending: VecDeque::new(),
            failed: false,
        }
    }
}

impl<R> Iterator for TreeWalker<'_, R>
where
    R: EntryRepository + ?Sized,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(entry) = self.pending.pop_front() {
                self.queue.push_back(Some(entry.entry_id.clone()));
                return Some(Ok(entry));
            }

            let parent = self.queue.pop_front()?;
            match self.repo.list_stored_children(parent.as_deref()) {
                Ok(children) => self.pending.extend(children),
                Err(e) => {
                    self.failed = true;
                    self.queue.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R> FusedIterator for TreeWalker<'_, R> where R: EntryRepository + ?Sized {}

impl<R: ?Sized> std::fmt::Debug for TreeWalker<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("queued", &self.queue.len())
            .field("pending", &self.pending.len())
            .field("failed", &self.failed)
            .finish()
    }
}
