//! Port implementation bound to one open SQLite transaction
//!
//! Every multi-step write (cascading delete, orphan purge, import batch)
//! runs its statements through a single `SqliteSession`, so the enclosing
//! transaction decides whether all of them land or none do.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;

use crate::domain::models::{
    Entry, EntryPatch, EntryType, Meta, MetaPatch, MetaType, NewEntry, NewMeta,
};
use crate::domain::ports::{EntryRepository, MetaRepository};
use crate::domain::rules::{self, normalize_entry_id, ValidEntry};
use crate::error::{ErrorKind, Result, StorageError};

const ENTRY_COLUMNS: &str = "entry_id, entry_type, parent_id, entry_name, note";
const META_COLUMNS: &str = "entry_id, meta_name, meta_type, meta_value";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Column mapping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl ToSql for EntryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: StorageError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for MetaType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MetaType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: StorageError| FromSqlError::Other(Box::new(e)))
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        entry_id: row.get(0)?,
        entry_type: row.get(1)?,
        parent_entry_id: row.get(2)?,
        name: row.get(3)?,
        note: row.get(4)?,
    })
}

fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<Meta> {
    Ok(Meta {
        entry_id: row.get(0)?,
        name: row.get(1)?,
        meta_type: row.get(2)?,
        value: row.get(3)?,
    })
}

/// `%keyword%` with LIKE wildcards in the keyword taken literally
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Entry/Meta DAO over one borrowed connection (normally a transaction)
pub struct SqliteSession<'c> {
    conn: &'c Connection,
}

impl std::fmt::Debug for SqliteSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession").finish_non_exhaustive()
    }
}

impl<'c> SqliteSession<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Lookup by an already canonical ID
    fn fetch_entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        let entry = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM t_entry WHERE entry_id = ?1",
                ENTRY_COLUMNS
            ))?
            .query_row(params![entry_id], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    fn fetch_parent_id(&self, entry_id: &str) -> Result<Option<Option<String>>> {
        let parent = self
            .conn
            .prepare_cached("SELECT parent_id FROM t_entry WHERE entry_id = ?1")?
            .query_row(params![entry_id], |row| row.get::<_, Option<String>>(0))
            .optional()?;
        Ok(parent)
    }

    fn fetch_meta(&self, entry_id: &str, name: &str) -> Result<Option<Meta>> {
        let meta = self
            .conn
            .prepare_cached(&format!(
                "SELECT {} FROM t_metadata WHERE entry_id = ?1 AND meta_name = ?2",
                META_COLUMNS
            ))?
            .query_row(params![entry_id, name], meta_from_row)
            .optional()?;
        Ok(meta)
    }

    /// Parent must exist and accept `valid.entry_type`
    fn check_parent(&self, valid: &ValidEntry) -> Result<()> {
        let Some(parent_id) = valid.parent_entry_id.as_deref() else {
            return Ok(());
        };
        let parent = self.fetch_entry(parent_id)?.ok_or_else(|| {
            StorageError::new(
                ErrorKind::NotFound,
                format!("Parent entry {} does not exist", parent_id),
            )
        })?;
        rules::check_parent_type(valid.entry_type, Some(parent.entry_type))
    }

    /// Reject a parent that sits below `entry_id` in the hierarchy
    fn check_no_cycle(&self, entry_id: &str, parent_id: &str) -> Result<()> {
        let mut visited = HashSet::new();
        let mut cursor = Some(parent_id.to_string());

        while let Some(current) = cursor {
            if current == entry_id {
                return Err(StorageError::constraint(format!(
                    "Entry {} cannot be placed inside its own descendant {}",
                    entry_id, parent_id
                )));
            }
            // A pre-existing loop above us is drift for the reconciler, not our cycle
            if !visited.insert(current.clone()) {
                break;
            }
            cursor = self.fetch_parent_id(&current)?.flatten();
        }
        Ok(())
    }

    /// Changing the type must keep every current child type-compatible
    fn check_children_accept(&self, entry_id: &str, new_type: EntryType) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT entry_type FROM t_entry WHERE parent_id = ?1")?;
        let child_types = stmt
            .query_map(params![entry_id], |row| row.get::<_, EntryType>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for child_type in child_types {
            rules::check_parent_type(child_type, Some(new_type)).map_err(|_| {
                StorageError::constraint(format!(
                    "Cannot change {} to {}: it holds a {}",
                    entry_id, new_type, child_type
                ))
            })?;
        }
        Ok(())
    }

    fn query_ids(&self, sql: &str, keyword: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let ids = stmt
            .query_map(params![like_pattern(keyword)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

impl EntryRepository for SqliteSession<'_> {
    fn exists_by_id(&self, entry_id: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare_cached("SELECT 1 FROM t_entry WHERE entry_id = ?1")?
            .exists(params![normalize_entry_id(entry_id)])?;
        Ok(exists)
    }

    fn get_by_id(&self, entry_id: &str) -> Result<Option<Entry>> {
        self.fetch_entry(&normalize_entry_id(entry_id))
    }

    fn list_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>> {
        let parent_id = parent_id.map(normalize_entry_id);
        self.list_stored_children(parent_id.as_deref())
    }

    fn count_children(&self, parent_id: Option<&str>) -> Result<usize> {
        let count: i64 = match parent_id {
            Some(parent_id) => self.conn.query_row(
                "SELECT COUNT(*) FROM t_entry WHERE parent_id = ?1",
                params![normalize_entry_id(parent_id)],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM t_entry WHERE parent_id IS NULL",
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    fn count_entries(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM t_entry", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn list_entry_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT entry_id FROM t_entry ORDER BY entry_type ASC, entry_id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    fn get_stored_entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        self.fetch_entry(entry_id)
    }

    fn list_stored_children(&self, parent_id: Option<&str>) -> Result<Vec<Entry>> {
        let children = match parent_id {
            Some(parent_id) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {} FROM t_entry WHERE parent_id = ?1 ORDER BY entry_id ASC",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![parent_id], entry_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {} FROM t_entry WHERE parent_id IS NULL ORDER BY entry_id ASC",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], entry_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(children)
    }

    fn insert_entry(&self, entry: NewEntry) -> Result<Entry> {
        let valid = rules::validate_entry(entry)?;
        if self.fetch_entry(&valid.entry_id)?.is_some() {
            return Err(StorageError::duplicate(format!(
                "Entry {} already exists",
                valid.entry_id
            )));
        }
        self.check_parent(&valid)?;

        self.conn.execute(
            "INSERT INTO t_entry (entry_id, entry_type, parent_id, entry_name, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &valid.entry_id,
                valid.entry_type,
                &valid.parent_entry_id,
                &valid.name,
                &valid.note,
            ],
        )?;
        debug!(entry_id = %valid.entry_id, entry_type = %valid.entry_type, "entry inserted");

        Ok(valid.into_entry())
    }

    fn update_entry(&self, entry: NewEntry) -> Result<Entry> {
        let valid = rules::validate_entry(entry)?;
        let stored = self
            .fetch_entry(&valid.entry_id)?
            .ok_or_else(|| StorageError::entry_not_found(&valid.entry_id))?;
        self.check_parent(&valid)?;
        if let Some(parent_id) = valid.parent_entry_id.as_deref() {
            self.check_no_cycle(&valid.entry_id, parent_id)?;
        }
        if valid.entry_type != stored.entry_type {
            self.check_children_accept(&valid.entry_id, valid.entry_type)?;
        }

        self.conn.execute(
            "UPDATE t_entry SET entry_type = ?2, parent_id = ?3, entry_name = ?4, note = ?5
             WHERE entry_id = ?1",
            params![
                &valid.entry_id,
                valid.entry_type,
                &valid.parent_entry_id,
                &valid.name,
                &valid.note,
            ],
        )?;
        debug!(entry_id = %valid.entry_id, "entry updated");

        Ok(valid.into_entry())
    }

    fn update_entry_fields(&self, entry_id: &str, patch: EntryPatch) -> Result<Entry> {
        let entry_id = normalize_entry_id(entry_id);
        let stored = self
            .fetch_entry(&entry_id)?
            .ok_or_else(|| StorageError::entry_not_found(&entry_id))?;
        self.update_entry(patch.apply_to(stored))
    }

    fn delete_entry(&self, entry_id: &str) -> Result<Entry> {
        let entry_id = normalize_entry_id(entry_id);
        let stored = self
            .fetch_entry(&entry_id)?
            .ok_or_else(|| StorageError::entry_not_found(&entry_id))?;

        let metas = self.delete_all_by_entry(&entry_id)?;
        let spliced = self.conn.execute(
            "UPDATE t_entry SET parent_id = ?1 WHERE parent_id = ?2",
            params![&stored.parent_entry_id, &entry_id],
        )?;
        self.conn
            .execute("DELETE FROM t_entry WHERE entry_id = ?1", params![&entry_id])?;

        debug!(
            entry_id = %entry_id,
            metadata_removed = metas,
            children_spliced = spliced,
            "entry deleted"
        );
        Ok(stored)
    }

    fn purge_entries(&self, entry_ids: &[String]) -> Result<usize> {
        let mut removed = 0;
        {
            let mut delete = self
                .conn
                .prepare_cached("DELETE FROM t_entry WHERE entry_id = ?1")?;
            for entry_id in entry_ids {
                removed += delete.execute(params![entry_id])?;
            }
        }
        let mut detach = self
            .conn
            .prepare_cached("UPDATE t_entry SET parent_id = NULL WHERE parent_id = ?1")?;
        let mut detached = 0;
        for entry_id in entry_ids {
            detached += detach.execute(params![entry_id])?;
        }

        debug!(removed, detached, "entries purged");
        Ok(removed)
    }

    fn search_entry_ids(&self, keyword: &str) -> Result<Vec<String>> {
        self.query_ids(
            "SELECT DISTINCT e.entry_id FROM t_entry e
             LEFT JOIN t_metadata m ON m.entry_id = e.entry_id
             WHERE e.entry_id LIKE ?1 ESCAPE '\\'
                OR e.parent_id LIKE ?1 ESCAPE '\\'
                OR e.entry_name LIKE ?1 ESCAPE '\\'
                OR e.note LIKE ?1 ESCAPE '\\'
                OR m.meta_name LIKE ?1 ESCAPE '\\'
                OR m.meta_value LIKE ?1 ESCAPE '\\'
             ORDER BY e.entry_id ASC",
            keyword,
        )
    }

    fn search_tagged_entry_ids(&self, keyword: &str) -> Result<Vec<String>> {
        self.query_ids(
            "SELECT DISTINCT e.entry_id FROM t_entry e
             JOIN t_metadata m ON m.entry_id = e.entry_id
             WHERE m.meta_type = 'TAG' AND m.meta_name LIKE ?1 ESCAPE '\\'
             ORDER BY e.entry_id ASC",
            keyword,
        )
    }
}

impl MetaRepository for SqliteSession<'_> {
    fn meta_exists(&self, entry_id: &str, name: &str) -> Result<bool> {
        let exists = self
            .conn
            .prepare_cached("SELECT 1 FROM t_metadata WHERE entry_id = ?1 AND meta_name = ?2")?
            .exists(params![normalize_entry_id(entry_id), name])?;
        Ok(exists)
    }

    fn get_meta(&self, entry_id: &str, name: &str) -> Result<Option<Meta>> {
        self.fetch_meta(&normalize_entry_id(entry_id), name)
    }

    fn list_by_entry(&self, entry_id: &str) -> Result<Vec<Meta>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM t_metadata WHERE entry_id = ?1 ORDER BY meta_type ASC, meta_name ASC",
            META_COLUMNS
        ))?;
        let metas = stmt
            .query_map(params![normalize_entry_id(entry_id)], meta_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    fn count_metadata(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM t_metadata", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_meta(&self, meta: NewMeta) -> Result<Meta> {
        let valid = rules::validate_meta(meta)?;
        if self.fetch_entry(&valid.entry_id)?.is_none() {
            return Err(StorageError::dangling_owner(&valid.entry_id));
        }
        if self.fetch_meta(&valid.entry_id, &valid.name)?.is_some() {
            return Err(StorageError::duplicate(format!(
                "Entry {} already has metadata named {}",
                valid.entry_id, valid.name
            )));
        }

        self.conn.execute(
            "INSERT INTO t_metadata (entry_id, meta_name, meta_type, meta_value)
             VALUES (?1, ?2, ?3, ?4)",
            params![&valid.entry_id, &valid.name, valid.meta_type, &valid.value],
        )?;
        debug!(entry_id = %valid.entry_id, name = %valid.name, "metadata inserted");

        Ok(Meta {
            entry_id: valid.entry_id,
            name: valid.name,
            meta_type: valid.meta_type,
            value: valid.value,
        })
    }

    fn update_meta(&self, meta: NewMeta) -> Result<Meta> {
        let valid = rules::validate_meta(meta)?;
        if self.fetch_meta(&valid.entry_id, &valid.name)?.is_none() {
            return Err(StorageError::meta_not_found(&valid.entry_id, &valid.name));
        }
        if self.fetch_entry(&valid.entry_id)?.is_none() {
            return Err(StorageError::dangling_owner(&valid.entry_id));
        }

        self.conn.execute(
            "UPDATE t_metadata SET meta_type = ?3, meta_value = ?4
             WHERE entry_id = ?1 AND meta_name = ?2",
            params![&valid.entry_id, &valid.name, valid.meta_type, &valid.value],
        )?;
        debug!(entry_id = %valid.entry_id, name = %valid.name, "metadata updated");

        Ok(Meta {
            entry_id: valid.entry_id,
            name: valid.name,
            meta_type: valid.meta_type,
            value: valid.value,
        })
    }

    fn update_meta_fields(&self, entry_id: &str, name: &str, patch: MetaPatch) -> Result<Meta> {
        let entry_id = normalize_entry_id(entry_id);
        let stored = self
            .fetch_meta(&entry_id, name)?
            .ok_or_else(|| StorageError::meta_not_found(&entry_id, name))?;
        self.update_meta(patch.apply_to(stored))
    }

    fn delete_meta(&self, entry_id: &str, name: &str) -> Result<Meta> {
        let entry_id = normalize_entry_id(entry_id);
        let stored = self
            .fetch_meta(&entry_id, name)?
            .ok_or_else(|| StorageError::meta_not_found(&entry_id, name))?;

        self.conn.execute(
            "DELETE FROM t_metadata WHERE entry_id = ?1 AND meta_name = ?2",
            params![&entry_id, name],
        )?;
        debug!(entry_id = %entry_id, name = %name, "metadata deleted");
        Ok(stored)
    }

    fn delete_all_by_entry(&self, entry_id: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM t_metadata WHERE entry_id = ?1",
            params![normalize_entry_id(entry_id)],
        )?;
        Ok(removed)
    }

    fn delete_all_by_entries(&self, entry_ids: &[String]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM t_metadata WHERE entry_id = ?1")?;
        let mut removed = 0;
        for entry_id in entry_ids {
            removed += stmt.execute(params![entry_id])?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("box"), "%box%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
