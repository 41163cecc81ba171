//! Integrity rules shared by every write path
//!
//! Storage has no native constraints for parenting; these functions are the
//! single place the rules live.

use super::models::{Entry, EntryType, NewEntry, NewMeta};
use crate::error::{Result, StorageError};

pub const MAX_ENTRY_ID_LEN: usize = 20;
pub const MAX_NAME_LEN: usize = 2048;
pub const MIN_KEYWORD_LEN: usize = 2;

/// Allowed parent types per child type. A root (no parent) is always allowed.
const PARENT_COMPATIBILITY: [(EntryType, &[EntryType]); 3] = [
    (EntryType::Location, &[EntryType::Location]),
    (EntryType::Box, &[EntryType::Location, EntryType::Box]),
    (EntryType::Item, &[EntryType::Location, EntryType::Box]),
];

/// Canonical form of an entry ID, used for every key that reaches storage
pub fn normalize_entry_id(raw: &str) -> String {
    raw.to_uppercase()
}

/// Normalize and validate an ID that is about to be written
pub fn canonical_entry_id(raw: &str) -> Result<String> {
    let entry_id = normalize_entry_id(raw);
    if entry_id.trim().is_empty() {
        return Err(StorageError::validation("Entry id must not be blank"));
    }
    if entry_id.chars().count() > MAX_ENTRY_ID_LEN {
        return Err(StorageError::validation(format!(
            "Entry id must be no longer than {} chars: {}",
            MAX_ENTRY_ID_LEN, entry_id
        )));
    }
    Ok(entry_id)
}

/// `L…` → LOCATION, `B…` → BOX, `I…` → ITEM
pub fn infer_entry_type(entry_id: &str) -> Result<EntryType> {
    match entry_id.chars().next() {
        Some('L') => Ok(EntryType::Location),
        Some('B') => Ok(EntryType::Box),
        Some('I') => Ok(EntryType::Item),
        _ => Err(StorageError::validation(format!(
            "Cannot infer type from entry id: {}",
            entry_id
        ))),
    }
}

pub fn allowed_parents(child: EntryType) -> &'static [EntryType] {
    PARENT_COMPATIBILITY
        .iter()
        .find(|(t, _)| *t == child)
        .map(|(_, parents)| *parents)
        .unwrap_or(&[])
}

pub fn check_parent_type(child: EntryType, parent: Option<EntryType>) -> Result<()> {
    match parent {
        None => Ok(()),
        Some(p) if allowed_parents(child).contains(&p) => Ok(()),
        Some(p) => Err(StorageError::constraint(format!(
            "{} cannot be placed in {}",
            child, p
        ))),
    }
}

fn check_name(name: &str, what: &str) -> Result<()> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(StorageError::validation(format!(
            "{} must be no longer than {} chars",
            what, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Entry request after boundary normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntry {
    pub entry_id: String,
    pub entry_type: EntryType,
    pub parent_entry_id: Option<String>,
    pub name: String,
    pub note: String,
}

impl ValidEntry {
    /// Whether `stored` already holds exactly these fields
    pub fn matches(&self, stored: &Entry) -> bool {
        self.entry_id == stored.entry_id
            && self.entry_type == stored.entry_type
            && self.parent_entry_id == stored.parent_entry_id
            && self.name == stored.name
            && self.note == stored.note
    }

    pub fn into_entry(self) -> Entry {
        Entry {
            entry_id: self.entry_id,
            entry_type: self.entry_type,
            parent_entry_id: self.parent_entry_id,
            name: self.name,
            note: self.note,
        }
    }
}

impl From<ValidEntry> for NewEntry {
    fn from(valid: ValidEntry) -> Self {
        Self {
            entry_id: valid.entry_id,
            entry_type: Some(valid.entry_type),
            parent_entry_id: valid.parent_entry_id,
            name: valid.name,
            note: valid.note,
        }
    }
}

/// Field-level checks; anything needing storage (parent existence) is left to the caller
pub fn validate_entry(request: NewEntry) -> Result<ValidEntry> {
    let entry_id = canonical_entry_id(&request.entry_id)?;
    let entry_type = match request.entry_type {
        Some(t) => t,
        None => infer_entry_type(&entry_id)?,
    };
    check_name(&request.name, "Name")?;

    let parent_entry_id = request
        .parent_entry_id
        .as_deref()
        .map(canonical_entry_id)
        .transpose()?;
    if parent_entry_id.as_deref() == Some(entry_id.as_str()) {
        return Err(StorageError::constraint(format!(
            "Entry {} cannot be its own parent",
            entry_id
        )));
    }

    Ok(ValidEntry {
        entry_id,
        entry_type,
        parent_entry_id,
        name: request.name,
        note: request.note,
    })
}

/// Normalize owner ID, check name length, clear value for value-less types
pub fn validate_meta(request: NewMeta) -> Result<NewMeta> {
    let entry_id = canonical_entry_id(&request.entry_id)?;
    check_name(&request.name, "Metadata name")?;
    let value = if request.meta_type.needs_value() {
        request.value
    } else {
        String::new()
    };

    Ok(NewMeta {
        entry_id,
        name: request.name,
        meta_type: request.meta_type,
        value,
    })
}

pub fn validate_keyword(keyword: &str) -> Result<()> {
    if keyword.chars().count() < MIN_KEYWORD_LEN {
        return Err(StorageError::validation(format!(
            "Keyword must be at least {} characters: {:?}",
            MIN_KEYWORD_LEN, keyword
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MetaType;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    // ═══════════════════════════════════════════════════════════════════════
    // Entry ID
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_canonical_entry_id_uppercases() {
        assert_eq!(canonical_entry_id("l0001").unwrap(), "L0001");
    }

    #[test]
    fn test_blank_entry_id_rejected() {
        assert_eq!(canonical_entry_id("").unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(
            canonical_entry_id("   ").unwrap_err().kind,
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_long_entry_id_rejected() {
        assert!(canonical_entry_id(&"B".repeat(20)).is_ok());
        let err = canonical_entry_id(&"B".repeat(21)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_infer_entry_type() {
        assert_eq!(infer_entry_type("L1").unwrap(), EntryType::Location);
        assert_eq!(infer_entry_type("B1").unwrap(), EntryType::Box);
        assert_eq!(infer_entry_type("I1").unwrap(), EntryType::Item);
        assert_eq!(
            infer_entry_type("X1").unwrap_err().kind,
            ErrorKind::Validation
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Parent compatibility
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_compatibility_table() {
        use EntryType::*;

        assert!(check_parent_type(Location, Some(Location)).is_ok());
        assert!(check_parent_type(Location, Some(Box)).is_err());
        assert!(check_parent_type(Location, Some(Item)).is_err());
        assert!(check_parent_type(Box, Some(Location)).is_ok());
        assert!(check_parent_type(Box, Some(Box)).is_ok());
        assert!(check_parent_type(Box, Some(Item)).is_err());
        assert!(check_parent_type(Item, Some(Location)).is_ok());
        assert!(check_parent_type(Item, Some(Box)).is_ok());
        assert!(check_parent_type(Item, Some(Item)).is_err());
    }

    #[test]
    fn test_self_parent_rejected() {
        let err = validate_entry(NewEntry::new("b001").parent("B001")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_explicit_type_skips_inference() {
        let valid = validate_entry(NewEntry::new("shelf-1").entry_type(EntryType::Location))
            .unwrap();
        assert_eq!(valid.entry_id, "SHELF-1");
        assert_eq!(valid.entry_type, EntryType::Location);
    }

    #[test]
    fn test_long_name_rejected() {
        let err = validate_entry(NewEntry::new("I1").name("x".repeat(2049))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Meta
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_tag_value_cleared() {
        let mut request = NewMeta::tag("i1", "fragile");
        request.value = "ignored".to_string();

        let valid = validate_meta(request).unwrap();
        assert_eq!(valid.entry_id, "I1");
        assert_eq!(valid.meta_type, MetaType::Tag);
        assert!(valid.value.is_empty());
    }

    #[test]
    fn test_keyword_length() {
        assert!(validate_keyword("bo").is_ok());
        assert_eq!(validate_keyword("b").unwrap_err().kind, ErrorKind::Validation);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Properties
    // ═══════════════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(raw in "[a-zA-Z0-9_-]{1,20}") {
            let once = normalize_entry_id(&raw);
            prop_assert_eq!(normalize_entry_id(&once), once.clone());
            prop_assert_eq!(canonical_entry_id(&raw).unwrap(), once);
        }

        #[test]
        fn prop_root_is_always_compatible(idx in 0usize..3) {
            prop_assert!(check_parent_type(EntryType::ALL[idx], None).is_ok());
        }

        #[test]
        fn prop_item_never_parents(idx in 0usize..3) {
            prop_assert!(check_parent_type(EntryType::ALL[idx], Some(EntryType::Item)).is_err());
        }
    }
}
