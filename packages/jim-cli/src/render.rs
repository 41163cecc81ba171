//! Plain-text rendering of entries and metadata

use std::fmt::Write;

use jim_store::{Entry, Meta, MetaType};

/// Multi-line text: first line after `label`, the rest continued with `| `
fn push_multiline(out: &mut String, indent: &str, label: &str, continuation: &str, text: &str) {
    out.push_str(indent);
    out.push_str(label);
    let mut lines = text.lines();
    out.push_str(lines.next().unwrap_or(""));
    out.push('\n');
    for line in lines {
        let _ = writeln!(out, "{}{}{}", indent, continuation, line);
    }
}

pub fn meta(meta: &Meta, indent: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}{}: {}", indent, meta.meta_type, meta.name);
    if meta.meta_type.needs_value() {
        push_multiline(&mut out, indent, "\tValue: ", "\t     | ", &meta.value);
    }
    out
}

pub fn entry(entry: &Entry, metadata: &[Meta], indent: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}{}: {}", indent, entry.entry_type, entry.entry_id);
    if let Some(parent) = &entry.parent_entry_id {
        let _ = writeln!(out, "{}\tIN: {}", indent, parent);
    }
    let _ = writeln!(out, "{}\tName: {}", indent, entry.name);
    push_multiline(&mut out, indent, "\tNote: ", "\t    | ", &entry.note);

    if !metadata.is_empty() {
        let _ = writeln!(out, "{}\tMetadata:", indent);
        let nested = format!("{}\t\t", indent);
        for m in metadata {
            out.push_str(&meta(m, &nested));
        }
    }
    out
}

/// One browse row: children count, first note line, tag names
pub fn summary(entry: &Entry, children: usize, metadata: &[Meta]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", entry.entry_type, entry.entry_id);
    if children > 0 {
        let _ = writeln!(out, "\tChildren count: {}", children);
    }
    let _ = writeln!(out, "\tName: {}", entry.name);

    let mut note = entry.note.lines();
    let _ = write!(out, "\tNote: {}", note.next().unwrap_or(""));
    if note.next().is_some() {
        out.push_str("...");
    }
    out.push('\n');

    if !metadata.is_empty() {
        let _ = writeln!(out, "\tMetadata count: {}", metadata.len());
        let tags: Vec<&str> = metadata
            .iter()
            .filter(|m| m.meta_type == MetaType::Tag)
            .map(|m| m.name.as_str())
            .collect();
        if !tags.is_empty() {
            let _ = writeln!(out, "\tTags: {}", tags.join(", "));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jim_store::EntryType;

    fn sample() -> Entry {
        Entry {
            entry_id: "B001".to_string(),
            entry_type: EntryType::Box,
            parent_entry_id: Some("L0001".to_string()),
            name: "test box".to_string(),
            note: "first\r\nsecond".to_string(),
        }
    }

    #[test]
    fn test_entry_details() {
        let metadata = vec![Meta {
            entry_id: "B001".to_string(),
            name: "colour".to_string(),
            meta_type: MetaType::Text,
            value: "red".to_string(),
        }];

        let text = entry(&sample(), &metadata, "");
        assert_eq!(
            text,
            "BOX: B001\n\tIN: L0001\n\tName: test box\n\tNote: first\n\t    | second\n\
             \tMetadata:\n\t\tTEXT: colour\n\t\t\tValue: red\n"
        );
    }

    #[test]
    fn test_summary_truncates_note() {
        let metadata = vec![Meta {
            entry_id: "B001".to_string(),
            name: "fragile".to_string(),
            meta_type: MetaType::Tag,
            value: String::new(),
        }];

        let text = summary(&sample(), 2, &metadata);
        assert_eq!(
            text,
            "BOX: B001\n\tChildren count: 2\n\tName: test box\n\tNote: first...\n\
             \tMetadata count: 1\n\tTags: fragile\n"
        );
    }
}
