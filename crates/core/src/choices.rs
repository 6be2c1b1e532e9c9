//! Choice sets of user-selectable fields.
//!
//! A choice set maps each stored key to its display label. When an admin
//! edits a field we compare the old and new sets, and infer which keys were
//! merely renamed by matching their labels.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Choice key to display label, ordered by key.
pub type Choices = BTreeMap<String, String>;

/// Old choice key to new choice key.
pub type RenameMap = BTreeMap<String, String>;

/// Read a choice set from its stored JSON object form.
///
/// Non-string labels are converted to text; anything other than an object
/// yields an empty set.
pub fn choices_from_json(value: &Value) -> Choices {
    let Value::Object(map) = value else {
        return Choices::new();
    };

    map.iter()
        .map(|(key, label)| {
            let label = match label {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), label)
        })
        .collect()
}

/// JSON object form of a choice set.
pub fn choices_to_json(choices: &Choices) -> Value {
    Value::Object(
        choices
            .iter()
            .map(|(key, label)| (key.clone(), Value::String(label.clone())))
            .collect(),
    )
}

/// Trim every label. Keys are already ordered.
pub fn normalize_choices(choices: &Choices) -> Choices {
    choices
        .iter()
        .map(|(key, label)| (key.clone(), label.trim().to_string()))
        .collect()
}

/// Whether `new` differs from `current` once both are normalised.
pub fn choices_changed(current: &Choices, new: &Choices) -> bool {
    normalize_choices(current) != normalize_choices(new)
}

/// Label used for matching: trimmed, inner whitespace collapsed, lowercase.
fn match_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn keys_by_label(choices: &Choices) -> HashMap<String, Vec<&str>> {
    let mut by_label: HashMap<String, Vec<&str>> = HashMap::new();
    for (key, label) in choices {
        by_label.entry(match_label(label)).or_default().push(key);
    }
    by_label
}

/// Infer renamed keys between two choice sets.
///
/// A key counts as renamed when exactly one old key and exactly one new key
/// share a label and the keys differ. Ambiguous labels are ignored.
pub fn build_rename_map(old: &Choices, new: &Choices) -> RenameMap {
    let old_by_label = keys_by_label(old);
    let new_by_label = keys_by_label(new);

    old_by_label
        .iter()
        .filter_map(|(label, old_keys)| {
            let new_keys = new_by_label.get(label)?;
            match (old_keys.as_slice(), new_keys.as_slice()) {
                ([old_key], [new_key]) if old_key != new_key => {
                    Some((old_key.to_string(), new_key.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Rename map equivalent to applying `first` and then `then` to a key.
///
/// Keys that end up mapped to themselves are left out.
pub fn compose_rename_maps(first: &RenameMap, then: &RenameMap) -> RenameMap {
    let through_first = first.iter().map(|(old, mid)| {
        let new = then.get(mid).unwrap_or(mid);
        (old.clone(), new.clone())
    });
    let only_then = then
        .iter()
        .filter(|(old, _)| !first.contains_key(*old))
        .map(|(old, new)| (old.clone(), new.clone()));

    through_first
        .chain(only_then)
        .filter(|(old, new)| old != new)
        .collect()
}
