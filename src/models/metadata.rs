//! Ordered, multi-valued metadata keyed by `schema.element[.qualifier]`.

use crate::errors::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::{fmt, str::FromStr};

/// Three-part metadata field identifier. The qualifier is optional so that
/// unqualified fields such as `dc.title` are representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub schema: String,
    pub element: String,
    pub qualifier: Option<String>,
}

impl FieldId {
    pub fn new(schema: &str, element: &str, qualifier: Option<&str>) -> ModelResult<Self> {
        let rendered = match qualifier {
            Some(q) => format!("{}.{}.{}", schema, element, q),
            None => format!("{}.{}", schema, element),
        };
        rendered.parse()
    }
}

impl FieldId {
    /// `dc.title`, the title field every named object records.
    pub fn dc_title() -> Self {
        Self {
            schema: "dc".into(),
            element: "title".into(),
            qualifier: None,
        }
    }
}

impl FromStr for FieldId {
    type Err = ModelError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = tag.split('.').collect();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(ModelError::InvalidFieldFormat(tag.to_string()));
        }
        Ok(Self {
            schema: parts[0].to_string(),
            element: parts[1].to_string(),
            qualifier: parts.get(2).map(|q| q.to_string()),
        })
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}.{}", self.schema, self.element, q),
            None => write!(f, "{}.{}", self.schema, self.element),
        }
    }
}

/// A single metadata value with an optional language tag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetadataValue {
    pub value: String,
    pub language: Option<String>,
}

impl MetadataValue {
    pub fn new(value: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            value: value.into(),
            language: language.filter(|l| !l.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Clone, Debug)]
struct MetadataField {
    id: FieldId,
    values: Vec<MetadataValue>,
}

/// Field store preserving declaration order of fields and append order
/// within each field. A field only exists while it holds at least one value.
#[derive(Clone, Debug, Default)]
pub struct MetadataStore {
    fields: Vec<MetadataField>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, tag: &str) -> Option<usize> {
        let id: FieldId = tag.parse().ok()?;
        self.fields.iter().position(|f| f.id == id)
    }

    fn field(&self, tag: &str) -> Option<&MetadataField> {
        self.position(tag).map(|idx| &self.fields[idx])
    }

    /// Append a value to `tag`, creating the field when absent.
    pub fn set(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        language: Option<&str>,
    ) -> ModelResult<()> {
        let id: FieldId = tag.parse()?;
        self.push(id, MetadataValue::new(value, language));
        Ok(())
    }

    /// Append a value under an already parsed field id.
    pub fn push(&mut self, id: FieldId, value: MetadataValue) {
        match self.fields.iter_mut().find(|f| f.id == id) {
            Some(field) => field.values.push(value),
            None => self.fields.push(MetadataField {
                id,
                values: vec![value],
            }),
        }
    }

    /// Remove the whole field, or only the entries equal to `value`.
    ///
    /// Returns the number of values removed; removing from an absent field is a no-op.
    pub fn remove(&mut self, tag: &str, value: Option<&str>) -> ModelResult<usize> {
        let id: FieldId = tag.parse()?;
        let Some(idx) = self.fields.iter().position(|f| f.id == id) else {
            return Ok(0);
        };
        let removed = match value {
            None => self.fields.remove(idx).values.len(),
            Some(value) => {
                let field = &mut self.fields[idx];
                let before = field.values.len();
                field.values.retain(|v| v.value != value);
                let removed = before - field.values.len();
                if field.values.is_empty() {
                    self.fields.remove(idx);
                }
                removed
            }
        };
        Ok(removed)
    }

    /// Collapse `tag` to exactly one value.
    pub fn replace(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        language: Option<&str>,
    ) -> ModelResult<()> {
        self.remove(tag, None)?;
        self.set(tag, value, language)
    }

    /// Relocate the value at `from` to `to` within one field.
    ///
    /// A negative `to` counts from the end after removal, so `-1` appends.
    pub fn move_value(&mut self, tag: &str, from: usize, to: isize) -> ModelResult<()> {
        let id: FieldId = tag.parse()?;
        let len = self
            .fields
            .iter()
            .find(|f| f.id == id)
            .map_or(0, |f| f.values.len());
        if len == 0 || from >= len {
            return Err(ModelError::PositionOutOfRange {
                field: tag.to_string(),
                position: from,
                len,
            });
        }
        let signed_len = len as isize;
        if to >= signed_len || to <= -(signed_len + 1) {
            return Err(ModelError::InvalidTargetPosition {
                field: tag.to_string(),
                position: to,
                len,
            });
        }
        let Some(field) = self.fields.iter_mut().find(|f| f.id == id) else {
            return Ok(());
        };
        let value = field.values.remove(from);
        let target = if to < 0 { (signed_len + to) as usize } else { to as usize };
        field.values.insert(target, value);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Vec<MetadataValue> {
        self.field(tag).map(|f| f.values.clone()).unwrap_or_default()
    }

    /// Raw text values, `None` when the field does not exist.
    pub fn values(&self, tag: &str) -> Option<Vec<String>> {
        self.field(tag)
            .map(|f| f.values.iter().map(|v| v.value.clone()).collect())
    }

    pub fn first(&self, tag: &str) -> Option<&MetadataValue> {
        self.field(tag).and_then(|f| f.values.first())
    }

    pub fn first_value(&self, tag: &str) -> Option<&str> {
        self.first(tag).map(|v| v.value.as_str())
    }

    pub fn has(&self, tag: &str) -> bool {
        self.field(tag).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldId, &[MetadataValue])> {
        self.fields.iter().map(|f| (&f.id, f.values.as_slice()))
    }

    /// One `field<TAB>value[<TAB>language]` line per stored value.
    pub fn export_lines(&self) -> Vec<String> {
        self.fields()
            .flat_map(|(id, values)| {
                values.iter().map(move |v| match &v.language {
                    Some(lang) => format!("{}\t{}\t{}", id, v.value, lang),
                    None => format!("{}\t{}", id, v.value),
                })
            })
            .collect()
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.fields()
            .map(|(id, values)| {
                let list = values
                    .iter()
                    .map(|v| json!({ "value": v.value, "language": v.language }))
                    .collect();
                (id.to_string(), Value::Array(list))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(store: &MetadataStore) -> Vec<String> {
        store.values("dc.title").unwrap_or_default()
    }

    fn store_with(values: &[&str]) -> MetadataStore {
        let mut store = MetadataStore::new();
        for v in values {
            store.set("dc.title", *v, None).unwrap();
        }
        store
    }

    #[test]
    fn parses_field_identifiers() {
        let id: FieldId = "dc.identifier.uri".parse().unwrap();
        assert_eq!(id.schema, "dc");
        assert_eq!(id.element, "identifier");
        assert_eq!(id.qualifier.as_deref(), Some("uri"));
        assert_eq!("dc.type".parse::<FieldId>().unwrap().qualifier, None);
        assert_eq!(FieldId::new("dc", "title", None).unwrap().to_string(), "dc.title");

        for bad in ["dc-title", "dc", "dc.identifier.uri.url", "dc..uri", ".title", ""] {
            assert!(
                matches!(bad.parse::<FieldId>(), Err(ModelError::InvalidFieldFormat(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn set_then_get_round_trips_value_and_language() {
        let mut store = MetadataStore::new();
        store.set("dc.title", "Hello", Some("en")).unwrap();
        assert_eq!(store.get("dc.title"), vec![MetadataValue::new("Hello", Some("en"))]);
        assert!(matches!(
            store.set("title", "x", None),
            Err(ModelError::InvalidFieldFormat(_))
        ));
    }

    #[test]
    fn push_shares_the_field_with_parsed_tags() {
        let mut store = store_with(&["First"]);
        store.push(FieldId::dc_title(), MetadataValue::new("Second", None));
        assert_eq!(titles(&store), vec!["First", "Second"]);
        assert_eq!(store.fields().count(), 1);
    }

    #[test]
    fn absent_fields_read_as_empty() {
        let store = MetadataStore::new();
        assert!(store.get("dc.title").is_empty());
        assert_eq!(store.values("dc.title"), None);
        assert_eq!(store.first("dc.title"), None);
        assert!(store.get("not-a-field").is_empty());
    }

    #[test]
    fn remove_whole_field_or_single_value() {
        let mut store = store_with(&["a", "b", "a", "c"]);
        assert_eq!(store.remove("dc.title", Some("a")).unwrap(), 2);
        assert_eq!(titles(&store), vec!["b", "c"]);

        assert_eq!(store.remove("dc.title", None).unwrap(), 2);
        assert!(store.get("dc.title").is_empty());
        assert!(!store.has("dc.title"));
        assert_eq!(store.remove("dc.title", None).unwrap(), 0);
    }

    #[test]
    fn filtered_remove_drops_emptied_field() {
        let mut store = store_with(&["only"]);
        store.remove("dc.title", Some("only")).unwrap();
        assert!(!store.has("dc.title"));
        assert!(store.is_empty());
    }

    #[test]
    fn replace_collapses_to_single_value() {
        let mut store = store_with(&["Paper", "Draft"]);
        store.replace("dc.title", "Revised Paper", None).unwrap();
        assert_eq!(titles(&store), vec!["Revised Paper"]);
    }

    #[test]
    fn move_reorders_without_losing_values() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.move_value("dc.title", 0, 2).unwrap();
        assert_eq!(titles(&store), vec!["b", "c", "a", "d"]);

        store.move_value("dc.title", 3, 0).unwrap();
        assert_eq!(titles(&store), vec!["d", "b", "c", "a"]);

        let mut sorted = titles(&store);
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn move_to_negative_positions_counts_from_end() {
        let mut store = store_with(&["a", "b", "c"]);
        store.move_value("dc.title", 0, -1).unwrap();
        assert_eq!(titles(&store), vec!["b", "c", "a"]);

        store.move_value("dc.title", 2, -3).unwrap();
        assert_eq!(titles(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn move_rejects_bad_positions() {
        let mut store = store_with(&["a", "b", "c"]);
        assert!(matches!(
            store.move_value("dc.title", 3, 0),
            Err(ModelError::PositionOutOfRange { len: 3, .. })
        ));
        assert!(matches!(
            store.move_value("dc.subject", 0, 0),
            Err(ModelError::PositionOutOfRange { len: 0, .. })
        ));
        assert!(matches!(
            store.move_value("dc.title", 0, 3),
            Err(ModelError::InvalidTargetPosition { .. })
        ));
        assert!(matches!(
            store.move_value("dc.title", 0, -4),
            Err(ModelError::InvalidTargetPosition { .. })
        ));
        assert_eq!(titles(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn export_lines_follow_declaration_order() {
        let mut store = MetadataStore::new();
        store.set("dc.title", "Paper", Some("en")).unwrap();
        store.set("dc.contributor.author", "Doe, Jane", None).unwrap();
        store.set("dc.title", "Papier", Some("de")).unwrap();

        assert_eq!(
            store.export_lines(),
            vec![
                "dc.title\tPaper\ten",
                "dc.title\tPapier\tde",
                "dc.contributor.author\tDoe, Jane",
            ]
        );

        let json = store.to_json();
        let keys: Vec<&String> = json.keys().collect();
        assert_eq!(keys, vec!["dc.title", "dc.contributor.author"]);
        assert_eq!(json["dc.title"][1]["language"], "de");
    }
}
