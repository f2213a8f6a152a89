//! Tri-state patch descriptor for partial updates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One field of a partial-update request.
///
/// Distinguishes a field that was omitted (`Unset`, no change), explicitly
/// null (`Clear`, stored value removed), and set to a new value. On the wire
/// this is the double-option encoding: annotate fields with
/// `#[serde(default, skip_serializing_if = "Patch::is_unset")]` so that a
/// missing key becomes `Unset` and JSON `null` becomes `Clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field not present in the request; leave the stored value alone.
    #[default]
    Unset,
    /// Field explicitly null; remove the stored value.
    Clear,
    /// Field present; replace the stored value.
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// Apply this patch to an optional stored value.
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Unset => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// Apply this patch to a required stored value. `Clear` has no meaning
    /// for a required field and keeps the current value, like `Unset`.
    pub fn resolve_required(self, current: T) -> T {
        match self {
            Patch::Set(value) => value,
            _ => current,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            // Unset fields are expected to be skipped at the struct level.
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Example {
        #[serde(default, skip_serializing_if = "Patch::is_unset")]
        note: Patch<String>,
        #[serde(default, skip_serializing_if = "Patch::is_unset")]
        weight: Patch<i64>,
    }

    #[test]
    fn test_absent_field_is_unset() {
        let example: Example = serde_json::from_str("{}").unwrap();
        assert_eq!(example.note, Patch::Unset);
        assert_eq!(example.weight, Patch::Unset);
    }

    #[test]
    fn test_null_field_is_clear() {
        let example: Example = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(example.note, Patch::Clear);
        assert_eq!(example.weight, Patch::Unset);
    }

    #[test]
    fn test_value_field_is_set() {
        let example: Example = serde_json::from_str(r#"{"note": "hi", "weight": 5}"#).unwrap();
        assert_eq!(example.note, Patch::Set("hi".to_string()));
        assert_eq!(example.weight, Patch::Set(5));
    }

    #[test]
    fn test_serialize_skips_unset_and_writes_null_for_clear() {
        let example = Example {
            note: Patch::Clear,
            weight: Patch::Unset,
        };
        let json = serde_json::to_string(&example).unwrap();
        assert_eq!(json, r#"{"note":null}"#);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Patch::<i64>::Unset.resolve(Some(1)), Some(1));
        assert_eq!(Patch::<i64>::Clear.resolve(Some(1)), None);
        assert_eq!(Patch::Set(2).resolve(Some(1)), Some(2));
        assert_eq!(Patch::Set(2).resolve(None), Some(2));
    }

    #[test]
    fn test_resolve_required() {
        assert_eq!(Patch::<i64>::Unset.resolve_required(1), 1);
        assert_eq!(Patch::<i64>::Clear.resolve_required(1), 1);
        assert_eq!(Patch::Set(2).resolve_required(1), 2);
    }
}
