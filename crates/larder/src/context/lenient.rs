//! Field-level lenient deserializers for profile and preferences records.
//!
//! A malformed field degrades to `None` on its own, so it never takes its
//! neighbours down with it. Lists keep every string member they contain:
//! a bare string is read as a one-item list, and non-string members are
//! dropped with a warning. Allergy lists are never emptied by a sibling's
//! bad data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// `Option<Vec<String>>` that salvages whatever strings it can.
pub(crate) fn list<'de, D>(d: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(vec![s]),
        Some(Value::Array(items)) => {
            let total = items.len();
            let kept: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if kept.len() < total {
                warn!(
                    "Dropped {} non-string list member(s), kept {}",
                    total - kept.len(),
                    kept.len()
                );
            }
            Some(kept)
        }
        Some(other) => {
            warn!("Expected a list of strings, got {other}; ignoring field");
            None
        }
    })
}

/// Any `Option<T>` field: a value of the wrong shape becomes `None`.
pub(crate) fn scalar<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let opt: Option<Value> = Option::deserialize(d)?;
    Ok(match opt {
        None | Some(Value::Null) => None,
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Ignoring malformed field value {v}: {e}");
                None
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Record {
        #[serde(deserialize_with = "list")]
        items: Option<Vec<String>>,
        #[serde(deserialize_with = "scalar")]
        minutes: Option<u32>,
    }

    fn parse(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn list_keeps_string_members() {
        let p = parse(json!({"items": ["a", 3, null, "b"]}));
        assert_eq!(p.items, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn bare_string_is_a_single_item() {
        assert_eq!(parse(json!({"items": "thai"})).items, Some(vec!["thai".to_string()]));
    }

    #[test]
    fn wrong_shapes_become_none() {
        let p = parse(json!({"items": {"a": 1}, "minutes": "soon"}));
        assert!(p.items.is_none());
        assert!(p.minutes.is_none());
    }

    #[test]
    fn missing_and_null_are_none() {
        assert!(parse(json!({})).items.is_none());
        let p = parse(json!({"items": null, "minutes": 20}));
        assert!(p.items.is_none());
        assert_eq!(p.minutes, Some(20));
    }
}
