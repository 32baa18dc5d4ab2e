//! Key normalisation for the declarative model.
//!
//! The configuration processor emits some objects with dashed keys
//! (`min-part-hours`, `swift-zones`) and others with underscored keys. All
//! mapping keys are rewritten to use underscores before typed parsing; values
//! are left untouched.

use serde_yaml::{Mapping, Value};

/// Recursively replace `-` with `_` in every mapping key.
pub fn dash_to_underscore(value: Value) -> Value {
    match value {
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(dash_to_underscore).collect()),
        Value::Mapping(mapping) => {
            let mut out = Mapping::with_capacity(mapping.len());
            for (key, item) in mapping {
                let key = match key {
                    Value::String(s) => Value::String(s.replace('-', "_")),
                    other => other,
                };
                out.insert(key, dash_to_underscore(item));
            }
            Value::Mapping(out)
        }
        Value::Tagged(tagged) => {
            let tagged = *tagged;
            Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag: tagged.tag,
                value: dash_to_underscore(tagged.value),
            }))
        }
        other => other,
    }
}
