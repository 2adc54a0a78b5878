// Advisory payload checks run before create/update requests.
//
// This is a required-keys check against a template, not a schema
// validator: the server remains the authority on payload contents.

use serde_json::Value;

use crate::error::Error;

/// Check `payload` against `template`.
///
/// Every template key must be present and non-null unless `allow_partial`
/// is set. Nested objects are checked with `allow_partial = true`, so maps
/// such as `attributes` may be partial or empty, but they must still be
/// objects when present.
pub fn validate_payload(payload: &Value, template: &Value, allow_partial: bool) -> Result<(), Error> {
    check(payload, template, allow_partial, "")
}

fn check(payload: &Value, template: &Value, allow_partial: bool, prefix: &str) -> Result<(), Error> {
    let Some(template) = template.as_object() else {
        return Ok(());
    };
    let Some(payload) = payload.as_object() else {
        return Err(Error::Validation {
            field: if prefix.is_empty() { "<root>".into() } else { prefix.to_owned() },
            reason: "must be a JSON object".into(),
        });
    };

    for (key, expected) in template {
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match payload.get(key) {
            None if allow_partial => {}
            None => {
                return Err(Error::Validation {
                    field,
                    reason: "is missing".into(),
                });
            }
            Some(Value::Null) if allow_partial || expected.is_null() => {}
            Some(Value::Null) => {
                return Err(Error::Validation {
                    field,
                    reason: "must not be null".into(),
                });
            }
            Some(value) if expected.is_object() => {
                if !value.is_object() {
                    return Err(Error::Validation {
                        field,
                        reason: "must be a JSON object".into(),
                    });
                }
                check(value, expected, true, &field)?;
            }
            Some(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;
    use crate::templates;

    #[test]
    fn missing_top_level_key_is_rejected() {
        let err = validate_payload(&json!({ "attributes": {} }), &templates::user_group(), false)
            .unwrap_err();
        match err {
            Error::Validation { field, reason } => {
                assert_eq!(field, "identifier");
                assert_eq!(reason, "is missing");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn empty_nested_map_is_accepted() {
        let payload = json!({ "identifier": "ops", "attributes": {} });
        assert!(validate_payload(&payload, &templates::user_group(), false).is_ok());
    }

    #[test]
    fn null_required_field_is_rejected() {
        let payload = json!({ "identifier": null, "attributes": {} });
        assert!(matches!(
            validate_payload(&payload, &templates::user_group(), false),
            Err(Error::Validation { reason, .. }) if reason == "must not be null"
        ));
    }

    #[test]
    fn partial_mode_tolerates_missing_keys() {
        let payload = json!({ "name": "only-name" });
        assert!(validate_payload(&payload, &templates::connection(), true).is_ok());
    }

    #[test]
    fn nested_value_must_be_an_object() {
        let payload = json!({ "identifier": "ops", "attributes": "disabled" });
        assert!(matches!(
            validate_payload(&payload, &templates::user_group(), false),
            Err(Error::Validation { field, .. }) if field == "attributes"
        ));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(
            validate_payload(&json!(["x"]), &templates::user(), false),
            Err(Error::Validation { field, .. }) if field == "<root>"
        ));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut payload = templates::rdp_connection();
        payload["name"] = json!("desktop");
        payload["somethingNew"] = json!(true);
        assert!(validate_payload(&payload, &templates::connection(), false).is_ok());
    }
}
