use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::MetaStore;

/// Action name the endpoint dispatcher routes to the toggle handler.
pub const TOGGLE_ACTION: &str = "convert_decorative";

pub const MESSAGE_SUCCESS: &str = "success";
pub const MESSAGE_FAILED: &str = "failed";

/// Wire response of the toggle endpoint. Failure responses carry only the
/// message; absent fields are omitted from the JSON body, not nulled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl ToggleResponse {
    pub fn success(id: &str, updated: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            message: MESSAGE_SUCCESS.to_string(),
            updated: Some(updated.to_string()),
        }
    }

    pub fn failed() -> Self {
        Self {
            id: None,
            message: MESSAGE_FAILED.to_string(),
            updated: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.message == MESSAGE_SUCCESS
    }
}

/// Applies one decorative toggle. `id` must be present and non-empty and
/// `value` must be present, otherwise the request fails with no write.
/// The write is an unconditional upsert; the id is not checked against
/// existing attachments.
pub fn handle_toggle<S: MetaStore + ?Sized>(
    store: &mut S,
    id: Option<&str>,
    value: Option<&str>,
) -> Result<ToggleResponse> {
    let Some(id) = id.filter(|id| !id.is_empty()) else {
        return Ok(ToggleResponse::failed());
    };
    let Some(value) = value else {
        return Ok(ToggleResponse::failed());
    };

    store.write_decorative_flag(id, value)?;

    Ok(ToggleResponse::success(id, value))
}

/// Decodes a url-encoded endpoint body and routes it: only
/// `action=convert_decorative` reaches the handler, anything else fails
/// without touching the store.
pub fn dispatch_form_body<S: MetaStore + ?Sized>(
    store: &mut S,
    body: &str,
) -> Result<ToggleResponse> {
    let fields = parse_form_body(body);

    if form_value(&fields, "action") != Some(TOGGLE_ACTION) {
        return Ok(ToggleResponse::failed());
    }

    handle_toggle(
        store,
        form_value(&fields, "id"),
        form_value(&fields, "value"),
    )
}

/// Splits an `application/x-www-form-urlencoded` body into decoded
/// key/value pairs. A field without `=` decodes to an empty value.
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|field| !field.is_empty())
        .map(|field| {
            let (key, value) = field.split_once('=').unwrap_or((field, ""));
            (percent_decode(key), percent_decode(value))
        })
        .collect()
}

pub fn form_value<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// `+` means space, `%XX` a literal byte. Malformed escapes pass through
/// bytewise instead of failing the whole field.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        decoded.push(high << 4 | low);
                        i += 3;
                    }
                    _ => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttachmentEntry;
    use crate::report::build_report;
    use crate::store::SqliteStore;

    fn seeded_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_attachments(&[
                AttachmentEntry {
                    id: 1,
                    alt_text: "a".to_string(),
                    decorative: None,
                },
                AttachmentEntry {
                    id: 2,
                    alt_text: String::new(),
                    decorative: Some("true".to_string()),
                },
                AttachmentEntry {
                    id: 3,
                    alt_text: String::new(),
                    decorative: Some("false".to_string()),
                },
            ])
            .unwrap();
        store
    }

    #[test]
    fn parse_form_body_splits_and_decodes() {
        let fields = parse_form_body("action=convert_decorative&id=42&value=true");
        assert_eq!(form_value(&fields, "action"), Some("convert_decorative"));
        assert_eq!(form_value(&fields, "id"), Some("42"));
        assert_eq!(form_value(&fields, "value"), Some("true"));
    }

    #[test]
    fn parse_form_body_handles_escapes_and_bare_fields() {
        let fields = parse_form_body("note=a+b%21&flag");
        assert_eq!(form_value(&fields, "note"), Some("a b!"));
        assert_eq!(form_value(&fields, "flag"), Some(""));
        assert_eq!(form_value(&fields, "missing"), None);

        let fields = parse_form_body("k=%zz%4");
        assert_eq!(form_value(&fields, "k"), Some("%zz%4"));
    }

    #[test]
    fn missing_id_fails_without_writing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = handle_toggle(&mut store, None, Some("true")).unwrap();

        assert_eq!(response, ToggleResponse::failed());
        assert_eq!(store.count_decorative_flags().unwrap(), 0);
    }

    #[test]
    fn empty_id_fails_without_writing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = handle_toggle(&mut store, Some(""), Some("true")).unwrap();

        assert_eq!(response, ToggleResponse::failed());
        assert_eq!(store.count_decorative_flags().unwrap(), 0);
    }

    #[test]
    fn missing_value_fails_without_writing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = handle_toggle(&mut store, Some("42"), None).unwrap();

        assert_eq!(response, ToggleResponse::failed());
        assert_eq!(store.count_decorative_flags().unwrap(), 0);
    }

    #[test]
    fn successful_toggle_echoes_and_persists() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = handle_toggle(&mut store, Some("42"), Some("true")).unwrap();

        assert_eq!(response, ToggleResponse::success("42", "true"));
        assert_eq!(
            store.read_decorative_flag("42").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn unknown_action_is_not_dispatched() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = dispatch_form_body(&mut store, "action=delete_all&id=1&value=true").unwrap();

        assert_eq!(response, ToggleResponse::failed());
        assert_eq!(store.count_decorative_flags().unwrap(), 0);
    }

    #[test]
    fn dispatch_applies_a_full_endpoint_body() {
        let mut store = seeded_store();
        let response =
            dispatch_form_body(&mut store, "action=convert_decorative&id=3&value=true").unwrap();

        assert!(response.is_success());
        assert_eq!(
            store.read_decorative_flag("3").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn toggling_a_bad_row_moves_it_to_decorative_on_rebuild() {
        let mut store = seeded_store();

        let before = build_report(store.load_attachments().unwrap());
        assert_eq!(before.classified.bad.len(), 1);
        assert_eq!(before.classified.bad[0].id, 3);
        assert_eq!(before.classified.decorative.len(), 1);

        let response = handle_toggle(&mut store, Some("3"), Some("true")).unwrap();
        assert!(response.is_success());

        let after = build_report(store.load_attachments().unwrap());
        assert!(after.classified.bad.is_empty());
        let decorative_ids: Vec<i64> =
            after.classified.decorative.iter().map(|a| a.id).collect();
        assert_eq!(decorative_ids, vec![2, 3]);
        assert_eq!(after.stats.total, 3);
    }

    #[test]
    fn response_bodies_match_the_wire_contract() {
        let success = serde_json::to_string(&ToggleResponse::success("42", "true")).unwrap();
        assert_eq!(
            success,
            r#"{"id":"42","message":"success","updated":"true"}"#
        );

        let failed = serde_json::to_string(&ToggleResponse::failed()).unwrap();
        assert_eq!(failed, r#"{"message":"failed"}"#);
    }

    #[test]
    fn present_but_empty_value_is_stored_literally() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let response = handle_toggle(&mut store, Some("8"), Some("")).unwrap();

        assert!(response.is_success());
        assert_eq!(store.read_decorative_flag("8").unwrap().as_deref(), Some(""));
    }
}
