//! Request payload validation.
//!
//! Handlers accept raw JSON objects and run them through a serializer, which
//! reports every problem at once as [`FieldErrors`] (`{"field": ["message"]}`)
//! or yields a validated domain value. Full validation (`POST`, `PUT`)
//! requires every mandatory field; partial validation (`PATCH`) checks only
//! the fields that are present.

pub mod blog;
pub mod catalog;
pub mod user;

pub use user::UserView;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Client-facing validation messages.
pub mod messages {
    pub const REQUIRED: &str = "This field is required.";
    pub const BLANK: &str = "This field may not be blank.";
    pub const NULL: &str = "This field may not be null.";
    pub const NOT_A_STRING: &str = "Not a valid string.";
    pub const INVALID_NUMBER: &str = "A valid number is required.";

    #[must_use]
    pub fn max_length(max: usize) -> String {
        format!("Ensure this field has no more than {max} characters.")
    }

    #[must_use]
    pub fn does_not_exist(pk: i32) -> String {
        format!("Invalid pk \"{pk}\" - object does not exist.")
    }

    #[must_use]
    pub fn incorrect_pk_type(received: &str) -> String {
        format!("Incorrect type. Expected pk value, received {received}.")
    }

    #[must_use]
    pub fn not_a_list(received: &str) -> String {
        format!("Expected a list of items but got type \"{received}\".")
    }

    #[must_use]
    pub fn not_an_object(received: &str) -> String {
        format!("Invalid data. Expected a dictionary, but got {received}.")
    }
}

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation errors keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages reported for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(())` when nothing was reported.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was reported.
    pub fn check(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Whether absent fields are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `POST` and `PUT`: mandatory fields must be present.
    Full,
    /// `PATCH`: only present fields are validated.
    Partial,
}

/// Constraints on a text field.
#[derive(Debug, Clone, Copy)]
pub struct Text {
    pub required: bool,
    pub allow_blank: bool,
    pub max_length: Option<usize>,
    /// Strip leading and trailing whitespace before storing.
    pub trim: bool,
}

impl Text {
    /// A mandatory, non-blank field of at most `max` characters.
    #[must_use]
    pub const fn required(max: Option<usize>) -> Self {
        Self {
            required: true,
            allow_blank: false,
            max_length: max,
            trim: true,
        }
    }

    /// An optional field that may be empty.
    #[must_use]
    pub const fn optional(max: Option<usize>) -> Self {
        Self {
            required: false,
            allow_blank: true,
            max_length: max,
            trim: true,
        }
    }

    /// Keep surrounding whitespace, as for passwords.
    #[must_use]
    pub const fn untrimmed(self) -> Self {
        Self { trim: false, ..self }
    }
}

/// A JSON object under validation.
#[derive(Debug, Clone)]
pub struct Payload {
    fields: Map<String, Value>,
    mode: Mode,
}

impl Payload {
    /// Wrap a request body.
    ///
    /// # Errors
    ///
    /// Returns a `non_field_errors` entry when the body is not a JSON object.
    pub fn new(body: Value, mode: Mode) -> Result<Self, FieldErrors> {
        match body {
            Value::Object(fields) => Ok(Self { fields, mode }),
            other => Err(FieldErrors::single(
                NON_FIELD_ERRORS,
                messages::not_an_object(json_type(&other)),
            )),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The raw value of `name`, reporting a missing mandatory field.
    fn field(&self, errors: &mut FieldErrors, name: &str, required: bool) -> Option<&Value> {
        let value = self.fields.get(name);
        if value.is_none() && required && self.mode == Mode::Full {
            errors.add(name, messages::REQUIRED);
        }
        value
    }

    /// A text field. `None` when absent or invalid.
    pub fn text(&self, errors: &mut FieldErrors, name: &str, rule: Text) -> Option<String> {
        let value = self.field(errors, name, rule.required)?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => {
                errors.add(name, messages::NULL);
                return None;
            }
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                errors.add(name, messages::NOT_A_STRING);
                return None;
            }
        };

        let text = if rule.trim {
            text.trim().to_owned()
        } else {
            text
        };

        if !rule.allow_blank && text.trim().is_empty() {
            errors.add(name, messages::BLANK);
            return None;
        }
        if let Some(max) = rule.max_length
            && text.chars().count() > max
        {
            errors.add(name, messages::max_length(max));
            return None;
        }
        Some(text)
    }

    /// A primary-key reference.
    ///
    /// `Some(None)` is an explicit `null` on a nullable field.
    pub fn pk(
        &self,
        errors: &mut FieldErrors,
        name: &str,
        required: bool,
        nullable: bool,
    ) -> Option<Option<i32>> {
        let value = self.field(errors, name, required)?;
        if value.is_null() {
            if nullable {
                return Some(None);
            }
            errors.add(name, messages::NULL);
            return None;
        }
        match parse_pk(value) {
            Ok(pk) => Some(Some(pk)),
            Err(message) => {
                errors.add(name, message);
                None
            }
        }
    }

    /// A list of primary-key references. Duplicates are dropped and the
    /// result is sorted.
    pub fn pk_list(&self, errors: &mut FieldErrors, name: &str) -> Option<Vec<i32>> {
        let value = self.field(errors, name, false)?;
        let Value::Array(items) = value else {
            errors.add(name, messages::not_a_list(json_type(value)));
            return None;
        };

        let mut pks = Vec::with_capacity(items.len());
        for item in items {
            match parse_pk(item) {
                Ok(pk) => pks.push(pk),
                Err(message) => {
                    errors.add(name, message);
                    return None;
                }
            }
        }
        pks.sort_unstable();
        pks.dedup();
        Some(pks)
    }

    /// The text of a numeric field, given as a JSON number or a string.
    ///
    /// Only the JSON type is checked; the caller parses the text so that
    /// precision limits apply to the digits as written.
    pub fn number(&self, errors: &mut FieldErrors, name: &str, required: bool) -> Option<String> {
        let value = self.field(errors, name, required)?;
        match value {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.trim().to_owned()),
            Value::Null => {
                errors.add(name, messages::NULL);
                None
            }
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                errors.add(name, messages::INVALID_NUMBER);
                None
            }
        }
    }
}

fn parse_pk(value: &Value) -> Result<i32, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| messages::incorrect_pk_type(json_type(value))),
        Value::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| messages::incorrect_pk_type("str")),
        other => Err(messages::incorrect_pk_type(json_type(other))),
    }
}

/// Name of a JSON value's type as shown in messages.
fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full(body: Value) -> Payload {
        Payload::new(body, Mode::Full).unwrap()
    }

    #[test]
    fn test_non_object_body() {
        let errors = Payload::new(json!([1, 2]), Mode::Full).unwrap_err();
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            ["Invalid data. Expected a dictionary, but got list."]
        );
    }

    #[test]
    fn test_text_rules() {
        let payload = full(json!({"blank": "  ", "long": "abcdef", "null": null, "num": 7}));
        let mut errors = FieldErrors::new();

        assert_eq!(payload.text(&mut errors, "blank", Text::required(None)), None);
        assert_eq!(payload.text(&mut errors, "long", Text::required(Some(5))), None);
        assert_eq!(payload.text(&mut errors, "null", Text::required(None)), None);
        assert_eq!(payload.text(&mut errors, "missing", Text::required(None)), None);
        assert_eq!(
            payload.text(&mut errors, "num", Text::required(None)),
            Some("7".to_owned())
        );
        assert_eq!(payload.text(&mut errors, "other", Text::optional(None)), None);

        assert_eq!(errors.get("blank"), [messages::BLANK]);
        assert_eq!(
            errors.get("long"),
            ["Ensure this field has no more than 5 characters."]
        );
        assert_eq!(errors.get("null"), [messages::NULL]);
        assert_eq!(errors.get("missing"), [messages::REQUIRED]);
        assert!(!errors.has("other"));
    }

    #[test]
    fn test_partial_mode_skips_missing_fields() {
        let payload = Payload::new(json!({}), Mode::Partial).unwrap();
        let mut errors = FieldErrors::new();
        assert_eq!(payload.text(&mut errors, "title", Text::required(None)), None);
        assert_eq!(payload.pk(&mut errors, "author", true, false), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_pk_parsing() {
        let payload = full(json!({"a": 3, "b": "4", "c": "four", "d": null, "e": 1.5}));
        let mut errors = FieldErrors::new();

        assert_eq!(payload.pk(&mut errors, "a", true, false), Some(Some(3)));
        assert_eq!(payload.pk(&mut errors, "b", true, false), Some(Some(4)));
        assert_eq!(payload.pk(&mut errors, "c", true, false), None);
        assert_eq!(payload.pk(&mut errors, "d", false, true), Some(None));
        assert_eq!(payload.pk(&mut errors, "e", true, false), None);

        assert_eq!(
            errors.get("c"),
            ["Incorrect type. Expected pk value, received str."]
        );
        assert_eq!(
            errors.get("e"),
            ["Incorrect type. Expected pk value, received float."]
        );
        assert!(!errors.has("d"));
    }

    #[test]
    fn test_pk_list_sorts_and_dedups() {
        let payload = full(json!({"tags": [3, 1, 3], "bad": "1,2"}));
        let mut errors = FieldErrors::new();
        assert_eq!(payload.pk_list(&mut errors, "tags"), Some(vec![1, 3]));
        assert_eq!(payload.pk_list(&mut errors, "bad"), None);
        assert_eq!(
            errors.get("bad"),
            ["Expected a list of items but got type \"str\"."]
        );
    }

    #[test]
    fn test_number_text() {
        let payload = full(json!({"a": 19.99, "b": " 5.50 ", "c": "cheap", "d": true}));
        let mut errors = FieldErrors::new();
        assert_eq!(payload.number(&mut errors, "a", true), Some("19.99".to_owned()));
        assert_eq!(payload.number(&mut errors, "b", true), Some("5.50".to_owned()));
        assert_eq!(payload.number(&mut errors, "c", true), Some("cheap".to_owned()));
        assert_eq!(payload.number(&mut errors, "d", true), None);
        assert_eq!(errors.get("d"), [messages::INVALID_NUMBER]);
        assert!(!errors.has("c"));
    }

    #[test]
    fn test_text_is_trimmed_unless_untrimmed() {
        let payload = full(json!({"title": "  Hello  ", "password": " secret "}));
        let mut errors = FieldErrors::new();
        assert_eq!(
            payload.text(&mut errors, "title", Text::required(None)),
            Some("Hello".to_owned())
        );
        assert_eq!(
            payload.text(&mut errors, "password", Text::required(None).untrimmed()),
            Some(" secret ".to_owned())
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let mut errors = FieldErrors::single("title", messages::REQUIRED);
        errors.add("title", messages::BLANK);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"title": [messages::REQUIRED, messages::BLANK]})
        );
        assert_eq!(
            errors.to_string(),
            "title: This field is required.; title: This field may not be blank."
        );
    }
}
