//! Step input: field descriptors, raw submissions and validated data

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

const REQUIRED: &str = "This field is required.";

/// Kind of value a form field accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "choices")]
pub enum FieldKind {
    Text,
    /// One of a fixed set of values
    Choice(Vec<String>),
    Boolean,
    Integer,
    Decimal,
}

/// Description of one input a step needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default)]
    pub help_text: Option<String>,
    /// Value to prefill when presenting the field
    #[serde(default)]
    pub initial: Option<Value>,
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            help_text: None,
            initial: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn choice<S: Into<String>>(
        name: impl Into<String>,
        label: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Choice(choices.into_iter().map(Into::into).collect()),
        )
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    pub fn integer(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Integer)
    }

    pub fn decimal(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Decimal)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Convert one raw submitted value
    fn clean(&self, raw: Option<&str>) -> Result<Value, String> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());

        let Some(raw) = raw else {
            if self.required {
                return Err(REQUIRED.to_string());
            }
            return Ok(match self.kind {
                FieldKind::Boolean => Value::Bool(false),
                _ => Value::Null,
            });
        };

        match &self.kind {
            FieldKind::Text => Ok(Value::String(raw.to_string())),
            FieldKind::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ))
                }
            }
            FieldKind::Boolean => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| "Enter yes or no.".to_string()),
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| "Enter a whole number.".to_string()),
            FieldKind::Decimal => normalize_decimal(raw)
                .map(Value::String)
                .ok_or_else(|| "Enter a number.".to_string()),
        }
    }
}

/// Canonical text of a decimal number, keeping its scale (`"04.90"` is
/// `"4.90"`). Only plain `[+-]digits[.digits]` input is accepted.
fn normalize_decimal(raw: &str) -> Option<String> {
    let (negative, unsigned) = match raw.as_bytes().first().copied()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(int_part) || !frac_part.map_or(true, is_digits) {
        return None;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return None;
    }
    if frac_part.is_some_and(str::is_empty) {
        return None;
    }

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let mut normalized = int_part.to_string();
    if let Some(frac_part) = frac_part {
        normalized.push('.');
        normalized.push_str(frac_part);
    }

    let is_zero = normalized.bytes().all(|b| b == b'0' || b == b'.');
    if negative && !is_zero {
        normalized.insert(0, '-');
    }
    Some(normalized)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Raw, unvalidated input submitted for a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Input that passed a step's validation, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedData(Map<String, Value>);

impl ValidatedData {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Numeric value of a field; decimal fields are stored as text
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            Value::String(s) => s.parse().ok(),
            other => other.as_f64(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Validate `data` against `fields`, coercing each value to its field kind.
///
/// Every field is checked so the caller gets all errors at once. Submitted
/// keys that match no field are ignored.
pub fn validate_fields(
    fields: &[FormField],
    data: &FormData,
) -> Result<ValidatedData, ValidationError> {
    let mut errors = ValidationError::new();
    let mut values = Map::new();

    for field in fields {
        match field.clean(data.get(&field.name)) {
            Ok(value) => {
                values.insert(field.name.clone(), value);
            }
            Err(message) => errors.add(&field.name, message),
        }
    }

    errors.into_result()?;
    Ok(ValidatedData(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop_fields() -> Vec<FormField> {
        vec![
            FormField::text("name", "Shop name").required(),
            FormField::choice("currency", "Currency", ["USD", "EUR"]).required(),
            FormField::boolean("tax_included", "Prices include tax"),
            FormField::integer("stock", "Initial stock"),
            FormField::decimal("price", "Price"),
        ]
    }

    #[test]
    fn test_validate_coerces_values() {
        let data: FormData = [
            ("name", "  Corner Store "),
            ("currency", "EUR"),
            ("tax_included", "yes"),
            ("stock", "12"),
            ("price", "9.5"),
        ]
        .into_iter()
        .collect();

        let validated = validate_fields(&shop_fields(), &data).unwrap();
        assert_eq!(validated.get_str("name"), Some("Corner Store"));
        assert_eq!(validated.get_str("currency"), Some("EUR"));
        assert_eq!(validated.get_bool("tax_included"), Some(true));
        assert_eq!(validated.get("stock"), Some(&json!(12)));
        assert_eq!(validated.get("price"), Some(&json!("9.5")));
        assert_eq!(validated.get_f64("price"), Some(9.5));
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let fields = vec![FormField::decimal("price", "Price").required()];
        let cases = [
            ("4.90", "4.90"),
            ("0012.50", "12.50"),
            ("+3", "3"),
            (".5", "0.5"),
            ("-1.250", "-1.250"),
            ("-0.00", "0.00"),
        ];
        for (raw, expected) in cases {
            let data: FormData = [("price", raw)].into_iter().collect();
            let validated = validate_fields(&fields, &data).unwrap();
            assert_eq!(validated.get_str("price"), Some(expected), "input {raw}");
        }
    }

    #[test]
    fn test_decimal_rejects_malformed_numbers() {
        let fields = vec![FormField::decimal("price", "Price").required()];
        for raw in ["1e3", "1.", "-", "1.2.3", "inf", "4,90"] {
            let data: FormData = [("price", raw)].into_iter().collect();
            let err = validate_fields(&fields, &data).unwrap_err();
            assert_eq!(err.errors_for("price"), ["Enter a number."], "input {raw}");
        }
    }

    #[test]
    fn test_validate_optional_fields_default() {
        let data: FormData = [("name", "Shop"), ("currency", "USD")].into_iter().collect();

        let validated = validate_fields(&shop_fields(), &data).unwrap();
        assert_eq!(validated.get_bool("tax_included"), Some(false));
        assert_eq!(validated.get("stock"), Some(&Value::Null));
        assert_eq!(validated.get("price"), Some(&Value::Null));
    }

    #[test]
    fn test_validate_reports_every_invalid_field() {
        let data: FormData = [
            ("name", "   "),
            ("currency", "GBP"),
            ("tax_included", "maybe"),
            ("stock", "1.5"),
            ("price", "cheap"),
        ]
        .into_iter()
        .collect();

        let err = validate_fields(&shop_fields(), &data).unwrap_err();
        assert_eq!(err.errors_for("name"), ["This field is required."]);
        assert_eq!(
            err.errors_for("currency"),
            ["Select a valid choice. GBP is not one of the available choices."]
        );
        assert_eq!(err.errors_for("tax_included"), ["Enter yes or no."]);
        assert_eq!(err.errors_for("stock"), ["Enter a whole number."]);
        assert_eq!(err.errors_for("price"), ["Enter a number."]);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let fields = vec![FormField::text("name", "Name")];
        let data: FormData = [("name", "x"), ("csrf", "token")].into_iter().collect();

        let validated = validate_fields(&fields, &data).unwrap();
        assert_eq!(validated.as_map().len(), 1);
    }

    #[test]
    fn test_decimal_rejects_non_finite() {
        let fields = vec![FormField::decimal("rate", "Rate").required()];
        let data: FormData = [("rate", "NaN")].into_iter().collect();
        assert!(validate_fields(&fields, &data).is_err());
    }
}
