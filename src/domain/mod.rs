//! Storefront domain: products, orders, carts.
pub mod aggregates;
pub mod events;
pub mod value_objects;

use validator::ValidationErrors;

/// First user-facing message of a failed validation, by field name order.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .into_iter()
        .flat_map(|(field, errs)| errs.iter().map(move |e| (field, e)))
        .map(|(field, e)| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| format!("Champ invalide: {field}")))
        .next()
        .unwrap_or_else(|| "Données invalides".to_string())
}

/// Deserializers for JSON written by older browser builds, where ids, prices
/// and quantities were sometimes numbers and sometimes strings.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(T::from(cell_text(&value)))
    }

    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Some(cell_text(&value)).filter(|s| !s.is_empty()))
    }

    pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| serde::de::Error::custom(format!("invalid quantity {n}"))),
            Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Value::Null => Ok(1),
            other => Err(serde::de::Error::custom(format!("invalid quantity {other}"))),
        }
    }

    /// Render a JSON cell the way a spreadsheet would display it.
    pub fn cell_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }
}
