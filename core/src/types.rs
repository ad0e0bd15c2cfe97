//! Domain DTOs for the two Pipefy operations.
//!
//! # Design
//! Responses are handed back as `serde_json::Value` so callers see exactly
//! what Pipefy sent. Only the inputs are typed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Country code prepended to every phone number sent to Pipefy.
pub const PHONE_PREFIX: &str = "+55";

pub const FIELD_NAME: &str = "nome_do_lead";
pub const FIELD_CPF: &str = "cpf";
pub const FIELD_PHONE: &str = "telefone";
pub const FIELD_EMAIL: &str = "e_mail_do_lead";

/// Identifier of a Pipefy card.
///
/// Pipefy ids are numeric, but callers often carry them as strings. A string
/// made only of ASCII digits is treated as numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardId {
    Numeric(u64),
    Text(String),
}

impl CardId {
    /// Render the id as a GraphQL literal: a bare integer, or a quoted and
    /// escaped string.
    pub fn to_literal(&self) -> String {
        match self {
            CardId::Numeric(n) => n.to_string(),
            // JSON string escaping is a subset of GraphQL string escaping.
            CardId::Text(s) => serde_json::Value::String(s.clone()).to_string(),
        }
    }
}

impl From<u64> for CardId {
    fn from(id: u64) -> Self {
        CardId::Numeric(id)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = id.parse() {
                return CardId::Numeric(n);
            }
        }
        CardId::Text(id.to_string())
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        CardId::from(id.as_str())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardId::Numeric(n) => write!(f, "{n}"),
            CardId::Text(s) => f.write_str(s),
        }
    }
}

/// Lead data for a new card. Values are sent as given; only the phone number
/// gets the country prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCard {
    pub pipe_id: String,
    pub phase_id: String,
    pub nome: String,
    pub cpf: String,
    pub telefone: String,
    pub email: String,
}

impl NewCard {
    /// The `createCard` input object, ready to be sent as a GraphQL variable.
    pub fn to_input(&self) -> CreateCardInput {
        CreateCardInput {
            pipe_id: self.pipe_id.clone(),
            phase_id: self.phase_id.clone(),
            fields_attributes: vec![
                FieldAttribute::new(FIELD_NAME, &self.nome),
                FieldAttribute::new(FIELD_CPF, &self.cpf),
                FieldAttribute::new(FIELD_PHONE, format!("{PHONE_PREFIX}{}", self.telefone)),
                FieldAttribute::new(FIELD_EMAIL, &self.email),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateCardInput {
    pub pipe_id: String,
    pub phase_id: String,
    pub fields_attributes: Vec<FieldAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldAttribute {
    pub field_id: String,
    pub field_value: String,
}

impl FieldAttribute {
    fn new(field_id: &str, field_value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.to_string(),
            field_value: field_value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_strings_become_numeric_ids() {
        assert_eq!(CardId::from("123"), CardId::Numeric(123));
        assert_eq!(CardId::from(String::from("42")), CardId::Numeric(42));
        assert_eq!(CardId::from("12a"), CardId::Text("12a".into()));
        assert_eq!(CardId::from(""), CardId::Text(String::new()));
    }

    #[test]
    fn oversized_digit_string_stays_text() {
        let id = CardId::from("99999999999999999999999");
        assert_eq!(id.to_literal(), r#""99999999999999999999999""#);
    }

    #[test]
    fn text_literal_escapes_quotes() {
        let id = CardId::from(r#"1) { id } x: card(id: "2"#);
        assert_eq!(id.to_literal(), r#""1) { id } x: card(id: \"2""#);
    }

    #[test]
    fn phone_gets_country_prefix() {
        let card = NewCard {
            pipe_id: "1".into(),
            phase_id: "2".into(),
            nome: "Ana".into(),
            cpf: "000".into(),
            telefone: "11999999999".into(),
            email: "a@b.com".into(),
        };
        let input = card.to_input();
        assert_eq!(input.pipe_id, "1");
        assert_eq!(input.phase_id, "2");
        let ids: Vec<&str> = input.fields_attributes.iter().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, ["nome_do_lead", "cpf", "telefone", "e_mail_do_lead"]);
        assert_eq!(input.fields_attributes[2].field_value, "+5511999999999");
        assert_eq!(input.fields_attributes[0].field_value, "Ana");
    }
}
