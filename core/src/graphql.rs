//! GraphQL documents and the response envelope check.
//!
//! The create mutation takes every caller-supplied string through
//! `variables`. The read query inlines the card id, but only as a literal
//! produced by [`CardId::to_literal`], so a hostile id cannot escape it.

use serde::Serialize;
use serde_json::Value;

use crate::error::{PipefyError, Result};
use crate::types::{CardId, NewCard};

pub const CREATE_CARD_MUTATION: &str = "\
mutation CreateCard($input: CreateCardInput!) {
  createCard(input: $input) {
    card {
      id
      title
    }
  }
}
";

/// Body of every request posted to the GraphQL endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl GraphQlRequest {
    pub fn read_card(card_id: &CardId) -> Self {
        Self {
            query: read_card_query(card_id),
            variables: None,
        }
    }

    pub fn create_card(card: &NewCard) -> Result<Self> {
        let input = serde_json::to_value(card.to_input())
            .map_err(|e| PipefyError::Serialization(e.to_string()))?;
        Ok(Self {
            query: CREATE_CARD_MUTATION.to_string(),
            variables: Some(serde_json::json!({ "input": input })),
        })
    }
}

fn read_card_query(card_id: &CardId) -> String {
    format!(
        "query {{
  card(id: {id}) {{
    fields {{
      field {{
        id
        label
      }}
      value
    }}
  }}
}}
",
        id = card_id.to_literal()
    )
}

/// Fail if the envelope carries a top-level `errors` key, then `error`.
pub fn check_for_errors(response: &Value) -> Result<()> {
    if let Some(errors) = response.get("errors") {
        return Err(PipefyError::GraphQl(errors.clone()));
    }
    if let Some(error) = response.get("error") {
        return Err(PipefyError::Api(error.clone()));
    }
    Ok(())
}
