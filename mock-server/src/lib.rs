use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const SESSION_TOKEN_HEADER: &str = "x-aws-parameters-secrets-token";

/// What the mock accepts: the bearer token for `/graphql` and the secret
/// bundles served by `/secretsmanager/get`.
#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    pub token: String,
    pub secrets: HashMap<String, String>,
}

impl MockConfig {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            secrets: HashMap::new(),
        }
    }

    pub fn with_secret(mut self, name: &str, value: &str) -> Self {
        self.secrets.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CardField {
    pub field: FieldRef,
    pub value: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: u64,
    pub title: String,
    pub pipe_id: String,
    pub phase_id: String,
    pub fields: Vec<CardField>,
}

#[derive(Deserialize)]
pub struct GraphQlBody {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Value>,
}

#[derive(Deserialize)]
struct CreateCardInput {
    pipe_id: String,
    #[serde(default)]
    phase_id: Option<String>,
    #[serde(default)]
    fields_attributes: Vec<FieldAttribute>,
}

#[derive(Deserialize)]
struct FieldAttribute {
    field_id: String,
    field_value: Value,
}

#[derive(Default)]
pub struct Cards {
    by_id: HashMap<u64, Card>,
    next_id: u64,
}

impl Cards {
    pub fn get(&self, id: u64) -> Option<&Card> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn insert(&mut self, mut card: Card) -> Card {
        self.next_id += 1;
        card.id = 1000 + self.next_id;
        self.by_id.insert(card.id, card.clone());
        card
    }
}

pub type Db = Arc<RwLock<Cards>>;

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    db: Db,
}

pub fn app(config: MockConfig) -> Router {
    app_with_db(config, Db::default())
}

/// Like [`app`], but shares `db` with the caller so tests can inspect it.
pub fn app_with_db(config: MockConfig, db: Db) -> Router {
    let state = AppState {
        config: Arc::new(config),
        db,
    };
    Router::new()
        .route("/graphql", post(graphql))
        .route("/secretsmanager/get", get(get_secret))
        .with_state(state)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

fn field_label(field_id: &str) -> &'static str {
    match field_id {
        "nome_do_lead" => "Nome do lead",
        "cpf" => "CPF",
        "telefone" => "Telefone",
        "e_mail_do_lead" => "E-mail do lead",
        _ => "Campo",
    }
}

fn graphql_error(message: &str) -> Value {
    json!({ "errors": [{ "message": message }] })
}

async fn graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GraphQlBody>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", state.config.token);
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        tracing::warn!("rejected request with bad bearer token");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" })));
    }

    if is_mutation(&body.query) && body.query.contains("createCard") {
        return create_card(&state.db, body.variables).await;
    }
    if let Some(id) = card_id_literal(&body.query) {
        return read_card(&state.db, &id).await;
    }
    (
        StatusCode::BAD_REQUEST,
        Json(graphql_error("unsupported operation")),
    )
}

async fn create_card(db: &Db, variables: Option<Value>) -> (StatusCode, Json<Value>) {
    let input = variables
        .and_then(|mut vars| vars.get_mut("input").map(Value::take))
        .and_then(|input| serde_json::from_value::<CreateCardInput>(input).ok());
    let Some(input) = input else {
        return (
            StatusCode::OK,
            Json(graphql_error("Variable $input of type CreateCardInput! was not provided.")),
        );
    };

    let fields: Vec<CardField> = input
        .fields_attributes
        .into_iter()
        .map(|attr| CardField {
            field: FieldRef {
                label: field_label(&attr.field_id).to_string(),
                id: attr.field_id,
            },
            value: attr.field_value,
        })
        .collect();
    let title = fields
        .iter()
        .find(|f| f.field.id == "nome_do_lead")
        .and_then(|f| f.value.as_str())
        .unwrap_or("Untitled")
        .to_string();

    let card = db.write().await.insert(Card {
        id: 0,
        title,
        pipe_id: input.pipe_id,
        phase_id: input.phase_id.unwrap_or_default(),
        fields,
    });
    tracing::info!(card_id = card.id, "card created");

    let created = json!({ "card": { "id": card.id.to_string(), "title": card.title } });
    (StatusCode::OK, Json(json!({ "data": { "createCard": created } })))
}

async fn read_card(db: &Db, id: &str) -> (StatusCode, Json<Value>) {
    let cards = db.read().await;
    match id.parse::<u64>().ok().and_then(|n| cards.get(n)) {
        Some(card) => (
            StatusCode::OK,
            Json(json!({ "data": { "card": { "fields": card.fields } } })),
        ),
        None => {
            let mut body = graphql_error("Record not found");
            body["data"] = json!({ "card": null });
            (StatusCode::OK, Json(body))
        }
    }
}

/// A document is a mutation when its first operation keyword says so;
/// anonymous `{ ... }` documents and `query` are reads.
pub fn is_mutation(query: &str) -> bool {
    query.trim_start().starts_with("mutation")
}

/// Extract the argument of `card(id: ...)`: a bare integer or a JSON-style
/// quoted string.
pub fn card_id_literal(query: &str) -> Option<String> {
    let start = query.find("card(id:")? + "card(id:".len();
    let rest = query[start..].trim_start();
    if rest.starts_with('"') {
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<String>();
        return stream.next()?.ok();
    }
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

#[derive(Deserialize)]
struct SecretQuery {
    #[serde(rename = "secretId")]
    secret_id: String,
}

async fn get_secret(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SecretQuery>,
) -> (StatusCode, Json<Value>) {
    if !headers.contains_key(SESSION_TOKEN_HEADER) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing session token" })),
        );
    }
    match state.config.secrets.get(&query.secret_id) {
        Some(secret) => (
            StatusCode::OK,
            Json(json!({ "Name": query.secret_id, "SecretString": secret })),
        ),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("secret {} not found", query.secret_id) })),
        ),
    }
}
