use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

use crate::{
    auth::Principal,
    errors::AppError,
    models::CardStatus,
    responses::{ApiError, ApiResult, AppJson, ErrorMessage},
    state::WebsiteState,
};

use super::services::move_card;

#[derive(OpenApi)]
#[openapi(
    paths(move_card_route),
    components(schemas(MoveCardRequest, MoveCardResponse, ErrorMessage, CardStatus))
)]
pub struct ApiDoc;

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Body of `POST /card/move`. `card_id` may also be sent as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct MoveCardRequest {
    #[schema(example = 42)]
    pub card_id: i64,
    #[schema(example = "wip")]
    pub new_status: String,
}

impl MoveCardRequest {
    /// Reads the request out of a loosely typed body so every malformed
    /// shape gets its own message.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let fields = match body.as_object() {
            Some(fields) if !fields.is_empty() => fields,
            _ => return Err(AppError::validation("No data provided")),
        };

        let card_id = fields.get("card_id").filter(|v| is_present(v));
        let new_status = fields.get("new_status").filter(|v| is_present(v));
        let (Some(card_id), Some(new_status)) = (card_id, new_status) else {
            return Err(AppError::validation(
                "card_id and new_status are required",
            ));
        };

        let card_id = match card_id {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| AppError::validation("Invalid card_id"))?;

        // Anything that is not a string can never name a status and fails
        // later with "Invalid status".
        let new_status = match new_status {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        Ok(Self {
            card_id,
            new_status,
        })
    }
}

/// Nulls, zero, false and empty strings, arrays or objects count as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() != Some(0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoveCardResponse {
    pub ok: bool,
    pub card_id: i64,
    pub new_status: CardStatus,
}

/// Move a card to another column.
#[utoipa::path(
    post,
    path = "/card/move",
    request_body = MoveCardRequest,
    responses(
        (status = 200, description = "Card moved", body = MoveCardResponse),
        (status = 400, description = "Malformed body or unknown status", body = ErrorMessage),
        (status = 403, description = "The board is not visible to the caller", body = ErrorMessage),
        (status = 404, description = "Card or board not found", body = ErrorMessage),
    ),
    tag = "cards"
)]
pub async fn move_card_route(
    State(state): State<WebsiteState>,
    Principal(principal): Principal,
    AppJson(body): AppJson<Value>,
) -> ApiResult<MoveCardResponse> {
    let request = MoveCardRequest::from_json(&body)?;
    let card = move_card(
        state.database(),
        &principal,
        request.card_id,
        &request.new_status,
    )
    .await
    .map_err(ApiError)?;

    Ok(Json(MoveCardResponse {
        ok: true,
        card_id: card.id,
        new_status: card.status,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message(body: Value) -> String {
        match MoveCardRequest::from_json(&body) {
            Err(AppError::Validation(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_request_parsing() {
        assert_eq!(
            MoveCardRequest::from_json(&json!({"card_id": 7, "new_status": "done"})).unwrap(),
            MoveCardRequest {
                card_id: 7,
                new_status: "done".into()
            }
        );
        assert_eq!(
            MoveCardRequest::from_json(&json!({"card_id": " 7 ", "new_status": "wip"}))
                .unwrap()
                .card_id,
            7
        );
    }

    #[test]
    fn test_request_errors() {
        assert_eq!(message(json!({})), "No data provided");
        assert_eq!(message(json!(null)), "No data provided");
        assert_eq!(message(json!([1, 2])), "No data provided");
        assert_eq!(
            message(json!({"card_id": 7})),
            "card_id and new_status are required"
        );
        assert_eq!(
            message(json!({"card_id": 0, "new_status": "done"})),
            "card_id and new_status are required"
        );
        assert_eq!(
            message(json!({"card_id": 7, "new_status": ""})),
            "card_id and new_status are required"
        );
        assert_eq!(
            message(json!({"card_id": "seven", "new_status": "done"})),
            "Invalid card_id"
        );
        assert_eq!(
            message(json!({"card_id": 1.5, "new_status": "done"})),
            "Invalid card_id"
        );
    }

    #[test]
    fn test_non_string_status_is_kept_for_validation() {
        let request = MoveCardRequest::from_json(&json!({"card_id": 3, "new_status": 5})).unwrap();
        assert!(request.new_status.parse::<CardStatus>().is_err());
    }

    #[test]
    fn test_openapi_document_lists_the_move_endpoint() {
        let document = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(document["paths"]["/card/move"]["post"].is_object());
    }
}
