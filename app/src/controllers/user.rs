use kit::{json, FrameworkError, HttpResponse, ParameterContainer, Request, Response};
use serde_json::json as value;

fn parameters(req: &Request) -> Result<&ParameterContainer, FrameworkError> {
    req.parameters()
        .ok_or_else(|| FrameworkError::internal("request parameters were not negotiated"))
}

pub async fn show(req: Request) -> Response {
    let id = req.param("id")?;
    json(value!({
        "id": id,
        "name": format!("User {}", id)
    }))
}

pub async fn store(req: Request) -> Response {
    let params = parameters(&req)?;
    let name = params
        .body_params()
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FrameworkError::domain("The name field is required", 422))?;

    Ok(HttpResponse::json(value!({ "created": name })).status(201))
}

/// Echo what negotiation produced for a PUT or PATCH
pub async fn update(req: Request) -> Response {
    let params = parameters(&req)?;
    json(value!({
        "id": params.route_params().get("id"),
        "query": params.query_params(),
        "changes": params.body_params(),
    }))
}

pub async fn destroy(req: Request) -> Response {
    let params = parameters(&req)?;
    tracing::info!(id = ?params.route_params().get("id"), "user deleted");
    Ok(HttpResponse::new().status(204))
}
