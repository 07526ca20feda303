//! A body extractor that accepts an HTML form post (urlencoded or multipart)
//! or a JSON body.

use axum::{
  Form, Json,
  extract::{FromRequest, Multipart, Request},
  http::header,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A request body decoded from `application/json`,
/// `application/x-www-form-urlencoded` or `multipart/form-data`, remembering
/// whether JSON arrived so the handler can answer in kind.
pub struct Submission<T> {
  pub body:       T,
  pub wants_json: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BodyKind {
  Json,
  Multipart,
  Urlencoded,
}

fn body_kind(req: &Request) -> BodyKind {
  let ct = req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default();
  if ct.starts_with("application/json") {
    BodyKind::Json
  } else if ct.starts_with("multipart/form-data") {
    BodyKind::Multipart
  } else {
    BodyKind::Urlencoded
  }
}

impl<T, S> FromRequest<S> for Submission<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let kind = body_kind(&req);

    let body = match kind {
      BodyKind::Json => {
        let Json(body) = Json::<T>::from_request(req, state)
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body
      }
      BodyKind::Multipart => {
        let multipart = Multipart::from_request(req, state)
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        from_multipart(multipart).await?
      }
      BodyKind::Urlencoded => {
        let Form(body) = Form::<T>::from_request(req, state)
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body
      }
    };

    Ok(Self { body, wants_json: kind == BodyKind::Json })
  }
}

/// Collect the named text parts of a multipart body into `T`. File parts are
/// skipped; a repeated name keeps its last value.
async fn from_multipart<T>(mut multipart: Multipart) -> Result<T, ApiError>
where
  T: DeserializeOwned,
{
  let mut fields = Map::new();
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.file_name().is_some() {
      continue;
    }
    let Some(name) = field.name().map(str::to_owned) else {
      continue;
    };
    let text = field
      .text()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    fields.insert(name, Value::String(text));
  }

  serde_json::from_value(Value::Object(fields))
    .map_err(|e| ApiError::BadRequest(format!("invalid form fields: {e}")))
}
