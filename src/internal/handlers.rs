// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::StatusCode, Json};
use serde_json::Value;

use crate::{
    error::ApiError,
    models::{people_directory, EchoResponse, Person},
};

pub async fn list_people() -> Json<Vec<Person>> {
    Json(people_directory())
}

pub async fn echo(Json(received): Json<Value>) -> Json<EchoResponse> {
    Json(EchoResponse { received })
}

/// Fallback for the namespace. Runs behind the gate like every route.
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}
