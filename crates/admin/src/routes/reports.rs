//! Report route handlers.
//!
//! `GET /api/reports/{kind}?from=&to=&format=` with `kind` one of `sales`,
//! `inventory`, `customers` or `financial`. CSV responses are sent as
//! attachments named `<kind>-<from>-<to>.csv`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::actions;
use crate::services::activity;
use crate::services::reports::{DateRange, ReportFormat, ReportKind, ReportService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: ReportFormat,
}

#[instrument(skip(state, admin, query), fields(admin_id = %admin.id))]
pub async fn generate(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response> {
    let kind: ReportKind = kind.parse().map_err(AppError::NotFound)?;
    let range = DateRange::resolve(query.from, query.to, Utc::now().date_naive())
        .map_err(AppError::BadRequest)?;

    let report = ReportService::new(state.pool())
        .generate(kind, range, state.config().low_stock_threshold)
        .await?;
    tracing::info!(
        %kind,
        from = %range.from,
        to = %range.to,
        format = ?query.format,
        "Report generated"
    );

    activity::record(
        state.pool(),
        &admin,
        actions::REPORT_GENERATE,
        "report",
        Some(kind.to_string()),
        json!({ "kind": kind, "from": range.from, "to": range.to, "format": query.format }),
    )
    .await;

    Ok(match query.format {
        ReportFormat::Json => Json(report).into_response(),
        ReportFormat::Csv => {
            let filename = format!("{kind}-{}-{}.csv", range.from, range.to);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                report.to_csv(),
            )
                .into_response()
        }
    })
}
