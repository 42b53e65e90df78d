use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde_json::Value;
use tracing::warn;

use crate::{
    application::usercases::invoices::InvoiceUseCase,
    domain::{
        repositories::{invoices::InvoiceRepository, view_cache::ViewCache},
        value_objects::{
            action_state::{ActionOutcome, DeleteOutcome, InvoiceFormState},
            invoice_form::InvoiceForm,
        },
    },
    infrastructure::{
        axum_http::error_responses::AppError,
        postgres::{postgres_connection::PgPoolSquad, repositories::invoices::InvoicePostgres},
        view_cache::RenderedViewCache,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, view_cache: Arc<RenderedViewCache>) -> Router {
    let invoice_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let invoice_usecase = InvoiceUseCase::new(Arc::new(invoice_repository), view_cache);

    router(Arc::new(invoice_usecase))
}

pub fn router<R, C>(invoice_usecase: Arc<InvoiceUseCase<R, C>>) -> Router
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_invoices::<R, C>))
        .route("/create", post(create_invoice::<R, C>))
        .route("/:id/edit", post(update_invoice::<R, C>))
        .route("/:id/delete", post(delete_invoice::<R, C>))
        .with_state(invoice_usecase)
}

pub async fn list_invoices<R, C>(
    State(invoice_usecase): State<Arc<InvoiceUseCase<R, C>>>,
) -> Result<Json<Value>, AppError>
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    let view = invoice_usecase.list_invoices().await?;
    Ok(Json(view))
}

pub async fn create_invoice<R, C>(
    State(invoice_usecase): State<Arc<InvoiceUseCase<R, C>>>,
    form_body: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    let outcome = invoice_usecase
        .create_invoice(InvoiceFormState::default(), read_invoice_form(form_body))
        .await;

    outcome_response(outcome)
}

pub async fn update_invoice<R, C>(
    State(invoice_usecase): State<Arc<InvoiceUseCase<R, C>>>,
    Path(invoice_id): Path<String>,
    form_body: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    let outcome = invoice_usecase
        .update_invoice(
            invoice_id,
            InvoiceFormState::default(),
            read_invoice_form(form_body),
        )
        .await;

    outcome_response(outcome)
}

pub async fn delete_invoice<R, C>(
    State(invoice_usecase): State<Arc<InvoiceUseCase<R, C>>>,
    Path(invoice_id): Path<String>,
) -> Response
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    match invoice_usecase.delete_invoice(invoice_id).await {
        DeleteOutcome::Deleted(state) => (StatusCode::OK, Json(state)).into_response(),
        DeleteOutcome::Failed(state) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(state)).into_response()
        }
    }
}

// A body that is not a readable form is validated as an empty submission,
// so the client still gets field errors back.
fn read_invoice_form(
    form_body: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> InvoiceForm {
    match form_body {
        Ok(Form(pairs)) => InvoiceForm::from_pairs(pairs),
        Err(rejection) => {
            warn!(%rejection, "invoices: unreadable form body");
            InvoiceForm::default()
        }
    }
}

// A form action that did not redirect either failed validation (field errors)
// or failed to persist (message only).
fn outcome_response(outcome: ActionOutcome) -> Response {
    match outcome {
        ActionOutcome::Redirected(target) => Redirect::to(&target).into_response(),
        ActionOutcome::State(state) if state.has_field_errors() => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(state)).into_response()
        }
        ActionOutcome::State(state) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(state)).into_response()
        }
    }
}
