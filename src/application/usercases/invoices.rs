use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::domain::{
    repositories::{invoices::InvoiceRepository, view_cache::ViewCache},
    value_objects::{
        action_state::{
            ActionOutcome, CREATE_DATABASE_ERROR, CREATE_VALIDATION_FAILED, DeleteOutcome,
            INVOICES_PATH, InvoiceFormState, UPDATE_DATABASE_ERROR, UPDATE_VALIDATION_FAILED,
        },
        invoice_form::{InvoiceForm, validate_invoice_form},
        invoices::{EditInvoiceModel, InsertInvoiceModel, InvoiceModel},
    },
};

pub struct InvoiceUseCase<R, C>
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    invoice_repository: Arc<R>,
    view_cache: Arc<C>,
}

impl<R, C> InvoiceUseCase<R, C>
where
    R: InvoiceRepository + Send + Sync + 'static,
    C: ViewCache + Send + Sync + 'static,
{
    pub fn new(invoice_repository: Arc<R>, view_cache: Arc<C>) -> Self {
        Self {
            invoice_repository,
            view_cache,
        }
    }

    /// `_prev_state` is whatever the form last rendered; a new submission
    /// always starts from scratch.
    pub async fn create_invoice(
        &self,
        _prev_state: InvoiceFormState,
        form: InvoiceForm,
    ) -> ActionOutcome {
        info!("invoices: create requested");

        let validated = match validate_invoice_form(&form) {
            Ok(validated) => validated,
            Err(errors) => {
                warn!(
                    field_errors = ?errors,
                    "invoices: create form failed validation"
                );
                return ActionOutcome::State(InvoiceFormState::invalid(
                    errors,
                    CREATE_VALIDATION_FAILED,
                ));
            }
        };

        let insert_invoice_model = InsertInvoiceModel {
            amount: validated.amount_in_cents(),
            status: validated.status,
            date: Utc::now().date_naive(),
            customer_id: validated.customer_id,
        };

        match self
            .invoice_repository
            .create_invoice(insert_invoice_model)
            .await
        {
            Ok(invoice_id) => info!(%invoice_id, "invoices: invoice created"),
            Err(err) => {
                error!(db_error = ?err, "invoices: failed to create invoice");
                return ActionOutcome::State(InvoiceFormState::message(CREATE_DATABASE_ERROR));
            }
        }

        self.revalidate_invoices();
        ActionOutcome::redirect_to_invoices()
    }

    pub async fn update_invoice(
        &self,
        invoice_id: String,
        _prev_state: InvoiceFormState,
        form: InvoiceForm,
    ) -> ActionOutcome {
        info!(%invoice_id, "invoices: update requested");

        let validated = match validate_invoice_form(&form) {
            Ok(validated) => validated,
            Err(errors) => {
                warn!(
                    %invoice_id,
                    field_errors = ?errors,
                    "invoices: update form failed validation"
                );
                return ActionOutcome::State(InvoiceFormState::invalid(
                    errors,
                    UPDATE_VALIDATION_FAILED,
                ));
            }
        };

        let edit_invoice_model = EditInvoiceModel {
            amount: validated.amount_in_cents(),
            status: validated.status,
            customer_id: validated.customer_id,
        };

        match self
            .invoice_repository
            .update_invoice(invoice_id.clone(), edit_invoice_model)
            .await
        {
            Ok(0) => warn!(%invoice_id, "invoices: update matched no invoice"),
            Ok(_) => info!(%invoice_id, "invoices: invoice updated"),
            Err(err) => {
                error!(%invoice_id, db_error = ?err, "invoices: failed to update invoice");
                return ActionOutcome::State(InvoiceFormState::message(UPDATE_DATABASE_ERROR));
            }
        }

        self.revalidate_invoices();
        ActionOutcome::redirect_to_invoices()
    }

    pub async fn delete_invoice(&self, invoice_id: String) -> DeleteOutcome {
        info!(%invoice_id, "invoices: delete requested");

        match self
            .invoice_repository
            .delete_invoice(invoice_id.clone())
            .await
        {
            Ok(0) => warn!(%invoice_id, "invoices: delete matched no invoice"),
            Ok(_) => info!(%invoice_id, "invoices: invoice deleted"),
            Err(err) => {
                error!(%invoice_id, db_error = ?err, "invoices: failed to delete invoice");
                return DeleteOutcome::failed();
            }
        }

        self.revalidate_invoices();
        DeleteOutcome::deleted()
    }

    /// Rendered listing, served from the view cache until an action revalidates it.
    pub async fn list_invoices(&self) -> Result<Value> {
        if let Some(view) = self.view_cache.get(INVOICES_PATH) {
            debug!(path = INVOICES_PATH, "invoices: listing served from view cache");
            return Ok(view);
        }

        // Read before loading: a revalidation during the load bumps it and the
        // rendering below is not cached.
        let generation = self.view_cache.generation(INVOICES_PATH);

        let invoices = self
            .invoice_repository
            .list_invoices()
            .await
            .map_err(|err| {
                error!(db_error = ?err, "invoices: failed to load invoice listing");
                err
            })?;
        let invoice_count = invoices.len();

        let models = invoices
            .into_iter()
            .map(InvoiceModel::from)
            .collect::<Vec<_>>();
        let view = serde_json::to_value(&models)?;

        if self
            .view_cache
            .store_if_fresh(INVOICES_PATH, generation, view.clone())
        {
            info!(invoice_count, "invoices: listing rendered");
        } else {
            debug!(
                invoice_count,
                "invoices: listing revalidated while rendering, not cached"
            );
        }

        Ok(view)
    }

    fn revalidate_invoices(&self) {
        self.view_cache.revalidate_path(INVOICES_PATH);
        debug!(path = INVOICES_PATH, "invoices: listing revalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::invoices::InvoiceEntity,
        repositories::{invoices::MockInvoiceRepository, view_cache::MockViewCache},
        value_objects::{
            action_state::INVOICE_DELETED,
            enums::invoice_statuses::InvoiceStatus,
            invoice_form::{AMOUNT_GREATER_THAN_ZERO, STATUS_REQUIRED},
        },
    };
    use crate::infrastructure::view_cache::RenderedViewCache;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::Sequence;
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };
    use tokio::sync::Notify;
    use uuid::Uuid;

    fn form(customer_id: &str, amount: &str, status: &str) -> InvoiceForm {
        InvoiceForm {
            customer_id: Some(customer_id.to_string()),
            amount: Some(amount.to_string()),
            status: Some(status.to_string()),
        }
    }

    fn cache_expecting_revalidations(times: usize) -> MockViewCache {
        let mut view_cache = MockViewCache::new();
        view_cache
            .expect_revalidate_path()
            .withf(|path| path == INVOICES_PATH)
            .times(times)
            .return_const(());
        view_cache
    }

    fn usecase(
        invoice_repository: MockInvoiceRepository,
        view_cache: MockViewCache,
    ) -> InvoiceUseCase<MockInvoiceRepository, MockViewCache> {
        InvoiceUseCase::new(Arc::new(invoice_repository), Arc::new(view_cache))
    }

    #[tokio::test]
    async fn create_inserts_cents_and_todays_date_then_redirects() {
        let before = Utc::now().date_naive();
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_create_invoice()
            .withf(move |model| {
                model.customer_id == "c1"
                    && model.amount == 5000
                    && model.status == InvoiceStatus::Pending
                    && model.date >= before
                    && model.date <= Utc::now().date_naive()
            })
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .create_invoice(InvoiceFormState::default(), form("c1", "50", "pending"))
            .await;

        assert_eq!(
            outcome,
            ActionOutcome::Redirected("/dashboard/invoices".to_string())
        );
    }

    #[tokio::test]
    async fn create_revalidates_before_redirecting() {
        let mut seq = Sequence::new();
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_create_invoice()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Uuid::new_v4()));

        let mut view_cache = MockViewCache::new();
        view_cache
            .expect_revalidate_path()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let outcome = usecase(invoice_repository, view_cache)
            .create_invoice(InvoiceFormState::default(), form("c1", "1", "paid"))
            .await;

        assert!(matches!(outcome, ActionOutcome::Redirected(_)));
    }

    #[tokio::test]
    async fn create_with_invalid_form_never_touches_storage() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository.expect_create_invoice().never();

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(0))
            .create_invoice(InvoiceFormState::default(), form("c1", "0", "unpaid"))
            .await;

        let ActionOutcome::State(state) = outcome else {
            panic!("expected form state, got {outcome:?}");
        };
        assert_eq!(state.message.as_deref(), Some(CREATE_VALIDATION_FAILED));
        let errors = state.errors.unwrap();
        assert_eq!(errors.amount, Some(vec![AMOUNT_GREATER_THAN_ZERO.to_string()]));
        assert_eq!(errors.status, Some(vec![STATUS_REQUIRED.to_string()]));
        assert!(errors.customer_id.is_none());
    }

    #[tokio::test]
    async fn create_database_failure_returns_message_without_revalidating() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_create_invoice()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(0))
            .create_invoice(InvoiceFormState::default(), form("c1", "50", "pending"))
            .await;

        assert_eq!(
            outcome,
            ActionOutcome::State(InvoiceFormState {
                errors: None,
                message: Some("Database Error: Failed to Create Invoice.".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn create_ignores_previous_state() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_create_invoice()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let previous = InvoiceFormState::message(CREATE_DATABASE_ERROR);
        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .create_invoice(previous, form("c1", "2", "paid"))
            .await;

        assert_eq!(outcome, ActionOutcome::redirect_to_invoices());
    }

    #[tokio::test]
    async fn update_writes_customer_amount_and_status_only() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_update_invoice()
            .withf(|invoice_id, model| {
                invoice_id == "inv-1"
                    && *model
                        == EditInvoiceModel {
                            customer_id: "c2".to_string(),
                            amount: 1000,
                            status: InvoiceStatus::Paid,
                        }
            })
            .times(1)
            .returning(|_, _| Ok(1));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .update_invoice(
                "inv-1".to_string(),
                InvoiceFormState::default(),
                form("c2", "10", "paid"),
            )
            .await;

        assert_eq!(outcome, ActionOutcome::redirect_to_invoices());
    }

    #[tokio::test]
    async fn update_matching_no_row_still_redirects() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_update_invoice()
            .times(1)
            .returning(|_, _| Ok(0));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .update_invoice(
                "missing".to_string(),
                InvoiceFormState::default(),
                form("c2", "10", "paid"),
            )
            .await;

        assert_eq!(outcome, ActionOutcome::redirect_to_invoices());
    }

    #[tokio::test]
    async fn update_with_invalid_form_reports_update_message() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository.expect_update_invoice().never();

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(0))
            .update_invoice(
                "inv-1".to_string(),
                InvoiceFormState::default(),
                form("", "-5", "paid"),
            )
            .await;

        let ActionOutcome::State(state) = outcome else {
            panic!("expected form state, got {outcome:?}");
        };
        assert_eq!(state.message.as_deref(), Some(UPDATE_VALIDATION_FAILED));
        assert!(state.has_field_errors());
        let errors = state.errors.unwrap();
        assert!(errors.customer_id.is_some());
        assert!(errors.amount.is_some());
        assert!(errors.status.is_none());
    }

    #[tokio::test]
    async fn update_database_failure_returns_update_message() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_update_invoice()
            .times(1)
            .returning(|_, _| Err(anyhow!("deadlock detected")));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(0))
            .update_invoice(
                "inv-1".to_string(),
                InvoiceFormState::default(),
                form("c2", "10", "paid"),
            )
            .await;

        assert_eq!(
            outcome,
            ActionOutcome::State(InvoiceFormState::message(UPDATE_DATABASE_ERROR))
        );
    }

    #[tokio::test]
    async fn delete_revalidates_and_reports_success() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_delete_invoice()
            .withf(|invoice_id| invoice_id == "inv-1")
            .times(1)
            .returning(|_| Ok(1));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .delete_invoice("inv-1".to_string())
            .await;

        assert_eq!(
            outcome,
            DeleteOutcome::Deleted(InvoiceFormState::message("Invoice Deleted."))
        );
    }

    #[tokio::test]
    async fn delete_failure_reports_message_and_keeps_cache() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_delete_invoice()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset by peer")));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(0))
            .delete_invoice("inv-1".to_string())
            .await;

        assert_eq!(
            outcome,
            DeleteOutcome::Failed(InvoiceFormState {
                errors: None,
                message: Some("Database Error: Failed to Delete Invoice.".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn delete_of_missing_invoice_is_reported_as_deleted() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_delete_invoice()
            .times(1)
            .returning(|_| Ok(0));

        let outcome = usecase(invoice_repository, cache_expecting_revalidations(1))
            .delete_invoice("inv-404".to_string())
            .await;

        assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
        assert_eq!(outcome.into_state(), InvoiceFormState::message(INVOICE_DELETED));
    }

    #[tokio::test]
    async fn listing_renders_and_stores_on_cache_miss() {
        let invoice_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_invoices()
            .times(1)
            .returning(move || {
                Ok(vec![InvoiceEntity {
                    id: invoice_id,
                    customer_id,
                    amount: 4200,
                    status: "pending".to_string(),
                    date,
                }])
            });

        let mut view_cache = MockViewCache::new();
        view_cache
            .expect_get()
            .withf(|path| path == INVOICES_PATH)
            .times(1)
            .returning(|_| None);
        view_cache
            .expect_generation()
            .withf(|path| path == INVOICES_PATH)
            .times(1)
            .return_const(3u64);
        view_cache
            .expect_store_if_fresh()
            .withf(|path, generation, view| {
                path == INVOICES_PATH && *generation == 3 && view[0]["amount"] == 4200
            })
            .times(1)
            .return_const(true);

        let view = usecase(invoice_repository, view_cache)
            .list_invoices()
            .await
            .unwrap();

        assert_eq!(view[0]["id"], invoice_id.to_string());
        assert_eq!(view[0]["customerId"], customer_id.to_string());
        assert_eq!(view[0]["status"], "pending");
        assert_eq!(view[0]["date"], "2024-05-01");
    }

    #[tokio::test]
    async fn listing_is_served_from_cache_when_fresh() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository.expect_list_invoices().never();

        let mut view_cache = MockViewCache::new();
        view_cache
            .expect_get()
            .times(1)
            .returning(|_| Some(serde_json::json!([{ "amount": 1 }])));
        view_cache.expect_generation().never();
        view_cache.expect_store_if_fresh().never();

        let view = usecase(invoice_repository, view_cache)
            .list_invoices()
            .await
            .unwrap();

        assert_eq!(view, serde_json::json!([{ "amount": 1 }]));
    }

    #[tokio::test]
    async fn listing_failure_is_not_cached() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_invoices()
            .times(1)
            .returning(|| Err(anyhow!("relation \"invoices\" does not exist")));

        let mut view_cache = MockViewCache::new();
        view_cache.expect_get().returning(|_| None);
        view_cache.expect_generation().return_const(0u64);
        view_cache.expect_store_if_fresh().never();

        let result = usecase(invoice_repository, view_cache).list_invoices().await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn listing_rendered_before_revalidation_is_still_returned() {
        let mut invoice_repository = MockInvoiceRepository::new();
        invoice_repository
            .expect_list_invoices()
            .times(1)
            .returning(|| Ok(vec![]));

        let mut view_cache = MockViewCache::new();
        view_cache.expect_get().returning(|_| None);
        view_cache.expect_generation().return_const(1u64);
        view_cache
            .expect_store_if_fresh()
            .times(1)
            .return_const(false);

        let view = usecase(invoice_repository, view_cache)
            .list_invoices()
            .await
            .unwrap();

        assert_eq!(view, serde_json::json!([]));
    }

    /// Repository whose first listing snapshots the rows and then waits until
    /// the test releases it.
    struct ParkedListingRepository {
        rows: Mutex<Vec<InvoiceEntity>>,
        park_next_listing: AtomicBool,
        snapshot_taken: Notify,
        release: Notify,
    }

    impl ParkedListingRepository {
        fn with_rows(rows: Vec<InvoiceEntity>) -> Self {
            Self {
                rows: Mutex::new(rows),
                park_next_listing: AtomicBool::new(true),
                snapshot_taken: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl InvoiceRepository for ParkedListingRepository {
        async fn create_invoice(&self, _: InsertInvoiceModel) -> Result<Uuid> {
            Ok(Uuid::new_v4())
        }

        async fn update_invoice(&self, _: String, _: EditInvoiceModel) -> Result<usize> {
            Ok(1)
        }

        async fn delete_invoice(&self, _: String) -> Result<usize> {
            let mut rows = self.rows.lock().unwrap();
            let deleted = rows.len();
            rows.clear();
            Ok(deleted)
        }

        async fn list_invoices(&self) -> Result<Vec<InvoiceEntity>> {
            let snapshot = self.rows.lock().unwrap().clone();
            if self.park_next_listing.swap(false, Ordering::SeqCst) {
                self.snapshot_taken.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }
    }

    #[tokio::test]
    async fn delete_during_listing_render_is_not_masked_by_stale_view() {
        let invoice_repository = Arc::new(ParkedListingRepository::with_rows(vec![InvoiceEntity {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            amount: 100,
            status: "paid".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }]));
        let invoice_usecase = Arc::new(InvoiceUseCase::new(
            Arc::clone(&invoice_repository),
            Arc::new(RenderedViewCache::new()),
        ));

        let in_flight = tokio::spawn({
            let invoice_usecase = Arc::clone(&invoice_usecase);
            async move { invoice_usecase.list_invoices().await }
        });
        invoice_repository.snapshot_taken.notified().await;

        let deleted = invoice_usecase.delete_invoice("inv-1".to_string()).await;
        assert!(matches!(deleted, DeleteOutcome::Deleted(_)));
        invoice_repository.release.notify_one();

        let rendered_before_delete = in_flight.await.unwrap().unwrap();
        assert_eq!(rendered_before_delete[0]["amount"], 100);

        let after_delete = invoice_usecase.list_invoices().await.unwrap();
        assert_eq!(after_delete, serde_json::json!([]));
    }
}
