use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::invoices::InvoiceEntity,
        repositories::invoices::InvoiceRepository,
        value_objects::invoices::{EditInvoiceModel, InsertInvoiceModel, parse_invoice_uuid},
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::invoices},
};

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

// Diesel is synchronous; every statement runs on the blocking threadpool.
#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn create_invoice(&self, insert_invoice_model: InsertInvoiceModel) -> Result<Uuid> {
        let insert_invoice_entity = insert_invoice_model.to_entity()?;
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Uuid> {
            let mut conn = db_pool.get()?;

            let invoice_id = insert_into(invoices::table)
                .values(&insert_invoice_entity)
                .returning(invoices::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(invoice_id)
        })
        .await?
    }

    async fn update_invoice(
        &self,
        invoice_id: String,
        edit_invoice_model: EditInvoiceModel,
    ) -> Result<usize> {
        let invoice_id = parse_invoice_uuid("invoice_id", &invoice_id)?;
        let edit_invoice_entity = edit_invoice_model.to_entity()?;
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let updated = update(invoices::table.filter(invoices::id.eq(invoice_id)))
                .set(&edit_invoice_entity)
                .execute(&mut conn)?;

            Ok(updated)
        })
        .await?
    }

    async fn delete_invoice(&self, invoice_id: String) -> Result<usize> {
        let invoice_id = parse_invoice_uuid("invoice_id", &invoice_id)?;
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db_pool.get()?;

            let deleted =
                delete(invoices::table.filter(invoices::id.eq(invoice_id))).execute(&mut conn)?;

            Ok(deleted)
        })
        .await?
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Vec<InvoiceEntity>> {
            let mut conn = db_pool.get()?;

            let rows = invoices::table
                .select(InvoiceEntity::as_select())
                .order(invoices::date.desc())
                .load::<InvoiceEntity>(&mut conn)?;

            Ok(rows)
        })
        .await?
    }
}
