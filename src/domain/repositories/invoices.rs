use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::invoices::InvoiceEntity,
    value_objects::invoices::{EditInvoiceModel, InsertInvoiceModel},
};

/// Single-statement access to the `invoices` table. Ids are the raw strings
/// received from the client; implementations reject ones they cannot store.
#[automock]
#[async_trait]
pub trait InvoiceRepository {
    async fn create_invoice(&self, insert_invoice_model: InsertInvoiceModel) -> Result<Uuid>;
    /// Returns the number of rows updated.
    async fn update_invoice(
        &self,
        invoice_id: String,
        edit_invoice_model: EditInvoiceModel,
    ) -> Result<usize>;
    /// Returns the number of rows deleted.
    async fn delete_invoice(&self, invoice_id: String) -> Result<usize>;
    async fn list_invoices(&self) -> Result<Vec<InvoiceEntity>>;
}
