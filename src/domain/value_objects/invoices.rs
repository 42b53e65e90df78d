use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::invoices::{EditInvoiceEntity, InsertInvoiceEntity, InvoiceEntity},
    value_objects::enums::invoice_statuses::InvoiceStatus,
};

/// Identifiers travel as strings from forms and paths; the column is a UUID.
pub fn parse_invoice_uuid(field: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("{field} is not a valid UUID: {raw:?}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertInvoiceModel {
    pub customer_id: String,
    pub amount: i32,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

impl InsertInvoiceModel {
    pub fn to_entity(&self) -> Result<InsertInvoiceEntity> {
        Ok(InsertInvoiceEntity {
            customer_id: parse_invoice_uuid("customer_id", &self.customer_id)?,
            amount: self.amount,
            status: self.status.to_string(),
            date: self.date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditInvoiceModel {
    pub customer_id: String,
    pub amount: i32,
    pub status: InvoiceStatus,
}

impl EditInvoiceModel {
    pub fn to_entity(&self) -> Result<EditInvoiceEntity> {
        Ok(EditInvoiceEntity {
            customer_id: parse_invoice_uuid("customer_id", &self.customer_id)?,
            amount: self.amount,
            status: self.status.to_string(),
        })
    }
}

/// Row of the invoice listing view. `amount` stays in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceModel {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub amount: i32,
    pub status: String,
    pub date: NaiveDate,
}

impl From<InvoiceEntity> for InvoiceModel {
    fn from(value: InvoiceEntity) -> Self {
        Self {
            id: value.id,
            customer_id: value.customer_id,
            amount: value.amount,
            status: value.status,
            date: value.date,
        }
    }
}
