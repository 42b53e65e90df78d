use serde::{Deserialize, Serialize};

/// Listing view every invoice action revalidates, and where create/update land.
pub const INVOICES_PATH: &str = "/dashboard/invoices";

pub const CREATE_VALIDATION_FAILED: &str = "Missing Fields. Invoice Creation Failed.";
pub const UPDATE_VALIDATION_FAILED: &str = "Missing Fields. Invoice Update Failed.";
pub const CREATE_DATABASE_ERROR: &str = "Database Error: Failed to Create Invoice.";
pub const UPDATE_DATABASE_ERROR: &str = "Database Error: Failed to Update Invoice.";
pub const DELETE_DATABASE_ERROR: &str = "Database Error: Failed to Delete Invoice.";
pub const INVOICE_DELETED: &str = "Invoice Deleted.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFieldErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Vec<String>>,
}

impl InvoiceFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.amount.is_none() && self.status.is_none()
    }

    pub fn push_customer_id(&mut self, message: impl Into<String>) {
        self.customer_id.get_or_insert_with(Vec::new).push(message.into());
    }

    pub fn push_amount(&mut self, message: impl Into<String>) {
        self.amount.get_or_insert_with(Vec::new).push(message.into());
    }

    pub fn push_status(&mut self, message: impl Into<String>) {
        self.status.get_or_insert_with(Vec::new).push(message.into());
    }
}

/// What a form action hands back to the form that submitted it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceFormState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<InvoiceFieldErrors>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InvoiceFormState {
    pub fn invalid(errors: InvoiceFieldErrors, message: &str) -> Self {
        Self {
            errors: Some(errors),
            message: Some(message.to_string()),
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            errors: None,
            message: Some(message.to_string()),
        }
    }

    pub fn has_field_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

/// Terminal result of create/update. `Redirected` ends the action: the caller
/// navigates to the target and nothing else is rendered for this submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    State(InvoiceFormState),
    Redirected(String),
}

impl ActionOutcome {
    pub fn redirect_to_invoices() -> Self {
        ActionOutcome::Redirected(INVOICES_PATH.to_string())
    }
}

/// Result of a delete. Both arms carry the state shown to the user; the
/// variant records whether the statement went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(InvoiceFormState),
    Failed(InvoiceFormState),
}

impl DeleteOutcome {
    pub fn deleted() -> Self {
        DeleteOutcome::Deleted(InvoiceFormState::message(INVOICE_DELETED))
    }

    pub fn failed() -> Self {
        DeleteOutcome::Failed(InvoiceFormState::message(DELETE_DATABASE_ERROR))
    }

    pub fn state(&self) -> &InvoiceFormState {
        match self {
            DeleteOutcome::Deleted(state) | DeleteOutcome::Failed(state) => state,
        }
    }

    pub fn into_state(self) -> InvoiceFormState {
        match self {
            DeleteOutcome::Deleted(state) | DeleteOutcome::Failed(state) => state,
        }
    }
}
