pub mod action_state;
pub mod enums;
pub mod invoice_form;
pub mod invoices;
