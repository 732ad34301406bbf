//! Confirmation gate before order submission.

use tradelink::{OrderRequest, Price};

use crate::error::{Error, Result};
use crate::report;

/// What the user is asked to approve.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationRequest<'a> {
    pub iteration: u32,
    pub account_id: &'a str,
    pub orders: &'a [OrderRequest],
    pub projected_cash: Price,
}

/// Decides whether a set of orders may be submitted.
pub trait ConfirmationProvider {
    fn confirm(&self, request: &ConfirmationRequest<'_>) -> Result<bool>;
}

/// Prints the plan and asks on the terminal. Defaults to "no".
pub struct InteractiveConfirm;

impl ConfirmationProvider for InteractiveConfirm {
    fn confirm(&self, request: &ConfirmationRequest<'_>) -> Result<bool> {
        println!(
            "\nProposed orders for account {} (iteration {}):",
            request.account_id, request.iteration
        );
        print!(
            "{}",
            report::orders_table(request.orders, request.projected_cash)
        );
        dialoguer::Confirm::new()
            .with_prompt("Do you wish to execute the suggested transactions?")
            .default(false)
            .interact()
            .map_err(|e| Error::Prompt(format!("confirmation prompt failed: {e}")))
    }
}

/// Prints the plan and approves it (`--confirm-yes`).
pub struct AutoConfirm;

impl ConfirmationProvider for AutoConfirm {
    fn confirm(&self, request: &ConfirmationRequest<'_>) -> Result<bool> {
        println!(
            "\nSubmitting orders for account {} (iteration {}):",
            request.account_id, request.iteration
        );
        print!(
            "{}",
            report::orders_table(request.orders, request.projected_cash)
        );
        Ok(true)
    }
}
