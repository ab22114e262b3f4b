//! Customer decision gate.

use std::time::Duration;

use domain::signals::CUSTOMER_ACTION_SIGNAL;
use domain::{CustomerAction, CustomerActionSignal};
use tokio::sync::mpsc;

use crate::error::{Result, SagaError};

/// Waits for a customer decision or the deadline, whichever comes first.
///
/// Returns `Cancel` or `Amend` when the customer decides in time and
/// `TimedOut` when the deadline passes. The losing branch is dropped, which
/// cancels the timer. A signal carrying any other action is a protocol error.
#[tracing::instrument(skip(mailbox))]
pub async fn await_customer_action(
    mailbox: &mut mpsc::Receiver<CustomerActionSignal>,
    timeout: Duration,
) -> Result<CustomerAction> {
    tokio::select! {
        signal = mailbox.recv() => match signal {
            Some(signal) if signal.action.is_customer_choice() => {
                tracing::info!(action = %signal.action, "customer action received");
                Ok(signal.action)
            }
            Some(signal) => Err(SagaError::InvalidCustomerAction(signal.action)),
            None => Err(SagaError::MailboxClosed(CUSTOMER_ACTION_SIGNAL)),
        },
        () = tokio::time::sleep(timeout) => {
            tracing::info!("customer action timed out");
            Ok(CustomerAction::TimedOut)
        }
    }
}
