//! Fault capture at the provider boundary.
//!
//! Only one error is kept per thread. It is written by the shim whenever a
//! provider call fails or faults, and read by the engine adapter when the
//! engine asks for the last error.

use crate::provider::ProviderOp;
use crate::{VfsError, VfsErrorKind, VfsResult};
use std::any::Any;
use std::cell::RefCell;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Register a new error for the current thread.
pub fn update_last_error<E: Display>(err: E) {
    LAST_ERROR.with(|prev| {
        *prev.borrow_mut() = Some(err.to_string());
    });
}

/// Retrieve the most recent error, clearing it in the process.
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|prev| prev.borrow_mut().take())
}

/// Peek at the most recent error without clearing it.
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|prev| prev.borrow().clone())
}

/// A provider panicked while handling `op`.
#[derive(Debug, Error)]
#[error("provider faulted during {op}: {message}")]
pub struct ProviderFault {
    pub op: ProviderOp,
    pub message: String,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one provider call, converting a panic into a [`VfsErrorKind::Fault`]
/// error and recording any failure as the thread's last error.
pub fn guarded<T>(op: ProviderOp, call: impl FnOnce() -> VfsResult<T>) -> VfsResult<T> {
    tracing::trace!(op = op.name(), "provider call");
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::debug!(op = op.name(), error = %err, "provider call failed");
            update_last_error(&err);
            Err(err)
        }
        Err(payload) => {
            let fault = ProviderFault {
                op,
                message: panic_message(payload.as_ref()),
            };
            tracing::error!(op = op.name(), message = %fault.message, "provider faulted");
            update_last_error(&fault);
            Err(VfsError::with_source(
                VfsErrorKind::Fault,
                op.fault_context(),
                fault,
            ))
        }
    }
}
