//! Panic-isolated invocation of teardown hooks.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::cancellation::CancellationToken;
use crate::error::TeardownError;
use crate::traits::listener::LifecycleListener;

/// Runs one hook, converting a returned error or a panic into `TeardownError`.
pub(crate) fn end_lifecycle(
    key: &str,
    listener: &dyn LifecycleListener,
    token: Option<&CancellationToken>,
) -> Result<(), TeardownError> {
    match panic::catch_unwind(AssertUnwindSafe(|| listener.end_lifecycle(token))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(TeardownError::Failed {
            key: key.to_string(),
            source,
        }),
        Err(payload) => Err(TeardownError::Panicked {
            key: key.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
