//! Callback Adapter
//!
//! Every wrapper operation returns a `Result`. Callers that prefer
//! Node-style completion handlers wrap the operation with [`with_callback`],
//! which hands the outcome to the callback instead of returning an error.

use std::future::Future;

use crate::error::Result;

/// Completion handler receiving either the operation's value or its error.
pub type NodeCallback<T> = Box<dyn FnOnce(Result<T>) + Send>;

/// Runs `operation`, reporting its outcome through `callback`.
///
/// On success the callback receives a clone of the value and the value is
/// returned. On failure the callback receives the error and `None` is
/// returned, so the error is never raised to the caller.
pub async fn with_callback<T, Fut, F>(operation: Fut, callback: F) -> Option<T>
where
    T: Clone,
    Fut: Future<Output = Result<T>>,
    F: FnOnce(Result<T>),
{
    match operation.await {
        Ok(value) => {
            callback(Ok(value.clone()));
            Some(value)
        }
        Err(err) => {
            callback(Err(err));
            None
        }
    }
}

/// Boxes a closure into a [`NodeCallback`].
pub fn node_callback<T>(f: impl FnOnce(Result<T>) + Send + 'static) -> NodeCallback<T> {
    Box::new(f)
}
