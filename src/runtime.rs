use crate::Result;

use std::future::Future;

/// Drive an async backend call to completion on the current thread.
///
/// The CLI is synchronous; subprocess and D-Bus backends are async, so every `ServiceManager`
/// method funnels through here.
pub(crate) fn block_on_result<T>(future: impl Future<Output = Result<T>>) -> Result<T> {
    async_io::block_on(future)
}
