//! Boolean "all true" over pending results.
//!
//! Inputs are [`Pending`] values: already known booleans, or futures that
//! resolve to another `Pending` (so nested pending results unwrap to a
//! boolean). Two waiting strategies are provided:
//!
//! | Function | On first `false` | On fault |
//! |----------|------------------|----------|
//! | [`all_true`] | resolve `false` immediately | fail immediately |
//! | [`all_settled`] | keep waiting, resolve `false` at the end | fail immediately |
//!
//! Dropping the remaining inputs cancels them, so [`all_settled`] is used
//! when every input has side effects that should land (such as fields
//! recording their error message). Both resolve `true` for no inputs, and
//! both accept a [`CancellationToken`] through their `_with` variants.

use std::future::Future;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ValidationError};

/// A boolean that may not be known yet.
pub enum Pending {
    /// Already resolved.
    Ready(bool),
    /// Resolves later, possibly to another pending value.
    Deferred(BoxFuture<'static, Result<Pending>>),
}

impl Pending {
    /// Wrap a future that resolves to another pending value.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Pending>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// Wrap a future that resolves directly to a boolean.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<bool>> + Send + 'static,
    {
        Self::Deferred(Box::pin(async move { future.await.map(Pending::Ready) }))
    }

    /// Await until a boolean is produced.
    pub async fn settle(self) -> Result<bool> {
        let mut current = self;
        loop {
            match current {
                Pending::Ready(value) => return Ok(value),
                Pending::Deferred(future) => current = future.await?,
            }
        }
    }
}

impl From<bool> for Pending {
    fn from(value: bool) -> Self {
        Pending::Ready(value)
    }
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pending::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Pending::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// `true` once every input is `true`; `false` as soon as one is `false`.
pub async fn all_true<I>(inputs: I) -> Result<bool>
where
    I: IntoIterator<Item = Pending>,
{
    all_true_with(inputs, &CancellationToken::new()).await
}

/// [`all_true`] with a cancellation token.
pub async fn all_true_with<I>(inputs: I, cancel: &CancellationToken) -> Result<bool>
where
    I: IntoIterator<Item = Pending>,
{
    combine(inputs, cancel, true).await
}

/// `true` iff every input is `true`, waiting for all of them either way.
pub async fn all_settled<I>(inputs: I) -> Result<bool>
where
    I: IntoIterator<Item = Pending>,
{
    all_settled_with(inputs, &CancellationToken::new()).await
}

/// [`all_settled`] with a cancellation token.
pub async fn all_settled_with<I>(inputs: I, cancel: &CancellationToken) -> Result<bool>
where
    I: IntoIterator<Item = Pending>,
{
    combine(inputs, cancel, false).await
}

async fn combine<I>(inputs: I, cancel: &CancellationToken, short_circuit: bool) -> Result<bool>
where
    I: IntoIterator<Item = Pending>,
{
    let mut running: FuturesUnordered<_> = inputs.into_iter().map(Pending::settle).collect();
    let mut all_valid = true;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ValidationError::Cancelled),
            next = running.next() => match next {
                None => return Ok(all_valid),
                Some(Ok(true)) => {}
                Some(Ok(false)) if short_circuit => return Ok(false),
                Some(Ok(false)) => all_valid = false,
                Some(Err(e)) => return Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleFault;
    use futures::executor::block_on;
    use futures::future;

    #[test]
    fn test_empty_is_true() {
        assert_eq!(block_on(all_true(Vec::new())), Ok(true));
        assert_eq!(block_on(all_settled(Vec::new())), Ok(true));
    }

    #[test]
    fn test_mixed_ready_and_deferred() {
        let inputs = vec![
            Pending::from(true),
            Pending::from_future(future::ready(Ok(true))),
        ];
        assert_eq!(block_on(all_true(inputs)), Ok(true));

        let inputs = vec![
            Pending::from(true),
            Pending::from_future(future::ready(Ok(false))),
        ];
        assert_eq!(block_on(all_settled(inputs)), Ok(false));
    }

    #[test]
    fn test_nested_pending_unwraps() {
        let nested = Pending::deferred(async {
            Ok(Pending::deferred(async { Ok(Pending::Ready(false)) }))
        });
        assert_eq!(block_on(all_true(vec![Pending::from(true), nested])), Ok(false));
    }

    #[test]
    fn test_fault_propagates() {
        let fault = ValidationError::rule("remote", RuleFault::failed("timeout"));
        let failing = fault.clone();
        let inputs = vec![
            Pending::from(true),
            Pending::from_future(async move { Err(failing) }),
        ];
        assert_eq!(block_on(all_settled(inputs)), Err(fault));
    }

    #[test]
    fn test_short_circuit_does_not_wait_for_slow_inputs() {
        let inputs = vec![
            Pending::from_future(future::pending()),
            Pending::from(false),
        ];
        assert_eq!(block_on(all_true(inputs)), Ok(false));
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let token = CancellationToken::new();
        token.cancel();
        let inputs = vec![Pending::from_future(future::pending())];
        assert_eq!(
            block_on(all_settled_with(inputs, &token)),
            Err(ValidationError::Cancelled)
        );
    }
}
