use crate::error::ReactiveError;
use crate::signal::Signal;
use crate::state::ErrorValue;
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::error::Error;
use std::future::Future;
use tracing::trace;

/// Expose the outcome of a future as a derivable.
///
/// The returned signal is unresolved until the executor behind `spawner`
/// polls the future to completion. It then holds the value, or the error if
/// the future failed. Derivables depending on the signal are notified like
/// for any other change.
///
/// # Example
///
/// ```
/// use futures::executor::LocalPool;
/// use tincan_flow::{from_future, DerivableExt};
///
/// let mut pool = LocalPool::new();
/// let answer = from_future(&pool.spawner(), async { Ok::<_, std::io::Error>(42) })?;
/// assert!(!answer.resolved());
///
/// pool.run_until_stalled();
/// assert_eq!(answer.value(), Some(42));
/// # Ok::<(), tincan_flow::ReactiveError>(())
/// ```
pub fn from_future<V, E, F, S>(spawner: &S, future: F) -> Result<Signal<V>, ReactiveError>
where
    V: Clone + PartialEq + 'static,
    E: Error + Send + Sync + 'static,
    F: Future<Output = Result<V, E>> + 'static,
    S: LocalSpawn + ?Sized,
{
    let signal = Signal::unresolved();
    let target = signal.clone();
    spawner.spawn_local(async move {
        match future.await {
            Ok(value) => target.set(value),
            Err(error) => {
                trace!(signal = target.id(), %error, "producer failed");
                target.set_error(ErrorValue::new(error));
            }
        }
    })?;
    Ok(signal)
}
