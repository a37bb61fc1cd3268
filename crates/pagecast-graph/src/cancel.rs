//! Cooperative cancellation over a `watch::Receiver<bool>`.
//!
//! The signal reads `true` once cancellation is requested. A dropped sender
//! means nobody can cancel any more.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{GraphError, GraphResult};

/// Fail fast if cancellation was already requested.
pub fn ensure_active(cancel: &watch::Receiver<bool>) -> GraphResult<()> {
    if *cancel.borrow() {
        Err(GraphError::Cancelled)
    } else {
        Ok(())
    }
}

/// Drive `fut` to completion unless cancellation is requested first.
pub async fn run_cancellable<T, F>(cancel: &mut watch::Receiver<bool>, fut: F) -> GraphResult<T>
where
    F: Future<Output = GraphResult<T>>,
{
    ensure_active(cancel)?;
    tokio::pin!(fut);

    loop {
        tokio::select! {
            out = &mut fut => return out,
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return Err(GraphError::Cancelled),
                Ok(()) => continue,
                Err(_) => return fut.await,
            },
        }
    }
}

/// Sleep for `duration`, waking early with `Cancelled` on cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: &mut watch::Receiver<bool>) -> GraphResult<()> {
    if duration.is_zero() {
        return ensure_active(cancel);
    }
    run_cancellable(cancel, async move {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let (tx, mut rx) = watch::channel(false);
        let sleeper = tokio::spawn(async move { sleep_or_cancel(Duration::from_secs(60), &mut rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleep should end on cancel")
            .unwrap();
        assert!(matches!(result, Err(GraphError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_sender_lets_future_finish() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let value = run_cancellable(&mut rx, async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_already_cancelled() {
        let (_tx, rx) = watch::channel(true);
        assert!(ensure_active(&rx).is_err());
    }
}
