use std::{future::Future, time::Duration};

use tokio::time;

use crate::Result;

/// Result of one bounded call to an external collaborator.
#[derive(Debug)]
pub enum Guarded<T> {
	Ready(T),
	Failed,
	TimedOut,
}
impl<T> Guarded<T> {
	pub fn ready(self) -> Option<T> {
		match self {
			Self::Ready(value) => Some(value),
			Self::Failed | Self::TimedOut => None,
		}
	}
}

/// Runs `fut` under `deadline`, absorbing errors and timeouts into a warning.
///
/// `stage` names the channel or provider in the log event.
pub async fn guarded<T, F>(stage: &'static str, deadline: Duration, fut: F) -> Guarded<T>
where
	F: Future<Output = Result<T>>,
{
	match time::timeout(deadline, fut).await {
		Ok(Ok(value)) => Guarded::Ready(value),
		Ok(Err(err)) => {
			tracing::warn!(channel = stage, error = %err, "Channel call failed.");

			Guarded::Failed
		},
		Err(_) => {
			tracing::warn!(
				channel = stage,
				timeout_ms = deadline.as_millis() as u64,
				"Channel call timed out."
			);

			Guarded::TimedOut
		},
	}
}

/// Awaits `fut` only when it is present.
pub async fn maybe<F>(fut: Option<F>) -> Option<F::Output>
where
	F: Future,
{
	match fut {
		Some(fut) => Some(fut.await),
		None => None,
	}
}
