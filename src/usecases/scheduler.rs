//! Scheduler - Owned Periodic Jobs with Coordinated Shutdown
//!
//! Every periodic job runs in its own tokio task and is awaited before
//! its next tick, so a slow run can never overlap the following one;
//! missed ticks are skipped. A shared broadcast channel stops all jobs,
//! including one that is mid-run (its in-flight work is dropped).

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Owner of all periodic background jobs.
pub struct Scheduler {
  /// Shutdown broadcaster shared with every job (and servers).
  shutdown_tx: broadcast::Sender<()>,
  /// Spawned jobs by name.
  jobs: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler {
  pub fn new() -> Self {
    let (shutdown_tx, _) = broadcast::channel(1);
    Self {
      shutdown_tx,
      jobs: Vec::new(),
    }
  }

  /// Receiver that fires when the scheduler shuts down.
  pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
    self.shutdown_tx.subscribe()
  }

  /// Number of jobs spawned so far.
  pub fn job_count(&self) -> usize {
    self.jobs.len()
  }

  /// Spawn `job` every `period`, first run immediately.
  pub fn spawn_periodic<F, Fut>(&mut self, name: &'static str, period: Duration, mut job: F)
  where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let mut shutdown_rx = self.shutdown_tx.subscribe();

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

      info!(job = name, period_secs = period.as_secs_f64(), "Periodic job started");

      loop {
        tokio::select! {
          biased;
          _ = shutdown_rx.recv() => break,
          _ = ticker.tick() => {}
        }

        tokio::select! {
          biased;
          _ = shutdown_rx.recv() => {
            info!(job = name, "Job cancelled mid-run");
            break;
          }
          () = job() => debug!(job = name, "Job run finished"),
        }
      }

      info!(job = name, "Periodic job stopped");
    });

    self.jobs.push((name, handle));
  }

  /// Signal all jobs to stop and wait up to `grace` for each.
  pub async fn shutdown(self, grace: Duration) {
    let _ = self.shutdown_tx.send(());

    for (name, handle) in self.jobs {
      match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(job = name, error = %e, "Job task panicked"),
        Err(_) => warn!(job = name, "Job did not stop within grace period"),
      }
    }

    info!("Scheduler stopped");
  }
}
