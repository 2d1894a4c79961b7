//! Host-level cancellation for supervised runs.

use tokio::sync::watch;

/// Fires an [`Interrupt`]. Dropping the trigger without firing leaves it pending forever.
#[derive(Debug)]
pub struct InterruptTrigger {
    tx: watch::Sender<bool>,
}

impl InterruptTrigger {
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }
}

/// Observed by the supervisor while polling.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: Option<watch::Receiver<bool>>,
}

impl Interrupt {
    pub fn pair() -> (InterruptTrigger, Interrupt) {
        let (tx, rx) = watch::channel(false);
        (InterruptTrigger { tx }, Interrupt { rx: Some(rx) })
    }

    /// An interrupt that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_fired(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the interrupt fires.
    pub async fn fired(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                if rx.wait_for(|fired| *fired).await.is_err() {
                    // Trigger dropped without firing.
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}
