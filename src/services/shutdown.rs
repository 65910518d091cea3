use tokio::sync::watch;

/// Abort flag checked by the harvesters between units of work.
#[derive(Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (sender, receiver) = watch::channel(false);
        (sender, Shutdown { receiver })
    }

    /// A flag that is never raised.
    pub fn never() -> Self {
        Shutdown::new().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the flag is raised. Never resolves when the sender is
    /// gone without raising it.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Raises the flag on the first Ctrl-C.
pub fn listen_for_ctrl_c() -> Shutdown {
    let (sender, shutdown) = Shutdown::new();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for ctrl-c: {:?}", e);
            return;
        }
        log::warn!("Abort requested, stopping after the current unit of work");
        _ = sender.send(true);
    });

    shutdown
}
