use tokio::sync::broadcast;

/// Fan-out of the process-wide shutdown request.
pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;
