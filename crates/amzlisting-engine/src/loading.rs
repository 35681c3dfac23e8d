use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Progress captions shown while a generation is in flight.
pub const LOADING_MESSAGES: [&str; 6] = [
    "Analyzing product mockup...",
    "Extracting key features...",
    "Optimizing for Amazon SEO...",
    "Generating compelling copy...",
    "Creating backend search terms...",
    "Finalizing your listing...",
];

pub const LOADING_MESSAGE_INTERVAL: Duration = Duration::from_millis(2500);

/// Endless rotation over [`LOADING_MESSAGES`]. Display only; carries no progress.
#[derive(Debug, Clone, Default)]
pub struct LoadingMessages {
    index: usize,
}

impl Iterator for LoadingMessages {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        let message = LOADING_MESSAGES[self.index];
        self.index = (self.index + 1) % LOADING_MESSAGES.len();
        Some(message)
    }
}

/// Background thread that reports the next caption every interval until stopped.
pub struct LoadingTicker {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LoadingTicker {
    pub fn start<F>(interval: Duration, mut on_message: F) -> std::io::Result<Self>
    where
        F: FnMut(&'static str) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("amzlisting-loading".to_string())
            .spawn(move || {
                let mut messages = LoadingMessages::default();
                loop {
                    if let Some(message) = messages.next() {
                        on_message(message);
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LoadingTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
