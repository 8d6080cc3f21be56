//! # UI-Thread Marshaling
//!
//! SDK callbacks fire on the SDK's threads. The screens never touch their
//! state from there: listeners hold a [`UiDispatcher`] and post values, and the
//! owning thread applies them by draining its [`UiQueue`].
//!
//! ```
//! use tmprint::ui;
//!
//! let (dispatcher, mut queue) = ui::channel::<u32>();
//! std::thread::spawn(move || dispatcher.post(7)).join().unwrap();
//! assert_eq!(queue.drain(), vec![7]);
//! ```

use tokio::sync::mpsc;
use tracing::trace;

/// Create a connected dispatcher/queue pair.
pub fn channel<T>() -> (UiDispatcher<T>, UiQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiDispatcher { tx }, UiQueue { rx })
}

/// Sending half, safe to use from any thread.
#[derive(Debug)]
pub struct UiDispatcher<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for UiDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> UiDispatcher<T> {
    /// Queue `value` for the owning thread. Dropped if the queue is gone.
    pub fn post(&self, value: T) {
        if self.tx.send(value).is_err() {
            trace!("UI queue closed, dropping event");
        }
    }
}

/// Receiving half, owned by the screen.
#[derive(Debug)]
pub struct UiQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> UiQueue<T> {
    /// Take everything queued so far without blocking.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }

    /// Wait for the next value. `None` once every dispatcher is dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
