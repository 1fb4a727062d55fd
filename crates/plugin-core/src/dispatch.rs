//! Concurrent work, in-order replies.
//!
//! Every reply is produced by its own task. Their handles are queued in arrival
//! order and a single consumer awaits them one by one, so a slow preview delays
//! later replies (acknowledgements included) but never reorders them.

use core::future::Future;

use anyhow::Result;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

#[derive(Debug)]
struct PendingReply<T> {
    target: T,
    reply: JoinHandle<Option<String>>,
}

/// Single dispatch point for everything the bot says in a room. Clones share
/// the same consumer.
#[derive(Debug)]
pub struct ReplyQueue<T> {
    tx: mpsc::UnboundedSender<PendingReply<T>>,
}

impl<T> Clone for ReplyQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> ReplyQueue<T> {
    /// Start the consumer task. `deliver` sends one finished reply to its target.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(mut deliver: F) -> Self
    where
        F: FnMut(T, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingReply<T>>();
        tokio::spawn(async move {
            while let Some(PendingReply { target, reply }) = rx.recv().await {
                match reply.await {
                    Ok(Some(text)) => {
                        if let Err(e) = deliver(target, text).await {
                            warn!(error = %e, "Failed to send reply");
                        }
                    }
                    Ok(None) => debug!("Task produced no reply"),
                    Err(e) => warn!(error = %e, "Reply task did not finish"),
                }
            }
            debug!("Reply queue closed");
        });
        Self { tx }
    }

    /// Queue a reply that is already known. It still waits for every earlier one.
    pub fn push_ready(&self, target: T, text: String) {
        self.push(target, async move { Some(text) });
    }

    /// Start `work` now; its reply goes out after every earlier one.
    pub fn push<W>(&self, target: T, work: W)
    where
        W: Future<Output = Option<String>> + Send + 'static,
    {
        let reply = tokio::spawn(work);
        if self.tx.send(PendingReply { target, reply }).is_err() {
            warn!("Reply queue consumer is gone; dropping reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;

    fn collecting_queue() -> (ReplyQueue<u32>, mpsc::UnboundedReceiver<(u32, String)>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let queue = ReplyQueue::spawn(move |target, text| {
            let out_tx = out_tx.clone();
            async move {
                out_tx.send((target, text))?;
                Ok(())
            }
        });
        (queue, out_rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<(u32, String)>) -> (u32, String) {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn replies_keep_arrival_order() {
        let (queue, mut rx) = collecting_queue();
        queue.push(1, async {
            sleep(Duration::from_millis(100)).await;
            Some("slow".to_owned())
        });
        queue.push(2, async { Some("fast".to_owned()) });
        queue.push(3, async { None });
        queue.push(4, async { Some("last".to_owned()) });

        assert_eq!(next(&mut rx).await, (1, "slow".to_owned()));
        assert_eq!(next(&mut rx).await, (2, "fast".to_owned()));
        assert_eq!(next(&mut rx).await, (4, "last".to_owned()));
    }

    #[tokio::test]
    async fn fetches_run_concurrently() {
        let (queue, mut rx) = collecting_queue();
        let started = tokio::time::Instant::now();
        for target in 0..5 {
            queue.push(target, async move {
                sleep(Duration::from_millis(200)).await;
                Some(format!("reply {target}"))
            });
        }
        for target in 0..5 {
            assert_eq!(next(&mut rx).await.0, target);
        }
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn ready_reply_waits_for_slower_earlier_one() {
        let (queue, mut rx) = collecting_queue();
        queue.push(1, async {
            sleep(Duration::from_millis(150)).await;
            Some("*Some Video*".to_owned())
        });
        queue.clone().push_ready(2, "alice: umu".to_owned());

        assert_eq!(next(&mut rx).await, (1, "*Some Video*".to_owned()));
        assert_eq!(next(&mut rx).await, (2, "alice: umu".to_owned()));
    }

    async fn explode() -> Option<String> {
        panic!("extractor blew up")
    }

    #[tokio::test]
    async fn panicked_task_is_skipped() {
        let (queue, mut rx) = collecting_queue();
        queue.push(1, explode());
        queue.push(2, async { Some("after".to_owned()) });
        assert_eq!(next(&mut rx).await, (2, "after".to_owned()));
    }
}
