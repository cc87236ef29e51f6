//! Provides a single-sender, multiple receiver one-shot channel where any message sent will be
//! received by all receivers.
//!
//! This implementation may not be blazingly fast but it should be simple enough to be reliable.
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    SenderDropped,
}

enum Future<T> {
    /// The future is ready and the item may be consumed.
    Ready(T),
    /// Future is not ready. The contained `Weak` is a reference to the `Sender` that may be used to
    /// detect when the channel is disconnected.
    NotReady(Weak<()>),
}

struct MutexCondvar<T> {
    mutex: Mutex<Future<T>>,
    condvar: Condvar,
}

/// The sending pair of the `oneshot` channel.
pub struct Sender<T>(Arc<MutexCondvar<T>>, Option<Arc<()>>);

impl<T> Sender<T> {
    /// Send a message, consuming `self` and delivering the message to *all* receivers.
    pub fn send(self, item: T) {
        *self.0.mutex.lock() = Future::Ready(item);
        // Outside the mutex; `Drop` wakes the receivers.
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sender(..)")
    }
}

impl<T> Drop for Sender<T> {
    /// Drop the `Arc` and notify all receivers so they can detect a dropped sender.
    fn drop(&mut self) {
        let guard = self.0.mutex.lock();
        drop(self.1.take());
        drop(guard);
        self.0.condvar.notify_all();
    }
}

/// The receiving pair of the `oneshot` channel. Always receives the message sent by the `Sender`
/// (if any).
#[derive(Clone)]
pub struct Receiver<T: Clone>(Arc<MutexCondvar<T>>);

impl<T: Clone> Receiver<T> {
    /// Check to see if there is a message to be read *without* blocking/waiting.
    ///
    /// ## Note
    ///
    /// This method will return `Ok(None)` if the `Sender` has not yet sent a message and is still
    /// alive. It returns `Err(Error::SenderDropped)` only if the sender was dropped without
    /// sending.
    pub fn try_recv(&self) -> Result<Option<T>, Error> {
        match &*self.0.mutex.lock() {
            Future::Ready(item) => Ok(Some(item.clone())),
            Future::NotReady(weak) if weak.upgrade().is_some() => Ok(None),
            Future::NotReady(_) => Err(Error::SenderDropped),
        }
    }

    /// Check to see if there is a message to be read whilst blocking/waiting until a message is
    /// sent or the `Sender` is dropped.
    pub fn recv(self) -> Result<T, Error> {
        let mut lock = self.0.mutex.lock();
        loop {
            match &*lock {
                Future::Ready(item) => return Ok(item.clone()),
                Future::NotReady(weak) if weak.upgrade().is_some() => {
                    self.0.condvar.wait(&mut lock);
                }
                Future::NotReady(_) => return Err(Error::SenderDropped),
            }
        }
    }
}

/// A single-sender, multi-receiver broadcast channel.
///
/// The sender may send *only one* message which will be received by *all* receivers.
pub fn oneshot<T: Clone>() -> (Sender<T>, Receiver<T>) {
    let sender_ref = Arc::new(());
    let mutex_condvar = Arc::new(MutexCondvar {
        mutex: Mutex::new(Future::NotReady(Arc::downgrade(&sender_ref))),
        condvar: Condvar::new(),
    });
    let receiver = Receiver(mutex_condvar.clone());
    let sender = Sender(mutex_condvar, Some(sender_ref));
    (sender, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn single_thread_try_recv() {
        let (sender, receiver) = oneshot();
        assert_eq!(receiver.try_recv(), Ok(None));
        sender.send(42);
        assert_eq!(receiver.try_recv(), Ok(Some(42)));
    }

    #[test]
    fn single_thread_try_recv_no_message() {
        let (sender, receiver) = oneshot::<u8>();
        assert_eq!(receiver.try_recv(), Ok(None));
        drop(sender);
        assert_eq!(receiver.try_recv(), Err(Error::SenderDropped));
    }

    #[test]
    fn single_thread_recv_no_message() {
        let (sender, receiver) = oneshot::<u8>();
        drop(sender);
        assert_eq!(receiver.recv(), Err(Error::SenderDropped));
    }

    #[test]
    fn multiple_receivers_all_see_the_message() {
        let (sender, receiver) = oneshot();
        let handles = (0..4)
            .map(|_| {
                let receiver = receiver.clone();
                thread::spawn(move || receiver.recv())
            })
            .collect::<Vec<_>>();

        thread::sleep(Duration::from_millis(20));
        sender.send(7u64);

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(7));
        }
    }

    #[test]
    fn blocked_receiver_sees_sender_drop() {
        let (sender, receiver) = oneshot::<u8>();
        let handle = thread::spawn(move || receiver.recv());
        thread::sleep(Duration::from_millis(20));
        drop(sender);
        assert_eq!(handle.join().unwrap(), Err(Error::SenderDropped));
    }
}
