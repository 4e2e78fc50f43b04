//! Dedicated per-adapter delivery queue.
//!
//! Providers call the producer callback on their own capture thread. The
//! callback only enqueues; a named delivery thread drains the queue and
//! hands each sample to the session. Video and audio each get their own
//! queue, so neither can stall the other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::error::RecorderError;
use crate::models::media::{Sample, TrackKind};
use crate::traits::capture_source::DeliveryStats;
use crate::traits::screen_provider::SampleCallback;

enum Delivery {
    Sample(Sample),
    Drain,
}

#[derive(Default)]
struct DeliveryCounters {
    queue_full: AtomicU64,
    after_stop: AtomicU64,
}

pub(crate) struct DeliveryQueue {
    kind: TrackKind,
    sender: Sender<Delivery>,
    halted: Arc<AtomicBool>,
    counters: Arc<DeliveryCounters>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DeliveryQueue {
    /// Spawn the delivery thread. `on_sample` runs on that thread only.
    pub(crate) fn spawn(
        kind: TrackKind,
        capacity: usize,
        on_sample: SampleCallback,
    ) -> Result<Self, RecorderError> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));

        let handle = thread::Builder::new()
            .name(format!("{}-delivery", kind))
            .spawn(move || deliver_loop(kind, receiver, on_sample))
            .map_err(|e| {
                RecorderError::AcquisitionFailure(format!("failed to spawn {} delivery thread: {}", kind, e))
            })?;

        Ok(Self {
            kind,
            sender,
            halted: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(DeliveryCounters::default()),
            handle: Some(handle),
        })
    }

    /// Callback to register with the provider.
    pub(crate) fn producer(&self) -> SampleCallback {
        let kind = self.kind;
        let sender = self.sender.clone();
        let halted = Arc::clone(&self.halted);
        let counters = Arc::clone(&self.counters);

        Arc::new(move |sample: Sample| {
            if halted.load(Ordering::Acquire) {
                counters.after_stop.fetch_add(1, Ordering::Relaxed);
                log::trace!("{} sample at {} arrived after stop, discarded", kind, sample.pts());
                return;
            }
            match sender.try_send(Delivery::Sample(sample)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    counters.queue_full.fetch_add(1, Ordering::Relaxed);
                    log::trace!("{} delivery queue full, sample dropped", kind);
                }
                Err(TrySendError::Disconnected(_)) => {
                    counters.after_stop.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    }

    /// Discard everything the provider produces from now on.
    pub(crate) fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    /// Halt, deliver what is already queued, and join the delivery thread.
    pub(crate) fn shutdown(&mut self) {
        self.halt();
        let Some(handle) = self.handle.take() else {
            return;
        };
        // Blocks only while the queue is full; the delivery thread keeps draining.
        let _ = self.sender.send(Delivery::Drain);
        if handle.join().is_err() {
            log::error!("{} delivery thread panicked", self.kind);
        }
    }

    pub(crate) fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            dropped_queue_full: self.counters.queue_full.load(Ordering::Relaxed),
            dropped_after_stop: self.counters.after_stop.load(Ordering::Relaxed),
        }
    }
}

impl Drop for DeliveryQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn deliver_loop(kind: TrackKind, receiver: Receiver<Delivery>, on_sample: SampleCallback) {
    let mut delivered: u64 = 0;
    for message in receiver.iter() {
        match message {
            Delivery::Sample(sample) => {
                on_sample(sample);
                delivered += 1;
            }
            Delivery::Drain => break,
        }
    }
    log::debug!("{} delivery thread exiting after {} samples", kind, delivered);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::MediaTime;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    fn collecting_queue(capacity: usize) -> (DeliveryQueue, Arc<Mutex<Vec<(i64, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = DeliveryQueue::spawn(
            TrackKind::Video,
            capacity,
            Arc::new(move |sample: Sample| {
                let name = thread::current().name().unwrap_or_default().to_string();
                sink.lock().push((sample.pts().value(), name));
            }),
        )
        .unwrap();
        (queue, seen)
    }

    #[test]
    fn delivers_in_order_on_dedicated_thread() {
        let (mut queue, seen) = collecting_queue(16);
        let producer = queue.producer();
        for i in 0..5 {
            producer(Sample::video(MediaTime::new(i, 1), vec![0u8]));
        }
        queue.shutdown();

        let seen = seen.lock();
        let order: Vec<i64> = seen.iter().map(|(pts, _)| *pts).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(seen.iter().all(|(_, name)| name == "video-delivery"));
    }

    #[test]
    fn samples_after_halt_are_discarded() {
        let (mut queue, seen) = collecting_queue(16);
        let producer = queue.producer();
        producer(Sample::video(MediaTime::new(1, 1), vec![0u8]));
        queue.shutdown();
        producer(Sample::video(MediaTime::new(2, 1), vec![0u8]));

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(queue.stats().dropped_after_stop, 1);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let gate_rx = Mutex::new(gate_rx);
        let mut queue = DeliveryQueue::spawn(
            TrackKind::Audio,
            1,
            Arc::new(move |_sample: Sample| {
                let _ = started_tx.lock().send(());
                let _ = gate_rx.lock().recv_timeout(Duration::from_secs(5));
            }),
        )
        .unwrap();
        let producer = queue.producer();

        // First sample occupies the delivery thread, second fills the queue.
        producer(Sample::audio(MediaTime::new(0, 1), vec![0u8]));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        producer(Sample::audio(MediaTime::new(1, 1), vec![0u8]));
        producer(Sample::audio(MediaTime::new(2, 1), vec![0u8]));

        assert_eq!(queue.stats().dropped_queue_full, 1);
        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        queue.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (mut queue, _) = collecting_queue(4);
        queue.shutdown();
        queue.shutdown();
        assert_eq!(queue.stats(), DeliveryStats::default());
    }
}
