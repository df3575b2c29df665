//! Readiness handoff between the reader side and the control loop

use parking_lot::Mutex;
use sortline_cns::{
    CnsError, CommandSink, HandshakeCoordinator, ProtocolConfig, ReadinessFlag, SendOutcome,
    SerialLink,
};
use sortline_core::{ClassId, Confirmation, Verdict};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn confirmed(class: u8) -> Verdict {
    Verdict::Confirmed(Confirmation {
        class_id: ClassId(class),
        mean_confidence: 0.9,
        mean_latency: Duration::from_millis(20),
        agreement: 5,
    })
}

#[test]
fn test_single_signal_is_taken_exactly_once() {
    for _ in 0..200 {
        let flag = ReadinessFlag::new();
        let barrier = Arc::new(Barrier::new(5));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let flag = flag.clone();
                let barrier = barrier.clone();
                let winners = winners.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..100 {
                        if flag.take() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        flag.signal();
        for handle in handles {
            handle.join().unwrap();
        }

        // The signal may land after every taker finished; then it is still pending.
        let taken = winners.load(Ordering::SeqCst);
        assert!(taken <= 1);
        assert_eq!(taken == 0, flag.take());
    }
}

#[derive(Default)]
struct CountingSink {
    writes: AtomicUsize,
}

impl CommandSink for CountingSink {
    fn write_command(&self, _payload: &[u8]) -> Result<(), CnsError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> bool {
        true
    }

    fn is_open(&self) -> bool {
        true
    }
}

#[test]
fn test_sends_bounded_by_signals_under_contention() {
    let flag = ReadinessFlag::new();
    let sink = Arc::new(CountingSink::default());
    let mut coordinator = HandshakeCoordinator::new(flag.clone(), sink.clone(), ProtocolConfig::default());

    let signals = 1_000;
    let done = Arc::new(AtomicBool::new(false));
    let signaller = {
        let flag = flag.clone();
        let done = done.clone();
        thread::spawn(move || {
            for _ in 0..signals {
                flag.signal();
                thread::yield_now();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let verdict = confirmed(2);
    let mut sent = 0usize;
    while !done.load(Ordering::SeqCst) {
        if coordinator.try_send(&verdict) == SendOutcome::Sent {
            sent += 1;
        }
    }
    signaller.join().unwrap();
    if coordinator.try_send(&verdict) == SendOutcome::Sent {
        sent += 1;
    }

    assert!(sent >= 1);
    assert!(sent <= signals);
    assert_eq!(sent, sink.writes.load(Ordering::SeqCst));
    assert!(!flag.is_ready());
}

/// Read half that hands out scripted chunks, then idles until shut down
struct Scripted {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let next = {
            let mut chunks = self.chunks.lock();
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.remove(0))
            }
        };
        match next {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => {
                thread::sleep(Duration::from_millis(2));
                Err(io::Error::new(io::ErrorKind::WouldBlock, "idle"))
            }
        }
    }
}

struct Discard;

impl Write for Discard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_reader_thread_and_loop_share_flag() {
    let flag = ReadinessFlag::new();
    let chunks = Arc::new(Mutex::new(Vec::new()));
    let link = SerialLink::from_parts(
        "shared",
        Scripted { chunks: chunks.clone() },
        Discard,
        &ProtocolConfig::default(),
        flag.clone(),
    )
    .unwrap();
    let mut coordinator = HandshakeCoordinator::new(flag.clone(), link, ProtocolConfig::default());
    let verdict = confirmed(0);

    for round in 0..20 {
        chunks.lock().push(b"ok\n".to_vec());
        let mut sent = false;
        for _ in 0..2_000 {
            if coordinator.try_send(&verdict) == SendOutcome::Sent {
                sent = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(sent, "round {} never saw the ready line", round);
        assert_eq!(coordinator.try_send(&verdict), SendOutcome::Dropped);
    }

    assert!(coordinator.close());
}

#[test]
fn test_close_from_another_thread_stops_reader() {
    let link = Arc::new(
        SerialLink::from_parts(
            "shared",
            Scripted { chunks: Arc::new(Mutex::new(Vec::new())) },
            Discard,
            &ProtocolConfig::default(),
            ReadinessFlag::new(),
        )
        .unwrap(),
    );
    assert!(link.is_listening());

    let closer = {
        let link = link.clone();
        thread::spawn(move || link.close())
    };
    let closed_here = link.close();
    let closed_there = closer.join().unwrap();

    assert!(closed_here ^ closed_there);
    assert!(!link.is_listening());
    assert!(!link.is_open());
}
