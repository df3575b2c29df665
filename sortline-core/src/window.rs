//! Sliding confirmation window
//!
//! Holds the most recent `capacity` classification samples and turns them
//! into a [`Verdict`] by majority vote. A class is confirmed only once the
//! window is full and at least `min_agreement` of the held samples agree.
//!
//! The window never clears itself after a confirmation: while the same
//! object stays in view the verdict keeps re-confirming. Deciding how often
//! to act on a confirmation belongs to the caller.

use crate::config::WindowConfig;
use crate::error::{Error, Result};
use crate::types::{ClassId, ClassificationSample, Confirmation, Verdict};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

pub struct ConfirmationWindow {
    samples: VecDeque<ClassificationSample>,
    capacity: usize,
    min_agreement: usize,
}

impl ConfirmationWindow {
    /// Create a window from a validated configuration
    pub fn new(config: &WindowConfig) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;
        debug!(
            "Confirmation window: {} of last {} samples confirm a class",
            config.min_agreement, config.capacity
        );
        Ok(Self {
            samples: VecDeque::with_capacity(config.capacity),
            capacity: config.capacity,
            min_agreement: config.min_agreement,
        })
    }

    /// Create a window with an explicit voting policy
    pub fn with_policy(capacity: usize, min_agreement: usize) -> Result<Self> {
        Self::new(&WindowConfig {
            capacity,
            min_agreement,
            ..WindowConfig::default()
        })
    }

    /// Insert `sample` as the newest entry and return the resulting verdict.
    ///
    /// The oldest sample is evicted once the window is over capacity.
    pub fn push(&mut self, sample: ClassificationSample) -> Verdict {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.verdict()
    }

    /// Verdict for the current contents without mutating the window
    pub fn verdict(&self) -> Verdict {
        if !self.is_full() {
            return Verdict::Unconfirmed;
        }

        let (leader, count) = match self.leader() {
            Some(leader) => leader,
            None => return Verdict::Unconfirmed,
        };

        if count < self.min_agreement {
            return Verdict::NoMatch { leader, count };
        }

        let confidence_sum: f32 = self
            .samples
            .iter()
            .filter(|s| s.class_id() == leader)
            .map(|s| s.confidence())
            .sum();
        let latency_sum: Duration = self.samples.iter().map(|s| s.latency()).sum();

        Verdict::Confirmed(Confirmation {
            class_id: leader,
            mean_confidence: confidence_sum / count as f32,
            mean_latency: latency_sum / self.samples.len() as u32,
            agreement: count,
        })
    }

    /// Most frequent class and its count.
    ///
    /// Ties go to the class seen earliest among the held samples.
    fn leader(&self) -> Option<(ClassId, usize)> {
        let mut tally: Vec<(ClassId, usize)> = Vec::new();
        for sample in &self.samples {
            match tally.iter_mut().find(|(id, _)| *id == sample.class_id()) {
                Some((_, count)) => *count += 1,
                None => tally.push((sample.class_id(), 1)),
            }
        }

        let mut best: Option<(ClassId, usize)> = None;
        for (id, count) in tally {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((id, count)),
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_agreement(&self) -> usize {
        self.min_agreement
    }

    /// Held samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ClassificationSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_WINDOW_CAPACITY;

    fn sample(class: u8, confidence: f32, latency_ms: u64) -> ClassificationSample {
        ClassificationSample::new(ClassId(class), confidence, Duration::from_millis(latency_ms))
            .unwrap()
    }

    fn push_all(window: &mut ConfirmationWindow, classes: &[u8]) -> Verdict {
        let mut verdict = Verdict::Unconfirmed;
        for &class in classes {
            verdict = window.push(sample(class, 0.9, 10));
        }
        verdict
    }

    #[test]
    fn test_unconfirmed_until_full() {
        let mut window = ConfirmationWindow::with_policy(5, 4).unwrap();
        for _ in 0..4 {
            assert_eq!(window.push(sample(1, 0.9, 10)), Verdict::Unconfirmed);
        }
        assert!(!window.is_full());
        assert!(window.push(sample(1, 0.9, 10)).is_confirmed());
    }

    #[test]
    fn test_confirmed_means() {
        let mut window = ConfirmationWindow::with_policy(5, 4).unwrap();
        window.push(sample(0, 0.8, 10));
        window.push(sample(0, 0.9, 20));
        window.push(sample(0, 0.7, 30));
        window.push(sample(0, 0.6, 40));
        let verdict = window.push(sample(1, 0.2, 50));

        let confirmation = verdict.confirmation().copied().unwrap();
        assert_eq!(confirmation.class_id, ClassId(0));
        assert_eq!(confirmation.agreement, 4);
        assert!((confirmation.mean_confidence - 0.75).abs() < 1e-6);
        assert_eq!(confirmation.mean_latency, Duration::from_millis(30));
    }

    #[test]
    fn test_no_match_when_below_threshold() {
        let mut window = ConfirmationWindow::with_policy(5, 3).unwrap();
        let verdict = push_all(&mut window, &[0, 1, 0, 1, 2]);
        assert_eq!(verdict, Verdict::NoMatch { leader: ClassId(0), count: 2 });
    }

    #[test]
    fn test_tie_break_prefers_first_seen() {
        let mut window = ConfirmationWindow::with_policy(4, 2).unwrap();
        let verdict = push_all(&mut window, &[2, 1, 1, 2]);
        assert_eq!(verdict.confirmation().unwrap().class_id, ClassId(2));

        // window is now [1, 1, 2, 2]: the earliest held sample decides
        let verdict = window.push(sample(2, 0.9, 10));
        assert_eq!(verdict.confirmation().unwrap().class_id, ClassId(1));

        // window is now [1, 2, 2, 2]
        let verdict = window.push(sample(2, 0.9, 10));
        let confirmation = verdict.confirmation().copied().unwrap();
        assert_eq!(confirmation.class_id, ClassId(2));
        assert_eq!(confirmation.agreement, 3);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut window = ConfirmationWindow::with_policy(3, 2).unwrap();
        push_all(&mut window, &[0, 1, 2, 1]);
        let held: Vec<u8> = window.iter().map(|s| s.class_id().0).collect();
        assert_eq!(held, vec![1, 2, 1]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_reconfirms_while_object_stays() {
        let mut window = ConfirmationWindow::with_policy(5, 4).unwrap();
        assert!(push_all(&mut window, &[1, 1, 1, 1, 2]).is_confirmed());
        assert!(window.push(sample(1, 0.9, 10)).is_confirmed());
        assert!(window.push(sample(1, 0.9, 10)).is_confirmed());
    }

    #[test]
    fn test_largest_window_averages_latency() {
        let mut window =
            ConfirmationWindow::with_policy(MAX_WINDOW_CAPACITY, MAX_WINDOW_CAPACITY).unwrap();
        for _ in 0..MAX_WINDOW_CAPACITY {
            window.push(sample(2, 0.5, 30));
        }
        match window.verdict() {
            Verdict::Confirmed(c) => {
                assert_eq!(c.agreement, MAX_WINDOW_CAPACITY);
                assert_eq!(c.mean_latency, Duration::from_millis(30));
            }
            other => panic!("Expected confirmation, got {:?}", other),
        }
        assert!(ConfirmationWindow::with_policy(MAX_WINDOW_CAPACITY + 1, 1).is_err());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        assert!(ConfirmationWindow::with_policy(0, 0).is_err());
        assert!(ConfirmationWindow::with_policy(3, 4).is_err());
    }
}
