//! Label-retrieval state machine.
//!
//! Label generation is asynchronous on the carrier side: a batch of
//! tracking codes is submitted, a receipt comes back, and the PDF is
//! downloaded once generation finishes. The caller drives the machine:
//! sleep for `PollPolicy::delay_for(polls)`, poll the download endpoint,
//! feed the outcome to [`LabelState::advance`], repeat until terminal.
//!
//! `Submitted -> Polling { attempt } -> Ready | Expired`

use std::time::Duration;

use crate::carrier::types::LabelPdf;

/// Pacing for the download poll loop.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Polls before giving up.
    pub max_attempts: u32,
    /// Delay before the first poll.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every poll.
    pub backoff_factor: u32,
}

impl Default for PollPolicy {
    /// Five polls starting at one second, doubling each time (1s, 2s, 4s,
    /// 8s, 16s). The one-second start matches the carrier's typical
    /// generation latency for small batches.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }
}

impl PollPolicy {
    /// Delay before poll number `polls_done + 1`.
    #[must_use]
    pub fn delay_for(&self, polls_done: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.backoff_factor.saturating_pow(polls_done))
    }
}

/// State of one label-retrieval run.
#[derive(Debug, Clone)]
pub enum LabelState {
    /// Generation requested, nothing polled yet.
    Submitted,
    /// `attempt` polls have come back empty.
    Polling { attempt: u32 },
    /// The PDF arrived.
    Ready(LabelPdf),
    /// The retry budget ran out before the PDF arrived.
    Expired,
}

impl LabelState {
    /// Whether the run is finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Expired)
    }

    /// Polls performed so far, `None` once terminal.
    #[must_use]
    pub const fn polls_done(&self) -> Option<u32> {
        match self {
            Self::Submitted => Some(0),
            Self::Polling { attempt } => Some(*attempt),
            Self::Ready(_) | Self::Expired => None,
        }
    }

    /// Feed one poll outcome into the machine.
    ///
    /// `Some(pdf)` moves to `Ready`; an empty poll either increments the
    /// attempt counter or expires the run once `policy.max_attempts` polls
    /// have come back empty. Terminal states absorb further input.
    #[must_use]
    pub fn advance(self, outcome: Option<LabelPdf>, policy: &PollPolicy) -> Self {
        match (self, outcome) {
            (Self::Submitted | Self::Polling { .. }, Some(pdf)) => Self::Ready(pdf),
            (Self::Submitted, None) => Self::after_empty_poll(1, policy),
            (Self::Polling { attempt }, None) => Self::after_empty_poll(attempt + 1, policy),
            (terminal, _) => terminal,
        }
    }

    const fn after_empty_poll(polls_done: u32, policy: &PollPolicy) -> Self {
        if polls_done >= policy.max_attempts {
            Self::Expired
        } else {
            Self::Polling {
                attempt: polls_done,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> LabelPdf {
        LabelPdf {
            name: "rotulos.pdf".to_string(),
            data: "JVBERi0xLjQ=".to_string(),
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }

    #[test]
    fn ready_on_first_poll() {
        let state = LabelState::Submitted.advance(Some(pdf()), &policy(5));
        assert!(matches!(state, LabelState::Ready(_)));
    }

    #[test]
    fn empty_polls_count_up_then_expire() {
        let policy = policy(3);
        let state = LabelState::Submitted.advance(None, &policy);
        assert!(matches!(state, LabelState::Polling { attempt: 1 }));

        let state = state.advance(None, &policy);
        assert!(matches!(state, LabelState::Polling { attempt: 2 }));

        let state = state.advance(None, &policy);
        assert!(matches!(state, LabelState::Expired));
    }

    #[test]
    fn single_attempt_budget_expires_immediately() {
        let state = LabelState::Submitted.advance(None, &policy(1));
        assert!(matches!(state, LabelState::Expired));
    }

    #[test]
    fn pdf_mid_run_wins() {
        let policy = policy(5);
        let state = LabelState::Submitted.advance(None, &policy);
        let state = state.advance(Some(pdf()), &policy);
        assert!(matches!(state, LabelState::Ready(_)));
        assert!(state.is_terminal());
    }

    #[test]
    fn terminal_states_absorb_input() {
        let policy = policy(1);
        let state = LabelState::Expired.advance(Some(pdf()), &policy);
        assert!(matches!(state, LabelState::Expired));
    }

    #[test]
    fn polls_done_tracks_progress() {
        assert_eq!(LabelState::Submitted.polls_done(), Some(0));
        assert_eq!(LabelState::Polling { attempt: 2 }.polls_done(), Some(2));
        assert_eq!(LabelState::Expired.polls_done(), None);
    }

    #[test]
    fn delay_backs_off_exponentially() {
        let policy = policy(5);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }
}
