// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timeout and retry bookkeeping for the single in-flight device packet.
//!
//! The tracker holds at most one outstanding record. The link writer stores
//! the sequence number after transmitting; the link reader polls
//! [`MessageTracker::timed_out`] on every socket wakeup to advance the retry
//! state machine.

use std::time::{Duration, Instant};

/// Outcome of a timeout poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Nothing is being tracked.
    NoMessage,
    /// The outstanding packet is still within its ack deadline.
    Waiting,
    /// The deadline expired and a retransmit attempt remains.
    TimedOut,
    /// The deadline expired with no attempts left; the packet is abandoned.
    TimedOutPermanently,
}

/// Single-slot ack tracker.
#[derive(Debug)]
pub struct MessageTracker {
    ack_timeout: Duration,
    max_retries: u32,
    sequence_no: Option<u32>,
    deadline: Instant,
    retries_left: u32,
}

impl MessageTracker {
    #[must_use]
    pub fn new(ack_timeout: Duration, max_retries: u32) -> Self {
        Self {
            ack_timeout,
            max_retries,
            sequence_no: None,
            deadline: Instant::now(),
            retries_left: 0,
        }
    }

    /// Track a freshly sent packet.
    ///
    /// Arms the deadline and resets the retry budget. Returns `false`
    /// without touching the slot when a packet is already tracked (the
    /// retransmit path re-sends the same sequence, which stays armed).
    pub fn store(&mut self, sequence_no: u32) -> bool {
        if self.sequence_no.is_some() {
            return false;
        }
        self.sequence_no = Some(sequence_no);
        self.deadline = Instant::now() + self.ack_timeout;
        self.retries_left = self.max_retries;
        true
    }

    /// Clear the slot if `sequence_no` matches the tracked packet.
    pub fn ack(&mut self, sequence_no: u32) -> bool {
        if self.sequence_no == Some(sequence_no) {
            self.sequence_no = None;
            true
        } else {
            false
        }
    }

    /// Advance the retry state machine.
    ///
    /// Each expired deadline consumes one retry and re-arms the deadline for
    /// the retransmit. When the budget is exhausted the slot reports
    /// [`Timeout::TimedOutPermanently`] exactly once and clears itself.
    pub fn timed_out(&mut self) -> Timeout {
        if self.sequence_no.is_none() {
            return Timeout::NoMessage;
        }
        if Instant::now() < self.deadline {
            return Timeout::Waiting;
        }
        if self.retries_left == 0 {
            self.sequence_no = None;
            return Timeout::TimedOutPermanently;
        }
        self.retries_left -= 1;
        self.deadline = Instant::now() + self.ack_timeout;
        Timeout::TimedOut
    }
}
