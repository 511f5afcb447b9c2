//! Load-more state machine
//!
//! A closed enum plus an explicit transition table. Transitions that are not
//! in the table are rejected and logged; the current state is left as is.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use super::error::PaginationError;

const HISTORY_CAPACITY: usize = 64;

/// State of the (single) load-more operation of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LoadMoreState {
    #[default]
    Idle,
    LoadingServer,
    LoadingClient,
    AutoFetching,
    Complete,
    Error,
}

impl LoadMoreState {
    /// Whether an operation is currently in flight
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            LoadMoreState::LoadingServer | LoadMoreState::LoadingClient | LoadMoreState::AutoFetching
        )
    }
}

/// One entry of the transition log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: LoadMoreState,
    pub to: LoadMoreState,
    pub context: String,
    pub at: DateTime<Utc>,
}

/// Manages the load-more state and its transition history
#[derive(Debug, Clone, Default)]
pub struct LoadMoreStateMachine {
    state: LoadMoreState,
    history: VecDeque<TransitionRecord>,
}

impl LoadMoreStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadMoreState {
        self.state
    }

    /// The transition table
    pub fn can_transition(current: LoadMoreState, target: LoadMoreState) -> bool {
        use LoadMoreState::*;

        matches!(
            (current, target),
            (Idle, LoadingServer)
                | (Idle, LoadingClient)
                | (LoadingServer, Complete)
                | (LoadingServer, Error)
                | (LoadingClient, Complete)
                | (LoadingClient, Error)
                | (LoadingClient, AutoFetching)
                | (AutoFetching, Complete)
                | (AutoFetching, Error)
                | (Complete, Idle)
                | (Error, Idle)
        )
    }

    /// Move to `target`, recording the transition.
    pub fn transition(
        &mut self,
        target: LoadMoreState,
        context: &str,
    ) -> Result<LoadMoreState, PaginationError> {
        let current = self.state;
        if !Self::can_transition(current, target) {
            tracing::warn!(%current, %target, context, "rejected load-more transition");
            return Err(PaginationError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        tracing::debug!(%current, %target, context, "load-more transition");
        self.state = target;
        self.record(current, target, context);
        Ok(target)
    }

    /// Re-initialise to `idle`. Not a transition; recorded as a reset entry.
    pub fn reset(&mut self, context: &str) {
        let current = self.state;
        if current.is_busy() {
            tracing::debug!(%current, context, "abandoning in-flight load-more");
        }
        self.state = LoadMoreState::Idle;
        self.record(current, LoadMoreState::Idle, &format!("reset: {context}"));
    }

    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> + '_ {
        self.history.iter()
    }

    fn record(&mut self, from: LoadMoreState, to: LoadMoreState, context: &str) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(TransitionRecord {
            from,
            to,
            context: context.to_string(),
            at: Utc::now(),
        });
    }
}
