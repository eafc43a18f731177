//! Per-user recommendation state: the current selection, the last result set and a loading
//! flag. Submissions are numbered so that a slow, superseded fetch can never overwrite the
//! result of a newer one.

use crate::domain::preference::{
    BalancePreference, BudgetChoice, LevelChoice, PlayStyle, PreferenceSelection,
};
use crate::domain::racket::RecommendedRacket;
use crate::engine::{FetchError, RecommendationEngine};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecommendationSession {
    pub selection: PreferenceSelection,
    pub results: Vec<RecommendedRacket>,
    pub is_loading: bool,
    pub error: Option<String>,
    latest_seq: u64,
}

/// Handed out by [`RecommendationSession::begin_submit`]; carries the selection as it was when
/// the submission started.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    pub seq: u64,
    pub selection: PreferenceSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    AlreadyLoading,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::AlreadyLoading => f.write_str("a recommendation request is already running"),
        }
    }
}

impl std::error::Error for SubmitRejected {}

impl RecommendationSession {
    pub fn new(selection: PreferenceSelection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn set_playstyle(&mut self, value: Option<PlayStyle>) {
        self.selection.set_playstyle(value);
    }

    pub fn set_balance(&mut self, value: Option<BalancePreference>) {
        self.selection.set_balance(value);
    }

    pub fn set_level(&mut self, value: Option<LevelChoice>) {
        self.selection.set_level(value);
    }

    pub fn set_budget(&mut self, value: Option<BudgetChoice>) {
        self.selection.set_budget(value);
    }

    pub fn begin_submit(&mut self) -> SubmitTicket {
        self.latest_seq += 1;
        self.is_loading = true;
        self.error = None;
        SubmitTicket {
            seq: self.latest_seq,
            selection: self.selection.clone(),
        }
    }

    /// Applies a finished fetch. Returns false, leaving the session untouched, when a newer
    /// submission has started since `ticket` was issued.
    pub fn finish_submit(
        &mut self,
        ticket: &SubmitTicket,
        outcome: Result<Vec<RecommendedRacket>, FetchError>,
    ) -> bool {
        if ticket.seq != self.latest_seq {
            tracing::debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "discarding stale recommendation result"
            );
            return false;
        }

        match outcome {
            Ok(results) => {
                self.results = results;
                self.error = None;
            }
            Err(err) => {
                self.results.clear();
                self.error = Some(err.to_string());
            }
        }
        self.is_loading = false;
        true
    }

    /// Ends a submission whose fetch never produced an outcome. Same staleness rule as
    /// [`finish_submit`](Self::finish_submit).
    pub fn abandon_submit(&mut self, ticket: &SubmitTicket, message: &str) -> bool {
        if ticket.seq != self.latest_seq {
            return false;
        }
        self.results.clear();
        self.error = Some(message.to_string());
        self.is_loading = false;
        true
    }
}

/// Runs one submission against a shared session. The fetch runs on its own task, so dropping
/// the returned future (a client hanging up) still lets the submission finish and clear the
/// loading flag. The session lock is not held across the fetch.
pub async fn run_submit(
    session: Arc<Mutex<RecommendationSession>>,
    engine: RecommendationEngine,
) -> Result<bool, SubmitRejected> {
    let ticket = {
        let mut s = session.lock().await;
        if s.is_loading {
            return Err(SubmitRejected::AlreadyLoading);
        }
        s.begin_submit()
    };

    let task_session = session.clone();
    let task_ticket = ticket.clone();
    let handle = tokio::spawn(async move {
        let outcome = engine.fetch_recommendations(&task_ticket.selection).await;
        task_session.lock().await.finish_submit(&task_ticket, outcome)
    });

    match handle.await {
        Ok(applied) => Ok(applied),
        Err(err) => {
            tracing::error!(seq = ticket.seq, error = %err, "recommendation task failed");
            Ok(session
                .lock()
                .await
                .abandon_submit(&ticket, "recommendation request failed, please try again"))
        }
    }
}
