use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use super::error::{ClassificationError, EngineResult};
use super::questionnaire::{ItemBank, Questionnaire, QuestionnaireItem};
use super::resolver::resolve_with_tally;
use super::store::ClassificationStore;
use super::types::{
    AgeBand, ClassificationResult, LearnerClassificationRecord, QuestionnaireProgress, StyleTally,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
    Resolved,
    Confirmed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Collecting => "COLLECTING",
            SessionState::Resolved => "RESOLVED",
            SessionState::Confirmed => "CONFIRMED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub reason: String,
    pub timestamp_ms: u64,
}

const HISTORY_LIMIT: usize = 100;

#[derive(Debug)]
pub struct SessionStateMachine {
    current: SessionState,
    history: Vec<StateTransition>,
    change_count: u64,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current: SessionState::Idle,
            history: Vec::new(),
            change_count: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.current
    }

    pub fn state_change_count(&self) -> u64 {
        self.change_count
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn can_transition_to(&self, target: SessionState) -> bool {
        matches!(
            (self.current, target),
            (SessionState::Idle, SessionState::Collecting)
                | (SessionState::Collecting, SessionState::Idle)
                | (SessionState::Collecting, SessionState::Resolved)
                | (SessionState::Resolved, SessionState::Collecting)
                | (SessionState::Resolved, SessionState::Idle)
                | (SessionState::Resolved, SessionState::Confirmed)
                | (SessionState::Confirmed, SessionState::Idle)
        )
    }

    pub fn transition_to(
        &mut self,
        target: SessionState,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.can_transition_to(target) {
            return Err(TransitionError::InvalidTransition {
                from: self.current,
                to: target,
            });
        }

        let transition = StateTransition {
            from: self.current,
            to: target,
            reason: reason.into(),
            timestamp_ms: now_ms(),
        };

        self.current = target;
        self.change_count = self.change_count.saturating_add(1);
        self.history.push(transition);

        if self.history.len() > HISTORY_LIMIT {
            let extra = self.history.len() - HISTORY_LIMIT;
            self.history.drain(0..extra);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Drives one learner's questionnaire from first answer to confirmed record.
///
/// A session holds the store's session claim from `start_session` until it
/// returns to Idle, so two controllers sharing a store cannot collect at once.
#[derive(Debug)]
pub struct SessionController {
    store: Arc<ClassificationStore>,
    questionnaire: Questionnaire,
    machine: SessionStateMachine,
    resolved: Option<(ClassificationResult, StyleTally)>,
    selected_age_band: Option<AgeBand>,
}

impl SessionController {
    pub fn new(store: Arc<ClassificationStore>, bank: Arc<ItemBank>) -> Self {
        Self {
            store,
            questionnaire: Questionnaire::new(bank),
            machine: SessionStateMachine::new(),
            resolved: None,
            selected_age_band: None,
        }
    }

    pub fn store(&self) -> &Arc<ClassificationStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn history(&self) -> &[StateTransition] {
        self.machine.history()
    }

    pub fn item_bank(&self) -> &[QuestionnaireItem] {
        self.questionnaire.item_bank()
    }

    pub fn progress(&self) -> QuestionnaireProgress {
        self.questionnaire.progress()
    }

    pub fn next_item(&self) -> Option<&QuestionnaireItem> {
        match self.state() {
            SessionState::Collecting => self.questionnaire.next_unanswered(),
            _ => None,
        }
    }

    pub fn start_session(&mut self) -> EngineResult<()> {
        match self.state() {
            SessionState::Collecting | SessionState::Resolved => {
                return Err(ClassificationError::SessionActive)
            }
            SessionState::Idle | SessionState::Confirmed => {}
        }
        if !self.store.try_claim_session() {
            tracing::debug!("classification session refused, store already has one open");
            return Err(ClassificationError::SessionActive);
        }

        self.questionnaire.clear();
        if let Err(err) = self
            .machine
            .transition_to(SessionState::Collecting, "session started")
        {
            self.store.release_session();
            return Err(err.into());
        }
        tracing::info!(items = self.questionnaire.bank().len(), "classification session started");
        Ok(())
    }

    /// Records an answer. Returns the result once the last item is answered.
    pub fn record_answer(
        &mut self,
        item_id: &str,
        option_id: &str,
    ) -> EngineResult<Option<ClassificationResult>> {
        self.require(SessionState::Collecting, "record_answer")?;
        self.questionnaire.record_answer(item_id, option_id)?;

        if !self.questionnaire.is_complete() {
            return Ok(None);
        }

        let (result, tally) = resolve_with_tally(
            self.questionnaire.bank(),
            self.questionnaire.responses(),
        )?;
        self.machine
            .transition_to(SessionState::Resolved, "all items answered")?;
        self.resolved = Some((result, tally));

        tracing::info!(
            style = %result.style,
            confidence = result.confidence,
            "classification resolved"
        );
        Ok(Some(result))
    }

    pub fn resolved(&self) -> Option<ClassificationResult> {
        match self.state() {
            SessionState::Resolved => self.resolved.map(|(result, _)| result),
            _ => None,
        }
    }

    pub fn tally(&self) -> Option<StyleTally> {
        match self.state() {
            SessionState::Resolved => self.resolved.map(|(_, tally)| tally),
            _ => None,
        }
    }

    pub fn select_age_band(&mut self, age_band: AgeBand) -> EngineResult<()> {
        self.require(SessionState::Resolved, "select_age_band")?;
        self.selected_age_band = Some(age_band);
        Ok(())
    }

    /// Goes back from a resolved result to change answers. Prior answers are
    /// kept; an age band picked for the old result is dropped.
    pub fn revise(&mut self) -> EngineResult<()> {
        self.require(SessionState::Resolved, "revise")?;
        self.machine
            .transition_to(SessionState::Collecting, "revising answers")?;
        self.resolved = None;
        self.selected_age_band = None;
        Ok(())
    }

    /// Persists the resolved classification and ends the session.
    ///
    /// The age band is `age_band`, else the one picked with
    /// [`select_age_band`](Self::select_age_band), else the store's current band.
    pub async fn confirm(
        &mut self,
        age_band: Option<AgeBand>,
    ) -> EngineResult<LearnerClassificationRecord> {
        self.require(SessionState::Resolved, "confirm")?;
        let Some((result, _)) = self.resolved else {
            return Err(ClassificationError::InvalidState {
                operation: "confirm",
                state: self.state(),
            });
        };

        let age_band = match age_band.or(self.selected_age_band) {
            Some(band) => band,
            None => self.store.load().await.age_band,
        };

        self.machine
            .transition_to(SessionState::Confirmed, "classification confirmed")?;
        let record = LearnerClassificationRecord::from_result(result, age_band);
        self.store.save(record).await;

        self.enter_idle("session complete")?;
        Ok(record)
    }

    /// Abandons the current session. Persisted state is untouched.
    pub fn cancel(&mut self) -> EngineResult<()> {
        match self.state() {
            // Confirmed always moves on to Idle inside `confirm`.
            SessionState::Idle | SessionState::Confirmed => Ok(()),
            SessionState::Collecting | SessionState::Resolved => {
                self.enter_idle("session cancelled")?;
                tracing::info!("classification session cancelled");
                Ok(())
            }
        }
    }

    /// Cancels any session and clears the stored classification.
    pub async fn reset(&mut self) -> EngineResult<LearnerClassificationRecord> {
        self.cancel()?;
        Ok(self.store.reset().await)
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> EngineResult<()> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(ClassificationError::InvalidState { operation, state })
        }
    }

    fn enter_idle(&mut self, reason: &str) -> EngineResult<()> {
        self.machine.transition_to(SessionState::Idle, reason)?;
        self.store.release_session();
        self.questionnaire.clear();
        self.resolved = None;
        self.selected_age_band = None;
        Ok(())
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if matches!(
            self.state(),
            SessionState::Collecting | SessionState::Resolved | SessionState::Confirmed
        ) {
            tracing::debug!(state = self.state().as_str(), "open session dropped");
            self.store.release_session();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_allows_documented_transitions() {
        let mut sm = SessionStateMachine::new();
        assert!(sm.transition_to(SessionState::Collecting, "start").is_ok());
        assert!(sm.transition_to(SessionState::Resolved, "done").is_ok());
        assert!(sm.transition_to(SessionState::Collecting, "revise").is_ok());
        assert!(sm.transition_to(SessionState::Idle, "cancel").is_ok());
        assert_eq!(sm.state_change_count(), 4);
        assert_eq!(sm.history().len(), 4);
        assert_eq!(sm.history()[3].from, SessionState::Collecting);
        assert_eq!(sm.history()[3].reason, "cancel");
    }

    #[test]
    fn state_machine_rejects_shortcuts() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(
            sm.transition_to(SessionState::Confirmed, "skip"),
            Err(TransitionError::InvalidTransition {
                from: SessionState::Idle,
                to: SessionState::Confirmed,
            })
        );
        assert!(!sm.can_transition_to(SessionState::Resolved));
        assert_eq!(sm.state(), SessionState::Idle);
        assert!(sm.history().is_empty());
    }

    #[test]
    fn history_is_bounded() {
        let mut sm = SessionStateMachine::new();
        for _ in 0..80 {
            sm.transition_to(SessionState::Collecting, "start").unwrap();
            sm.transition_to(SessionState::Idle, "cancel").unwrap();
        }
        assert_eq!(sm.history().len(), HISTORY_LIMIT);
        assert_eq!(sm.state_change_count(), 160);
    }

    fn controller() -> SessionController {
        SessionController::new(
            Arc::new(ClassificationStore::in_memory()),
            Arc::new(ItemBank::reference()),
        )
    }

    fn answer_all(controller: &mut SessionController, option: &str) -> Option<ClassificationResult> {
        let ids: Vec<String> = controller.item_bank().iter().map(|i| i.id.clone()).collect();
        let mut last = None;
        for id in ids {
            last = controller.record_answer(&id, option).unwrap();
        }
        last
    }

    #[test]
    fn answers_rejected_while_idle() {
        let mut c = controller();
        assert_eq!(
            c.record_answer("q1", "visual"),
            Err(ClassificationError::InvalidState {
                operation: "record_answer",
                state: SessionState::Idle,
            })
        );
    }

    #[test]
    fn completion_moves_to_resolved() {
        let mut c = controller();
        c.start_session().unwrap();
        assert_eq!(c.next_item().map(|i| i.id.as_str()), Some("q1"));
        let result = answer_all(&mut c, "auditory").unwrap();
        assert_eq!(c.state(), SessionState::Resolved);
        assert_eq!(c.resolved(), Some(result));
        assert_eq!(result.confidence, 100);
        assert_eq!(c.tally().map(|t| t.auditory), Some(8));
        assert!(c.next_item().is_none());
    }

    #[test]
    fn second_session_is_refused() {
        let mut c = controller();
        c.start_session().unwrap();
        assert_eq!(c.start_session(), Err(ClassificationError::SessionActive));
        answer_all(&mut c, "visual");
        assert_eq!(c.start_session(), Err(ClassificationError::SessionActive));
    }

    #[test]
    fn revise_keeps_answers_and_re_resolves() {
        let mut c = controller();
        c.start_session().unwrap();
        answer_all(&mut c, "visual");
        c.revise().unwrap();
        assert_eq!(c.state(), SessionState::Collecting);
        assert!(c.resolved().is_none());
        assert!(c.progress().is_complete());

        let result = c.record_answer("q1", "kinesthetic").unwrap().unwrap();
        assert_eq!(c.state(), SessionState::Resolved);
        assert_eq!(result.confidence, 88);
    }

    #[test]
    fn revise_drops_selected_age_band() {
        let mut c = controller();
        c.start_session().unwrap();
        answer_all(&mut c, "visual");
        c.select_age_band(AgeBand::Adult).unwrap();
        c.revise().unwrap();
        c.record_answer("q1", "auditory").unwrap();
        assert_eq!(c.selected_age_band, None);
    }

    #[test]
    fn cancel_releases_store_session() {
        let mut c = controller();
        c.start_session().unwrap();
        assert!(c.store().has_open_session());
        c.cancel().unwrap();
        assert!(!c.store().has_open_session());
        c.start_session().unwrap();
    }

    #[test]
    fn dropping_open_controller_releases_store_session() {
        let store = Arc::new(ClassificationStore::in_memory());
        let bank = Arc::new(ItemBank::reference());
        let mut first = SessionController::new(Arc::clone(&store), Arc::clone(&bank));
        first.start_session().unwrap();
        drop(first);

        let mut second = SessionController::new(store, bank);
        assert!(second.start_session().is_ok());
    }

    #[test]
    fn cancel_discards_answers() {
        let mut c = controller();
        c.start_session().unwrap();
        c.record_answer("q1", "visual").unwrap();
        c.cancel().unwrap();
        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.progress().answered, 0);
        c.cancel().unwrap();
    }

    #[test]
    fn select_age_band_requires_result() {
        let mut c = controller();
        c.start_session().unwrap();
        assert!(matches!(
            c.select_age_band(AgeBand::Adult),
            Err(ClassificationError::InvalidState { .. })
        ));
    }
}
