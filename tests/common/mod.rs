//! Shared test helpers for solid-state integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use solid_state::core::{SolidState, StateContext, StateId, TriggerValue};
use solid_state::error::StateError;
use solid_state::machine::{SolidMachine, Transitioned};
use solid_state::state_ids;

state_ids! {
    /// States of a telephone, including a conference fork.
    pub enum Phone {
        Idle,
        Ringing,
        Connected,
        OnHold,
        Voicemail,
        Conference,
        Audio,
        Video,
        Recording,
        Summary,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    IncomingCall,
    Answer,
    HangUp,
    Hold,
    Resume,
    Timeout,
    StartConference,
    EndAudio,
    EndVideo,
    EndRecording,
    Finish,
}

/// Shared, ordered record of callback activity.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// State that writes `enter <name>` / `exit <name>` into a journal.
pub struct Recorder<S> {
    state: S,
    journal: Journal,
}

impl<S: StateId, T: TriggerValue, C: Send + Sync + 'static> SolidState<S, T, C> for Recorder<S> {
    fn entering(&mut self, _context: &StateContext<'_, S, T, C>) -> Result<(), StateError> {
        self.journal.lock().push(format!("enter {}", self.state.name()));
        Ok(())
    }

    fn exiting(&mut self, _context: &StateContext<'_, S, T, C>) -> Result<(), StateError> {
        self.journal.lock().push(format!("exit {}", self.state.name()));
        Ok(())
    }
}

/// Factory producing journaling instances for `state`.
pub fn recorder<S: StateId>(journal: &Journal, state: S) -> impl Fn() -> Recorder<S> + Send + Sync + 'static {
    let journal = journal.clone();
    move || Recorder {
        state,
        journal: journal.clone(),
    }
}

/// Declare every listed state with a journaling factory.
pub fn record_all<S, T, C>(machine: &SolidMachine<S, T, C>, journal: &Journal, states: &[S])
where
    S: StateId,
    T: TriggerValue,
    C: Send + Sync + 'static,
{
    for &state in states {
        machine
            .state_with(state, recorder(journal, state))
            .expect("declare state");
    }
}

/// Subscribe to transition notifications.
pub fn transitions<S, T, C>(machine: &SolidMachine<S, T, C>) -> Arc<Mutex<Vec<Transitioned<S>>>>
where
    S: StateId,
    T: TriggerValue,
    C: Send + Sync + 'static,
{
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    machine.on_transitioned(move |event| sink.lock().push(*event));
    events
}

/// Targets of the recorded notifications, skipping stop exits.
pub fn entered<S: StateId>(events: &Arc<Mutex<Vec<Transitioned<S>>>>) -> Vec<S> {
    events.lock().iter().filter_map(|event| event.target).collect()
}

/// Install a test-friendly tracing subscriber once per binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The telephone used by most tests:
///
/// ```text
/// Idle --IncomingCall--> Ringing --Answer--> Connected --Hold--> OnHold
///   ^                      |  \--Timeout--> Voicemail          |
///   +------HangUp----------+---------------------------<-Resume+
/// ```
pub fn telephone(journal: &Journal) -> SolidMachine<Phone, Call> {
    let machine = SolidMachine::new();
    record_all(
        &machine,
        journal,
        &[
            Phone::Idle,
            Phone::Ringing,
            Phone::Connected,
            Phone::OnHold,
            Phone::Voicemail,
        ],
    );

    machine
        .state(Phone::Idle)
        .and_then(|s| s.on(Call::IncomingCall))
        .and_then(|t| t.goes_to(Phone::Ringing))
        .expect("configure Idle");
    machine
        .state(Phone::Ringing)
        .and_then(|s| s.on(Call::Answer))
        .and_then(|t| t.goes_to(Phone::Connected))
        .and_then(|s| s.on(Call::Timeout))
        .and_then(|t| t.goes_to(Phone::Voicemail))
        .and_then(|s| s.on(Call::HangUp))
        .and_then(|t| t.goes_to(Phone::Idle))
        .expect("configure Ringing");
    machine
        .state(Phone::Connected)
        .and_then(|s| s.on(Call::Hold))
        .and_then(|t| t.goes_to(Phone::OnHold))
        .and_then(|s| s.on(Call::HangUp))
        .and_then(|t| t.goes_to(Phone::Idle))
        .expect("configure Connected");
    machine
        .state(Phone::OnHold)
        .and_then(|s| s.on(Call::Resume))
        .and_then(|t| t.goes_to(Phone::Connected))
        .and_then(|s| s.on(Call::HangUp))
        .and_then(|t| t.goes_to(Phone::Idle))
        .expect("configure OnHold");
    machine
        .state(Phone::Voicemail)
        .and_then(|s| s.on(Call::HangUp))
        .and_then(|t| t.goes_to(Phone::Idle))
        .expect("configure Voicemail");
    machine
}
