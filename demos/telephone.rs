//! Telephone demo: a call driven partly by a background "ringer" thread.
//!
//! Run with `RUST_LOG=solid_state=debug cargo run --example telephone` to see
//! the engine's own log lines next to the demo output.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use solid_state::core::{SolidState, StateContext, StateId};
use solid_state::error::StateError;
use solid_state::machine::SolidMachine;
use solid_state::state_ids;
use tracing_subscriber::EnvFilter;

state_ids! {
    pub enum Telephone {
        Idle,
        Ringing,
        Connected,
        OnHold,
        Voicemail,
        Audio,
        Video,
        Summary,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    IncomingCall,
    Answer,
    Timeout,
    Hold,
    Resume,
    HangUp,
    StartConference,
    EndAudio,
    EndVideo,
    Finish,
}

/// Host context shared with every state.
struct Line {
    owner: &'static str,
}

type Ctx<'a> = StateContext<'a, Telephone, Event, Line>;

/// Prints entries and exits.
struct Announce(Telephone);

impl SolidState<Telephone, Event, Line> for Announce {
    fn entering(&mut self, context: &Ctx<'_>) -> Result<(), StateError> {
        let owner = context.data().map_or("nobody", |line| line.owner);
        println!("[{owner}] -> {}", self.0.name());
        Ok(())
    }

    fn exiting(&mut self, _context: &Ctx<'_>) -> Result<(), StateError> {
        println!("        <- {}", self.0.name());
        Ok(())
    }
}

/// Voicemail greets the caller and hangs up by itself.
struct Greeting;

impl SolidState<Telephone, Event, Line> for Greeting {
    fn entering(&mut self, context: &Ctx<'_>) -> Result<(), StateError> {
        println!("        \"please leave a message\"");
        context.trigger(Event::HangUp)?;
        Ok(())
    }
}

fn build() -> solid_state::Result<SolidMachine<Telephone, Event, Line>> {
    let phone = SolidMachine::with_context(Line { owner: "alice" });

    for state in [
        Telephone::Idle,
        Telephone::Ringing,
        Telephone::Connected,
        Telephone::OnHold,
        Telephone::Audio,
        Telephone::Video,
        Telephone::Summary,
    ] {
        phone.state_with(state, move || Announce(state))?;
    }
    phone.state_with(Telephone::Voicemail, || Greeting)?;

    phone
        .state(Telephone::Idle)?
        .on(Event::IncomingCall)?
        .goes_to(Telephone::Ringing)?;
    phone
        .state(Telephone::Ringing)?
        .on(Event::Answer)?
        .goes_to(Telephone::Connected)?
        .on(Event::Timeout)?
        .goes_to(Telephone::Voicemail)?
        .on(Event::HangUp)?
        .goes_to(Telephone::Idle)?;
    phone
        .state(Telephone::Voicemail)?
        .on(Event::HangUp)?
        .goes_to(Telephone::Idle)?;
    phone
        .state(Telephone::Connected)?
        .on(Event::Hold)?
        .goes_to(Telephone::OnHold)?
        .on(Event::HangUp)?
        .goes_to(Telephone::Idle)?
        .on(Event::StartConference)?
        .forks_to(Telephone::Audio, Telephone::Video)?;
    phone
        .state(Telephone::OnHold)?
        .on(Event::Resume)?
        .goes_to(Telephone::Connected)?
        .on(Event::HangUp)?
        .goes_to(Telephone::Idle)?;
    phone
        .state(Telephone::Audio)?
        .on(Event::EndAudio)?
        .joins_to(Telephone::Summary)?;
    phone
        .state(Telephone::Video)?
        .on(Event::EndVideo)?
        .joins_to(Telephone::Summary)?;
    phone
        .state(Telephone::Summary)?
        .on(Event::Finish)?
        .goes_to(Telephone::Connected)?;

    phone.on_invalid_trigger(|state, event| {
        println!("        ({event:?} means nothing in {})", state.name());
    });
    Ok(phone)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let phone = Arc::new(build()?);
    phone.start()?;

    // A caller nobody answers: the ringer thread times out into voicemail,
    // which hangs up from inside its own callback.
    let ringer = {
        let phone = Arc::clone(&phone);
        thread::spawn(move || -> solid_state::Result<()> {
            phone.trigger(Event::IncomingCall)?;
            thread::sleep(Duration::from_millis(50));
            phone.trigger(Event::Timeout)
        })
    };
    ringer
        .join()
        .map_err(|_| "ringer thread panicked")??;
    println!("history: {:?}", phone.state_history());

    // A call that is answered, held, and turned into a conference.
    phone.trigger(Event::IncomingCall)?;
    phone.trigger(Event::Answer)?;
    phone.trigger(Event::Hold)?;
    phone.go_back()?;
    phone.trigger(Event::Resume)?;
    phone.trigger(Event::StartConference)?;
    println!("in parallel: {:?}", phone.current_states());

    phone.trigger(Event::EndVideo)?;
    phone.trigger(Event::Hold)?;
    phone.trigger(Event::EndAudio)?;
    phone.trigger(Event::Finish)?;
    phone.trigger(Event::HangUp)?;

    println!("{}", serde_json::to_string_pretty(&phone.snapshot())?);
    phone.stop()?;
    Ok(())
}
