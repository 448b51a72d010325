use std::fmt;

use playbacker_protocol::{PlayerState, Song, Tempo};

use crate::{api::Remote, error::Error};

/// A playback mutation.  The server answers each with the new authoritative
/// `PlayerState`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PlayerAction {
    TogglePlaying { tempo: Tempo },
    ToggleGuideEnabled,
    PrepareForSwitch,
    Reset,
}

impl PlayerAction {
    pub fn run(&self, remote: &dyn Remote) -> Result<PlayerState, Error> {
        match self {
            Self::TogglePlaying { tempo } => remote.toggle_playing(tempo),
            Self::ToggleGuideEnabled => remote.toggle_guide_enabled(),
            Self::PrepareForSwitch => remote.prepare_for_switch(),
            Self::Reset => remote.reset(),
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TogglePlaying { .. } => f.write_str("toggle playing"),
            Self::ToggleGuideEnabled => f.write_str("toggle guide"),
            Self::PrepareForSwitch => f.write_str("prepare for switch"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

/// Owner of the local `playing` / `guide_enabled` flags.  The flags change
/// only by being replaced with a server response, never by guessing the
/// outcome of a request.
///
/// Calls are neither deduplicated nor queued.  Two toggles issued before the
/// first one is answered both reach the server, and their answers are applied
/// in the order they arrive.
#[derive(Debug, Default)]
pub struct Reconciler {
    state: PlayerState,
    in_flight: usize,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn playing(&self) -> bool {
        self.state.playing
    }

    pub fn guide_enabled(&self) -> bool {
        self.state.guide_enabled
    }

    /// Number of issued actions still waiting for an answer.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Toggling needs the tempo of the active song; without one nothing is
    /// sent.
    pub fn toggle_playing(&mut self, song: Option<&Song>) -> Option<PlayerAction> {
        let tempo = song?.tempo;
        Some(self.issue(PlayerAction::TogglePlaying { tempo }))
    }

    pub fn toggle_guide_enabled(&mut self) -> PlayerAction {
        self.issue(PlayerAction::ToggleGuideEnabled)
    }

    pub fn prepare_for_switch(&mut self) -> PlayerAction {
        self.issue(PlayerAction::PrepareForSwitch)
    }

    pub fn reset(&mut self) -> PlayerAction {
        self.issue(PlayerAction::Reset)
    }

    fn issue(&mut self, action: PlayerAction) -> PlayerAction {
        self.in_flight += 1;
        action
    }

    /// Take the server's answer to `action`.  On error the last known state
    /// is kept and the error is handed back for reporting.
    pub fn receive(
        &mut self,
        action: &PlayerAction,
        result: Result<PlayerState, Error>,
    ) -> Result<PlayerState, Error> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(state) => {
                log::info!("{}: {:?}", action, state);
                self.state = state;
                Ok(state)
            }
            Err(err) => {
                log::error!("{} failed: {}", action, err);
                Err(err)
            }
        }
    }
}
