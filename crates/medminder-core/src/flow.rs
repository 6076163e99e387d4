//! Screen-flow state machine.
//!
//! The host renders whatever screen the machine is in. Every navigation is an
//! explicit [`FlowEvent`] resolved through [`transition`]; an event with no
//! entry for the current screen is refused and the screen does not change.
//!
//! ```text
//! Login ──IdentitySubmitted──▶ Capture ──CapturesReady──▶ Schedule ──SetAlarm──▶ Alarm
//!                                                          ▲   │                  │
//!                                                          │   └─OpenRisk─▶ Risk  │
//!                                                        Done               EvaluationResolved
//!                                                          │                      ▼
//!                         LogDetail ◀──SelectEntry── Log ◀─ViewLog──────────── Conflict
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Screens of the app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    Capture,
    Schedule,
    Alarm,
    Conflict,
    Log,
    LogDetail,
    Risk,
}

impl Screen {
    pub const ALL: [Screen; 8] = [
        Screen::Login,
        Screen::Capture,
        Screen::Schedule,
        Screen::Alarm,
        Screen::Conflict,
        Screen::Log,
        Screen::LogDetail,
        Screen::Risk,
    ];
}

/// Navigation events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowEvent {
    /// Login submitted, linked or explicitly unlinked
    IdentitySubmitted,
    /// At least one capture finished extraction
    CapturesReady,
    /// Alarm set on the first done medication
    SetAlarm,
    /// Symptom evaluation produced an outcome
    EvaluationResolved,
    Done,
    ViewLog,
    SelectEntry,
    Back,
    AddMore,
    OpenRisk,
    GoSchedule,
}

impl FlowEvent {
    pub const ALL: [FlowEvent; 11] = [
        FlowEvent::IdentitySubmitted,
        FlowEvent::CapturesReady,
        FlowEvent::SetAlarm,
        FlowEvent::EvaluationResolved,
        FlowEvent::Done,
        FlowEvent::ViewLog,
        FlowEvent::SelectEntry,
        FlowEvent::Back,
        FlowEvent::AddMore,
        FlowEvent::OpenRisk,
        FlowEvent::GoSchedule,
    ];
}

/// Flow and session usage errors. State is unchanged whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Event {event:?} is not allowed on screen {from:?}")]
    InvalidTransition { from: Screen, event: FlowEvent },

    #[error("{operation} is not available on screen {screen:?}")]
    NotAvailable {
        screen: Screen,
        operation: &'static str,
    },

    #[error("No medication is ready for an alarm")]
    NoActiveMedication,

    #[error("No capture has finished extraction")]
    NoCapturesReady,

    #[error("Identity field is blank: {0}")]
    MissingIdentityField(&'static str),

    #[error("No unmatched login is waiting to proceed")]
    NoPendingIdentity,

    #[error("Unknown log entry: {0}")]
    UnknownLogEntry(String),

    #[error("Unknown medication: {0}")]
    UnknownMedication(usize),

    #[error("Medication {medication} has no time slot {slot}")]
    UnknownTimeSlot { medication: usize, slot: usize },

    #[error("Not a clock time: {0}")]
    InvalidTime(String),
}

pub type FlowResult<T> = Result<T, FlowError>;

/// Target screen for an event, if the event is allowed. Guards are checked by the caller.
pub fn transition(from: Screen, event: FlowEvent) -> Option<Screen> {
    use FlowEvent::*;
    use Screen::*;

    let to = match (from, event) {
        (Login, IdentitySubmitted) => Capture,

        (Capture, CapturesReady) => Schedule,
        (Capture, Back) => Login,

        (Schedule, SetAlarm) => Alarm,
        (Schedule, AddMore) => Capture,
        (Schedule, Back) => Capture,
        (Schedule, OpenRisk) => Risk,

        (Alarm, EvaluationResolved) => Conflict,
        (Alarm, Back) => Schedule,

        (Conflict, Done) => Schedule,
        (Conflict, ViewLog) => Log,

        (Log, SelectEntry) => LogDetail,
        (Log, Back) | (Log, GoSchedule) => Schedule,
        (Log, AddMore) => Capture,
        (Log, OpenRisk) => Risk,

        (LogDetail, Back) => Log,

        (Risk, Back) | (Risk, GoSchedule) => Schedule,
        (Risk, AddMore) => Capture,

        _ => return None,
    };
    Some(to)
}

/// Tracks the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMachine {
    screen: Screen,
}

impl Default for FlowMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowMachine {
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Target of `event` without moving.
    pub fn peek(&self, event: FlowEvent) -> FlowResult<Screen> {
        transition(self.screen, event).ok_or(FlowError::InvalidTransition {
            from: self.screen,
            event,
        })
    }

    /// Apply `event`, returning the new screen.
    pub fn fire(&mut self, event: FlowEvent) -> FlowResult<Screen> {
        let to = self.peek(event)?;
        tracing::info!(from = ?self.screen, ?event, ?to, "Screen transition");
        self.screen = to;
        Ok(to)
    }
}
