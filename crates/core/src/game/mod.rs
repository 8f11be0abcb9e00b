//! Answer state machines, one per task kind.
//!
//! Every machine follows the same lifecycle: `Presenting` → `Collecting` →
//! (complete answer, validated synchronously) → `ResolvedCorrect` or
//! `ResolvedIncorrect` → `Finished`. Machines never block and never sleep;
//! delays are handed to the caller as [`Effect::Schedule`] and come back
//! through [`AnswerMachine::fire`]. [`Effect::Complete`] is emitted at most
//! once per machine instance.

mod choice;
mod drag;
mod pairing;
mod placement;
mod sequence;
mod timer;

use std::time::Duration;

use rand::Rng;

use crate::model::{Task, TaskId, TaskKind, TaskPayload, Verdict};

pub use choice::ChoiceGame;
pub use drag::{Drag, DragState, Dropped};
pub use pairing::PairingGame;
pub use placement::PlacementGame;
pub use sequence::SequenceGame;
pub use timer::{Timer, TimerToken};

//
// ─── INPUT ─────────────────────────────────────────────────────────────────────
//

/// Screen position reported by pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Logical on-screen element an event is attributed to.
///
/// Indices refer to the order a machine exposes its elements in
/// (shuffled pools for sequence, pairing rights and placement items).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Option(usize),
    Left(usize),
    Right(usize),
    Item(usize),
    Slot(usize),
}

/// Input event delivered by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Tap/click on an element.
    Select(Target),
    PointerDown { target: Target, at: Point },
    PointerMove { at: Point },
    /// Pointer released; `over` is the element under the pointer, if any.
    PointerUp { over: Option<Target>, at: Point },
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

/// Audio feedback cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Correct,
    Wrong,
}

impl From<Verdict> for Cue {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Correct => Cue::Correct,
            Verdict::Incorrect => Cue::Wrong,
        }
    }
}

/// Side effect requested by a machine; the caller performs it.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak(String),
    Cue(Cue),
    /// Call `fire(timer.token)` once `timer.delay` has elapsed.
    Schedule(Timer),
    /// Final verdict of this attempt cycle.
    Complete(Verdict),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Presenting,
    Collecting,
    /// Correct answer shown; completion is pending.
    ResolvedCorrect,
    /// Wrong answer shown; completion or reset is pending.
    ResolvedIncorrect,
    /// Completion emitted.
    Finished,
    /// Torn down before finishing.
    Cancelled,
}

impl Phase {
    /// True while the machine reacts to user input.
    #[must_use]
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::Presenting | Phase::Collecting)
    }
}

/// Fixed feedback delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Between a resolved answer and the completion.
    pub complete_delay: Duration,
    /// How long a wrong pairing stays highlighted.
    pub wrong_flash: Duration,
    /// Before a failed placement clears its slots.
    pub retry_reset: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            complete_delay: Duration::from_millis(500),
            wrong_flash: Duration::from_millis(600),
            retry_reset: Duration::from_millis(1200),
        }
    }
}

//
// ─── MACHINE INTERFACE ─────────────────────────────────────────────────────────
//

/// Shared interface of the answer state machines.
pub trait AnswerMachine {
    fn task_id(&self) -> &TaskId;

    /// Enter the task; announces the prompt.
    fn present(&mut self) -> Vec<Effect>;

    fn handle_input(&mut self, input: Input) -> Vec<Effect>;

    /// A previously scheduled delay elapsed. Unknown or cancelled tokens are ignored.
    fn fire(&mut self, token: TimerToken) -> Vec<Effect>;

    fn phase(&self) -> Phase;

    /// Every required slot of the answer is filled.
    fn is_complete(&self) -> bool;

    /// Drop pending delays; the machine will never complete afterwards.
    fn cancel(&mut self);
}

/// A running task attempt, dispatched by task kind.
#[derive(Debug, Clone)]
pub enum Game {
    Choice(ChoiceGame),
    Sequence(SequenceGame),
    Pairing(PairingGame),
    Placement(PlacementGame),
}

impl Game {
    /// Build the machine for `task`, shuffling pools with `rng`.
    pub fn new<R: Rng + ?Sized>(task: &Task, timings: Timings, rng: &mut R) -> Self {
        match task.payload() {
            TaskPayload::Choice { options, answer } => {
                Game::Choice(ChoiceGame::new(task, options, answer, timings))
            }
            TaskPayload::Sequence { items } => {
                Game::Sequence(SequenceGame::new(task, items, timings, rng))
            }
            TaskPayload::Pairing { pairs } => {
                Game::Pairing(PairingGame::new(task, pairs, timings, rng))
            }
            TaskPayload::Placement { items, answer, .. } => {
                Game::Placement(PlacementGame::new(task, items, answer, timings, rng))
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> TaskKind {
        match self {
            Game::Choice(_) => TaskKind::Choice,
            Game::Sequence(_) => TaskKind::Sequence,
            Game::Pairing(_) => TaskKind::Pairing,
            Game::Placement(_) => TaskKind::Placement,
        }
    }

    fn machine(&self) -> &dyn AnswerMachine {
        match self {
            Game::Choice(g) => g,
            Game::Sequence(g) => g,
            Game::Pairing(g) => g,
            Game::Placement(g) => g,
        }
    }

    fn machine_mut(&mut self) -> &mut dyn AnswerMachine {
        match self {
            Game::Choice(g) => g,
            Game::Sequence(g) => g,
            Game::Pairing(g) => g,
            Game::Placement(g) => g,
        }
    }
}

impl AnswerMachine for Game {
    fn task_id(&self) -> &TaskId {
        self.machine().task_id()
    }

    fn present(&mut self) -> Vec<Effect> {
        self.machine_mut().present()
    }

    fn handle_input(&mut self, input: Input) -> Vec<Effect> {
        self.machine_mut().handle_input(input)
    }

    fn fire(&mut self, token: TimerToken) -> Vec<Effect> {
        self.machine_mut().fire(token)
    }

    fn phase(&self) -> Phase {
        self.machine().phase()
    }

    fn is_complete(&self) -> bool {
        self.machine().is_complete()
    }

    fn cancel(&mut self) {
        self.machine_mut().cancel();
    }
}

/// Test helpers shared by the machine modules.
#[cfg(test)]
pub(crate) mod testing {
    use super::{AnswerMachine, Effect, TimerToken};
    use crate::model::Verdict;

    /// Tokens of every `Schedule` effect, in order.
    pub fn scheduled(effects: &[Effect]) -> Vec<TimerToken> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Schedule(t) => Some(t.token),
                _ => None,
            })
            .collect()
    }

    pub fn completions(effects: &[Effect]) -> Vec<Verdict> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Complete(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Fire every scheduled timer (and any timers those schedule) until quiet.
    pub fn drain<M: AnswerMachine>(machine: &mut M, effects: Vec<Effect>) -> Vec<Effect> {
        let mut all = Vec::new();
        let mut queue = scheduled(&effects);
        all.extend(effects);
        while let Some(token) = queue.first().copied() {
            queue.remove(0);
            let more = machine.fire(token);
            queue.extend(scheduled(&more));
            all.extend(more);
        }
        all
    }
}
