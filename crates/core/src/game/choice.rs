use crate::model::{Task, TaskId, Verdict};

use super::timer::Deferrals;
use super::{AnswerMachine, Cue, Effect, Input, Phase, Target, TimerToken, Timings};

#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Complete(Verdict),
}

/// Pick-the-answer: the first selection decides, no retry.
#[derive(Debug, Clone)]
pub struct ChoiceGame {
    task_id: TaskId,
    prompt: String,
    options: Vec<String>,
    answer: String,
    timings: Timings,
    phase: Phase,
    picked: Option<usize>,
    deferred: Deferrals<Deferred>,
}

impl ChoiceGame {
    pub(crate) fn new(task: &Task, options: &[String], answer: &str, timings: Timings) -> Self {
        Self {
            task_id: task.id().clone(),
            prompt: task.prompt().to_owned(),
            options: options.to_vec(),
            answer: answer.to_owned(),
            timings,
            phase: Phase::Presenting,
            picked: None,
            deferred: Deferrals::new(),
        }
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn picked(&self) -> Option<usize> {
        self.picked
    }

    fn select(&mut self, index: usize) -> Vec<Effect> {
        if !self.phase.accepts_input() || index >= self.options.len() {
            return Vec::new();
        }

        self.picked = Some(index);
        let verdict = Verdict::from(self.options[index] == self.answer);
        self.phase = if verdict.is_correct() {
            Phase::ResolvedCorrect
        } else {
            Phase::ResolvedIncorrect
        };

        vec![
            Effect::Cue(Cue::from(verdict)),
            self.deferred
                .schedule(Deferred::Complete(verdict), self.timings.complete_delay),
        ]
    }
}

impl AnswerMachine for ChoiceGame {
    fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    fn present(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Presenting {
            return Vec::new();
        }
        self.phase = Phase::Collecting;
        vec![Effect::Speak(self.prompt.clone())]
    }

    fn handle_input(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Select(Target::Option(index)) => self.select(index),
            _ => Vec::new(),
        }
    }

    fn fire(&mut self, token: TimerToken) -> Vec<Effect> {
        match self.deferred.take(token) {
            Some(Deferred::Complete(verdict)) => {
                self.phase = Phase::Finished;
                vec![Effect::Complete(verdict)]
            }
            None => Vec::new(),
        }
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn is_complete(&self) -> bool {
        self.picked.is_some()
    }

    fn cancel(&mut self) {
        self.deferred.clear();
        if self.phase != Phase::Finished {
            self.phase = Phase::Cancelled;
        }
    }
}
