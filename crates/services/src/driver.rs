//! Runs one answer machine against live input and real time.
//!
//! The machine stays synchronous; this loop performs its effects, waits on
//! the earliest scheduled timer and forwards inputs as they arrive.

use owl_core::game::{AnswerMachine, Effect, Game, Input, TimerToken};
use owl_core::model::Verdict;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::error::SessionError;
use crate::feedback::FeedbackSink;

/// Told about the machine after every transition, so a front-end can redraw.
pub trait GameObserver: Send + Sync {
    fn render(&self, game: &Game);
}

struct Pending {
    timers: Vec<(Instant, TimerToken)>,
}

impl Pending {
    fn earliest(&self) -> Option<(Instant, TimerToken)> {
        self.timers.iter().min_by_key(|(at, _)| *at).copied()
    }

    fn remove(&mut self, token: TimerToken) {
        self.timers.retain(|(_, t)| *t != token);
    }
}

/// Perform `effects` in order. Returns the verdict if one of them completes the attempt.
fn apply(
    effects: Vec<Effect>,
    pending: &mut Pending,
    feedback: &dyn FeedbackSink,
    muted: bool,
) -> Option<Verdict> {
    for effect in effects {
        match effect {
            Effect::Speak(text) if !muted => feedback.speak(&text),
            Effect::Cue(cue) if !muted => feedback.cue(cue),
            Effect::Speak(_) | Effect::Cue(_) => {}
            Effect::Schedule(timer) => pending
                .timers
                .push((Instant::now() + timer.delay, timer.token)),
            Effect::Complete(verdict) => return Some(verdict),
        }
    }
    None
}

/// Drive `game` until it completes.
///
/// Speech and cues go to `feedback` unless `muted`. Any deferral still
/// pending at completion is cancelled.
///
/// # Errors
///
/// Returns `SessionError::Aborted` when `inputs` closes while the machine has
/// no timer left that could finish it. The machine is cancelled first.
pub async fn drive_game(
    game: &mut Game,
    inputs: &mut mpsc::Receiver<Input>,
    feedback: &dyn FeedbackSink,
    observer: Option<&dyn GameObserver>,
    muted: bool,
) -> Result<Verdict, SessionError> {
    let mut pending = Pending { timers: Vec::new() };
    let mut inputs_open = true;
    let render = |game: &Game| {
        if let Some(observer) = observer {
            observer.render(game);
        }
    };

    let effects = game.present();
    render(game);
    if let Some(verdict) = apply(effects, &mut pending, feedback, muted) {
        game.cancel();
        return Ok(verdict);
    }

    loop {
        if !inputs_open && pending.timers.is_empty() {
            tracing::debug!(task = %game.task_id(), "input closed, abandoning task");
            game.cancel();
            return Err(SessionError::Aborted);
        }

        let next = pending.earliest();
        let deadline = next.map_or_else(Instant::now, |(at, _)| at);

        let effects = tokio::select! {
            input = inputs.recv(), if inputs_open => match input {
                Some(input) => game.handle_input(input),
                None => {
                    inputs_open = false;
                    continue;
                }
            },
            () = sleep_until(deadline), if next.is_some() => {
                let Some((_, token)) = next else { continue };
                pending.remove(token);
                game.fire(token)
            }
        };

        render(game);
        if let Some(verdict) = apply(effects, &mut pending, feedback, muted) {
            game.cancel();
            tracing::debug!(
                task = %game.task_id(),
                correct = verdict.is_correct(),
                "task completed"
            );
            return Ok(verdict);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackEvent, RecordingFeedback};
    use owl_core::game::{Phase, Point, Target, Timings};
    use owl_core::model::{Pair, Task, TaskPayload};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;
    use std::time::Duration;

    fn choice_game() -> Game {
        let task = Task::new(
            "c1",
            1,
            "Сколько яблок?",
            None,
            TaskPayload::Choice {
                options: vec!["2".into(), "3".into()],
                answer: "3".into(),
            },
        )
        .unwrap();
        Game::new(&task, Timings::default(), &mut StdRng::seed_from_u64(1))
    }

    fn pairing_game() -> Game {
        let task = Task::new(
            "m1",
            1,
            "Соедини",
            None,
            TaskPayload::Pairing {
                pairs: vec![Pair::new("кот", "мяу")],
            },
        )
        .unwrap();
        Game::new(&task, Timings::default(), &mut StdRng::seed_from_u64(1))
    }

    #[derive(Default)]
    struct PhaseLog(Mutex<Vec<Phase>>);

    impl GameObserver for PhaseLog {
        fn render(&self, game: &Game) {
            self.0.lock().unwrap().push(game.phase());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_delay_with_feedback() {
        let (tx, mut rx) = mpsc::channel(4);
        let feedback = RecordingFeedback::new();
        let observer = PhaseLog::default();
        let mut game = choice_game();
        tx.send(Input::Select(Target::Option(1))).await.unwrap();

        let started = Instant::now();
        let verdict = drive_game(&mut game, &mut rx, &feedback, Some(&observer), false)
            .await
            .unwrap();

        assert_eq!(verdict, Verdict::Correct);
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(
            feedback.events(),
            vec![
                FeedbackEvent::Speak("Сколько яблок?".into()),
                FeedbackEvent::Correct
            ]
        );
        assert_eq!(
            observer.0.lock().unwrap().last().copied(),
            Some(Phase::Finished)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn muted_session_stays_silent() {
        let (tx, mut rx) = mpsc::channel(4);
        let feedback = RecordingFeedback::new();
        let mut game = choice_game();
        tx.send(Input::Select(Target::Option(0))).await.unwrap();

        let verdict = drive_game(&mut game, &mut rx, &feedback, None, true)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Incorrect);
        assert!(feedback.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn resolved_task_finishes_after_input_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut game = choice_game();
        tx.send(Input::Select(Target::Option(1))).await.unwrap();
        drop(tx);

        let verdict = drive_game(&mut game, &mut rx, &RecordingFeedback::new(), None, false)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Correct);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_input_aborts_and_cancels() {
        let (tx, mut rx) = mpsc::channel::<Input>(4);
        drop(tx);
        let mut game = choice_game();

        let result = drive_game(&mut game, &mut rx, &RecordingFeedback::new(), None, false).await;
        assert!(matches!(result, Err(SessionError::Aborted)));
        assert_eq!(game.phase(), Phase::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn drag_completes_pairing() {
        let (tx, mut rx) = mpsc::channel(4);
        let feedback = RecordingFeedback::new();
        let mut game = pairing_game();
        tx.send(Input::PointerDown {
            target: Target::Left(0),
            at: Point::new(0.0, 0.0),
        })
        .await
        .unwrap();
        tx.send(Input::PointerMove {
            at: Point::new(40.0, 0.0),
        })
        .await
        .unwrap();
        tx.send(Input::PointerUp {
            over: Some(Target::Right(0)),
            at: Point::new(80.0, 0.0),
        })
        .await
        .unwrap();

        let verdict = drive_game(&mut game, &mut rx, &feedback, None, false)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::Correct);
        assert!(feedback.events().contains(&FeedbackEvent::Correct));
    }

    fn placement_game() -> Game {
        let task = Task::new(
            "p1",
            1,
            "Поставь слова на места",
            None,
            TaskPayload::Placement {
                items: vec!["кот".into(), "дом".into()],
                slots: 2,
                answer: vec!["кот".into(), "дом".into()],
            },
        )
        .unwrap();
        Game::new(&task, Timings::default(), &mut StdRng::seed_from_u64(3))
    }

    #[derive(Default)]
    struct SlotLog(Mutex<Vec<(Phase, Vec<Option<String>>)>>);

    impl GameObserver for SlotLog {
        fn render(&self, game: &Game) {
            if let Game::Placement(placement) = game {
                let slots = placement.slots().map(|s| s.map(str::to_owned)).collect();
                self.0.lock().unwrap().push((game.phase(), slots));
            }
        }
    }

    fn fill(order: [usize; 2]) -> Vec<Input> {
        order
            .into_iter()
            .enumerate()
            .flat_map(|(slot, item)| {
                [
                    Input::Select(Target::Item(item)),
                    Input::Select(Target::Slot(slot)),
                ]
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_placement_resets_then_waits_for_input() {
        let (tx, mut rx) = mpsc::channel(16);
        let feedback = RecordingFeedback::new();
        let observer = SlotLog::default();
        let mut game = placement_game();
        let Game::Placement(placement) = &game else {
            unreachable!()
        };
        let find = |value: &str| placement.pool().iter().position(|v| v == value).unwrap();
        let (cat, house) = (find("кот"), find("дом"));

        let player = async move {
            for input in fill([house, cat]) {
                tx.send(input).await.unwrap();
            }
            // The reset fires at 1200 ms; input after that starts a fresh attempt.
            tokio::time::sleep(Duration::from_millis(1500)).await;
            for input in fill([cat, house]) {
                tx.send(input).await.unwrap();
            }
        };
        let started = Instant::now();
        let (verdict, ()) = tokio::join!(
            drive_game(&mut game, &mut rx, &feedback, Some(&observer), false),
            player
        );

        assert_eq!(verdict.unwrap(), Verdict::Correct);
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(
            feedback.events(),
            vec![
                FeedbackEvent::Speak("Поставь слова на места".into()),
                FeedbackEvent::Wrong,
                FeedbackEvent::Correct,
            ]
        );

        let log = observer.0.lock().unwrap();
        let wrong = log
            .iter()
            .position(|(phase, _)| *phase == Phase::ResolvedIncorrect)
            .unwrap();
        assert_eq!(
            log[wrong].1,
            vec![Some("дом".to_owned()), Some("кот".to_owned())]
        );
        let (phase, slots) = &log[wrong + 1];
        assert_eq!(*phase, Phase::Collecting);
        assert!(slots.iter().all(Option::is_none));
        assert_eq!(
            log.iter()
                .filter(|(phase, _)| *phase == Phase::Finished)
                .count(),
            1
        );
        assert_eq!(log.last().map(|(phase, _)| *phase), Some(Phase::Finished));
    }
}
