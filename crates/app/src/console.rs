//! Terminal front-end: draws the running game and turns typed lines into input.

use std::io::{self, BufRead, Write};
use std::thread;

use owl_core::game::{AnswerMachine, Game, Input, Phase, Point, Target};
use services::{FeedbackSink, GameObserver};
use tokio::sync::mpsc;

/// Prints cues and spoken lines instead of playing audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleFeedback;

impl FeedbackSink for ConsoleFeedback {
    fn correct(&self) {
        println!("  ✔");
    }

    fn wrong(&self) {
        println!("  ✘");
    }

    fn speak(&self, text: &str) {
        println!("🦉 {text}");
    }
}

/// Redraws the board whenever the game waits for input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer;

impl GameObserver for ConsoleRenderer {
    fn render(&self, game: &Game) {
        if game.phase() != Phase::Collecting {
            return;
        }
        let mut out = io::stdout().lock();
        // A closed stdout only loses the drawing.
        let _ = draw(&mut out, game).and_then(|()| out.flush());
    }
}

fn mark(used: bool) -> &'static str {
    if used { "·" } else { " " }
}

fn draw(out: &mut impl Write, game: &Game) -> io::Result<()> {
    match game {
        Game::Choice(choice) => {
            for (i, option) in choice.options().iter().enumerate() {
                write!(out, "  {}) {option}", i + 1)?;
            }
            writeln!(out)?;
        }
        Game::Sequence(sequence) => {
            let chosen: Vec<&str> = sequence.chosen().collect();
            let slots: Vec<&str> = (0..sequence.slot_count())
                .map(|i| chosen.get(i).copied().unwrap_or("_"))
                .collect();
            writeln!(out, "  [{}]", slots.join("] ["))?;
            for (i, item) in sequence.pool().iter().enumerate() {
                write!(out, "  {}){}{item}", i + 1, mark(sequence.is_used(i)))?;
            }
            writeln!(out)?;
        }
        Game::Pairing(pairing) => {
            let lefts: Vec<&str> = pairing.lefts().collect();
            let rows = lefts.len().max(pairing.rights().len());
            for i in 0..rows {
                let left = lefts.get(i).copied().unwrap_or("");
                let right = pairing.rights().get(i).map_or("", String::as_str);
                let pending = if pairing.pending_left() == Some(i) { ">" } else { " " };
                let flash = match pairing.wrong_flash() {
                    Some((l, r)) if l == i || r == i => " !",
                    _ => "",
                };
                writeln!(
                    out,
                    " {pending}l{}{} {left:<12} r{}{} {right}{flash}",
                    i + 1,
                    mark(pairing.is_left_committed(i)),
                    i + 1,
                    mark(pairing.is_right_committed(i)),
                )?;
            }
        }
        Game::Placement(placement) => {
            let slots: Vec<String> = placement
                .slots()
                .enumerate()
                .map(|(i, value)| format!("s{} [{}]", i + 1, value.unwrap_or("_")))
                .collect();
            writeln!(out, "  {}", slots.join("  "))?;
            for (i, item) in placement.pool().iter().enumerate() {
                let selected = if placement.selected() == Some(i) { ">" } else { " " };
                write!(out, " {selected}i{}{}{item}", i + 1, mark(placement.is_consumed(i)))?;
            }
            writeln!(out)?;
        }
    }
    write!(out, "> ")
}

/// What a typed line means.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Inputs(Vec<Input>),
    Quit,
    Unknown,
}

fn parse_target(token: &str) -> Option<Target> {
    let mut chars = token.chars();
    let prefix = chars.next()?;
    let digits = if prefix.is_ascii_digit() {
        token
    } else {
        chars.as_str()
    };
    let index = digits.parse::<usize>().ok()?.checked_sub(1)?;
    match prefix {
        'l' => Some(Target::Left(index)),
        'r' => Some(Target::Right(index)),
        'i' => Some(Target::Item(index)),
        's' => Some(Target::Slot(index)),
        c if c.is_ascii_digit() => Some(Target::Option(index)),
        _ => None,
    }
}

/// Parse one line: `2` picks an option, `l1`/`r2`/`i3`/`s1` tap an element,
/// `i1>s2` drags one element onto another, `q` quits.
#[must_use]
pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line == "q" {
        return Command::Quit;
    }

    if let Some((from, to)) = line.split_once('>') {
        return match (parse_target(from.trim()), parse_target(to.trim())) {
            (Some(from), Some(to)) => Command::Inputs(vec![
                Input::PointerDown {
                    target: from,
                    at: Point::default(),
                },
                Input::PointerMove {
                    at: Point::new(1.0, 1.0),
                },
                Input::PointerUp {
                    over: Some(to),
                    at: Point::new(1.0, 1.0),
                },
            ]),
            _ => Command::Unknown,
        };
    }

    let targets: Option<Vec<Target>> = line.split_whitespace().map(parse_target).collect();
    match targets {
        Some(targets) if !targets.is_empty() => {
            Command::Inputs(targets.into_iter().map(Input::Select).collect())
        }
        _ => Command::Unknown,
    }
}

/// Feed stdin lines into the returned channel until `q` or end of input.
pub fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel(32);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Command::Quit => break,
                Command::Unknown => eprintln!("?"),
                Command::Inputs(inputs) => {
                    for input in inputs {
                        if tx.blocking_send(input).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });
    rx
}
