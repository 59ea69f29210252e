//! Interactive drop-clock driver (default binary).
//!
//! Plays the role of the external game loop: installs a counting drop hook,
//! pumps a wall-clock timer, and maps keys onto clock transitions.
//! Space pauses/resumes, Up/Down change the level, q quits.

use std::cell::{Cell, RefCell};
use std::io::{stdout, Write};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;

use drop_clock::{DropClock, WallTimer};

type SharedTimer = Rc<RefCell<WallTimer>>;

fn parse_level_arg(args: &[String]) -> Result<u32> {
    let mut level = 0u32;
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--level" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("missing value for --level"))?;
                level = v
                    .parse::<u32>()
                    .map_err(|_| anyhow!("invalid --level value: {}", v))?;
            }
            other => {
                return Err(anyhow!("unknown argument: {}", other));
            }
        }
        i += 1;
    }
    Ok(level)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let level = parse_level_arg(&args)?;

    let timer: SharedTimer = Rc::new(RefCell::new(WallTimer::new()));
    let drops = Rc::new(Cell::new(0u64));
    let hook_drops = Rc::clone(&drops);

    let mut clock = DropClock::new(Rc::clone(&timer), move || {
        hook_drops.set(hook_drops.get() + 1);
    });
    clock.set_level(level);
    clock.start();

    terminal::enable_raw_mode()?;
    let result = run(&mut clock, &timer, &drops);

    // Always try to restore terminal state.
    let _ = terminal::disable_raw_mode();
    result
}

fn run(clock: &mut DropClock<SharedTimer>, timer: &SharedTimer, drops: &Rc<Cell<u64>>) -> Result<()> {
    loop {
        let until_next = timer.borrow_mut().pump();

        let state = if clock.is_running() { "RUN " } else { "STOP" };
        print!(
            "\rlevel {:>3}  rate {:>2} ticks  interval {:>8.3} ms  {}  drops {:>5}  ",
            clock.level(),
            clock.drop_rate_ticks(),
            clock.interval_ms(),
            state,
            drops.get(),
        );
        stdout().flush()?;

        // Sleep until the next deadline, but keep the status line fresh.
        let timeout = until_next
            .unwrap_or(Duration::from_millis(50))
            .min(Duration::from_millis(50));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char(' ') => {
                        if clock.is_running() {
                            clock.pause();
                        } else {
                            clock.start();
                        }
                    }
                    KeyCode::Up => clock.set_level(clock.level() + 1),
                    KeyCode::Down => clock.set_level(clock.level().saturating_sub(1)),
                    _ => {}
                }
            }
        }
    }
}
