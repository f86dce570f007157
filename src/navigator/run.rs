//! Terminal loop for the Navigator: raw mode, key mapping, effects.

use std::io;

use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::debug;

use crate::queue::{QueueEngine, QueueTarget};
use crate::state::Tree;

use super::{NavEffect, NavEvent, NavMode, NavOutcome, NavState, apply, render::render};

/// Open the Navigator over `tree` and block until the user leaves it.
/// Follow-up questions submitted inside are pushed onto `queue`.
pub fn run(tree: &Tree, queue: &mut QueueEngine) -> io::Result<NavOutcome> {
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let result = event_loop(tree, queue);
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    result
}

fn event_loop(tree: &Tree, queue: &mut QueueEngine) -> io::Result<NavOutcome> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut state = NavState::open(tree);

    loop {
        terminal.draw(|frame| render(frame, tree, &mut state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(nav_event) = map_key(&state.mode, key) else { continue };

        match apply(&mut state, tree, nav_event) {
            Some(NavEffect::FollowUpQueued { target, question }) => {
                debug!(target_node = %target, "follow-up queued from navigator");
                queue.enqueue(question, QueueTarget::FollowUp(target));
            }
            Some(NavEffect::Exit(outcome)) => return Ok(outcome),
            None => {}
        }
    }
}

/// Map a raw key to a transition event for the current mode.
fn map_key(mode: &NavMode, key: KeyEvent) -> Option<NavEvent> {
    match mode {
        NavMode::Tree => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(NavEvent::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(NavEvent::Down),
            KeyCode::Right => Some(NavEvent::Expand),
            KeyCode::Left => Some(NavEvent::Collapse),
            KeyCode::Enter => Some(NavEvent::Open),
            KeyCode::Char('f') | KeyCode::Char('F') => Some(NavEvent::StartFollowUp),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(NavEvent::Quit),
            _ => None,
        },
        NavMode::Detail { .. } => match key.code {
            KeyCode::Up => Some(NavEvent::Up),
            KeyCode::Down => Some(NavEvent::Down),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(NavEvent::RequestFile),
            _ => Some(NavEvent::Dismiss),
        },
        NavMode::FollowUp { .. } => match key.code {
            KeyCode::Enter => Some(NavEvent::Submit),
            KeyCode::Esc => Some(NavEvent::Dismiss),
            KeyCode::Backspace => Some(NavEvent::Backspace),
            KeyCode::Char(c) => Some(NavEvent::Input(c)),
            _ => None,
        },
    }
}
