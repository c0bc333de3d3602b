//! Async keyboard event handling for TUI
//!
//! Uses crossterm's EventStream for non-blocking, async-compatible input.
//! Keys either change local view state (tabs, scrolling, command line) or
//! produce an [`Action`] for the console.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use tracing::warn;

use super::app::{Tab, ViewState};
use super::command;
use crate::core::Action;

/// Input poll timeout; also the redraw cadence when idle
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Result of processing a single event poll cycle
#[derive(Debug, PartialEq)]
pub enum EventResult {
    /// Continue the TUI loop
    Continue,
    /// User requested quit
    Quit,
    /// Hand an action to the console
    Dispatch(Action),
}

/// Poll for one keyboard event with a short timeout.
///
/// I/O errors are logged as warnings rather than silently swallowed.
pub async fn handle_events_async(
    view: &Arc<Mutex<ViewState>>,
    event_stream: &mut EventStream,
) -> EventResult {
    match tokio::time::timeout(POLL_TIMEOUT, event_stream.next()).await {
        Err(_) => EventResult::Continue,
        // Stream ended (terminal closed)
        Ok(None) => EventResult::Quit,
        Ok(Some(Err(e))) => {
            warn!(error = %e, "Terminal I/O error during event polling");
            EventResult::Continue
        }
        Ok(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
            let mut state = view.lock().unwrap_or_else(|e| e.into_inner());
            process_key_event(key.code, key.modifiers, &mut state)
        }
        Ok(Some(Ok(_))) => EventResult::Continue,
    }
}

/// Process a single key event and update state accordingly
pub fn process_key_event(code: KeyCode, modifiers: KeyModifiers, state: &mut ViewState) -> EventResult {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        state.should_quit = true;
        return EventResult::Quit;
    }

    if let Some(buffer) = state.command.as_mut() {
        match code {
            KeyCode::Esc => state.command = None,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Enter => {
                let line = buffer.clone();
                state.command = None;
                match command::parse(&line) {
                    Ok(action) => return EventResult::Dispatch(action),
                    Err(msg) => state.command_error = Some(msg),
                }
            }
            _ => {}
        }
        return EventResult::Continue;
    }

    if state.guide_visible && matches!(code, KeyCode::Esc | KeyCode::Enter) {
        return EventResult::Dispatch(Action::DismissGuide);
    }

    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            state.should_quit = true;
            EventResult::Quit
        }
        KeyCode::Char(':') => {
            state.command = Some(String::new());
            state.command_error = None;
            EventResult::Continue
        }

        KeyCode::Char('s') => EventResult::Dispatch(Action::Start),
        KeyCode::Char('x') => EventResult::Dispatch(Action::Stop),
        KeyCode::Char('r') => EventResult::Dispatch(Action::Refresh),
        KeyCode::Char('f') => EventResult::Dispatch(Action::CycleFilter),
        KeyCode::Char('c') => EventResult::Dispatch(Action::ClearLog),
        KeyCode::Char('t') => EventResult::Dispatch(Action::ToggleTheme),
        KeyCode::Char('n') if state.tab == Tab::Strategies => EventResult::Dispatch(Action::NewScript),

        KeyCode::Tab | KeyCode::BackTab => {
            state.tab = if code == KeyCode::Tab {
                state.tab.next()
            } else {
                state.tab.previous()
            };
            if state.tab == Tab::Analytics {
                EventResult::Dispatch(Action::LoadAnalytics)
            } else {
                EventResult::Continue
            }
        }

        // Developer pane; DEBUG traces are captured only while it is open
        KeyCode::Char('l') | KeyCode::Char('L') => {
            state.show_dev_pane = !state.show_dev_pane;
            super::logging::set_show_debug(state.show_dev_pane);
            EventResult::Continue
        }

        KeyCode::Char('j') | KeyCode::Down => {
            state.log_scroll_offset = state.log_scroll_offset.saturating_sub(1);
            EventResult::Continue
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let max_offset = state.logs.len().saturating_sub(1);
            if state.log_scroll_offset < max_offset {
                state.log_scroll_offset += 1;
            }
            EventResult::Continue
        }

        _ => EventResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogEntry, LogKind};

    fn press(state: &mut ViewState, code: KeyCode) -> EventResult {
        process_key_event(code, KeyModifiers::empty(), state)
    }

    #[test]
    fn test_process_quit_q() {
        let mut state = ViewState::new(10);
        assert_eq!(press(&mut state, KeyCode::Char('q')), EventResult::Quit);
        assert!(state.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_command_mode() {
        let mut state = ViewState::new(10);
        state.command = Some("sav".into());
        let result = process_key_event(KeyCode::Char('c'), KeyModifiers::CONTROL, &mut state);
        assert_eq!(result, EventResult::Quit);
    }

    #[test]
    fn test_lifecycle_keys() {
        let mut state = ViewState::new(10);
        assert_eq!(press(&mut state, KeyCode::Char('s')), EventResult::Dispatch(Action::Start));
        assert_eq!(press(&mut state, KeyCode::Char('x')), EventResult::Dispatch(Action::Stop));
        assert_eq!(press(&mut state, KeyCode::Char('f')), EventResult::Dispatch(Action::CycleFilter));
    }

    #[test]
    fn test_command_line_round() {
        let mut state = ViewState::new(10);
        press(&mut state, KeyCode::Char(':'));
        for c in "load scalper.jsx".chars() {
            press(&mut state, KeyCode::Char(c));
        }
        press(&mut state, KeyCode::Backspace);
        let result = press(&mut state, KeyCode::Enter);

        assert_eq!(result, EventResult::Dispatch(Action::LoadStrategy("scalper.js".into())));
        assert!(state.command.is_none());
    }

    #[test]
    fn test_command_error_is_kept() {
        let mut state = ViewState::new(10);
        state.command = Some("bogus".into());
        assert_eq!(press(&mut state, KeyCode::Enter), EventResult::Continue);
        assert!(state.command_error.unwrap().contains("bogus"));
    }

    #[test]
    fn test_tab_to_analytics_loads_it() {
        let mut state = ViewState::new(10);
        state.tab = Tab::Journal;
        assert_eq!(press(&mut state, KeyCode::Tab), EventResult::Dispatch(Action::LoadAnalytics));
        assert_eq!(state.tab, Tab::Analytics);
        assert_eq!(press(&mut state, KeyCode::Tab), EventResult::Continue);
        assert_eq!(state.tab, Tab::Dashboard);
    }

    #[test]
    fn test_guide_dismiss() {
        let mut state = ViewState::new(10);
        state.guide_visible = true;
        assert_eq!(press(&mut state, KeyCode::Esc), EventResult::Dispatch(Action::DismissGuide));
    }

    #[test]
    fn test_process_scroll() {
        let mut state = ViewState::new(10);
        for i in 0..3 {
            state.logs.push_back(LogEntry::now(LogKind::Info, format!("line {}", i)));
        }
        press(&mut state, KeyCode::Char('k'));
        press(&mut state, KeyCode::Char('k'));
        press(&mut state, KeyCode::Char('k'));
        assert_eq!(state.log_scroll_offset, 2);
        press(&mut state, KeyCode::Char('j'));
        assert_eq!(state.log_scroll_offset, 1);
    }
}
