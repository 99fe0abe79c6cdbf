use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::controller::ConnectionController;
use crate::transport::Connector;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Connect,
    Disconnect,
    Ping,
    Test,
    Submit,
    ClearLog,
    FocusInput,
    LeaveInput,
    Type(char),
    Backspace,
    Quit,
}

pub fn intent_for(key: KeyEvent, editing: bool) -> Option<Intent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Intent::Quit);
    }

    if editing {
        return match key.code {
            KeyCode::Enter => Some(Intent::Submit),
            KeyCode::Esc => Some(Intent::LeaveInput),
            KeyCode::Backspace => Some(Intent::Backspace),
            KeyCode::Char(c) => Some(Intent::Type(c)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Intent::Quit),
        KeyCode::Char('c') => Some(Intent::Connect),
        KeyCode::Char('d') => Some(Intent::Disconnect),
        KeyCode::Char('p') => Some(Intent::Ping),
        KeyCode::Char('t') => Some(Intent::Test),
        KeyCode::Char('l') => Some(Intent::ClearLog),
        KeyCode::Char('i') | KeyCode::Tab => Some(Intent::FocusInput),
        KeyCode::Enter => Some(Intent::Submit),
        _ => None,
    }
}

pub struct App<C: Connector> {
    pub controller: ConnectionController<C>,
    pub editing: bool,
    pub quit: bool,
}

impl<C: Connector> App<C> {
    pub fn new(controller: ConnectionController<C>) -> Self {
        Self {
            controller,
            editing: false,
            quit: false,
        }
    }

    /// Applies an intent. Disabled affordances ignore it, like a greyed-out button.
    pub fn apply(&mut self, intent: Intent) {
        let actions = self.controller.view().actions;

        match intent {
            Intent::Quit => self.quit = true,
            Intent::Connect if actions.connect => self.controller.connect(),
            Intent::Disconnect if actions.disconnect => self.controller.disconnect(),
            Intent::Ping if actions.ping => {
                self.controller.send_ping();
            }
            Intent::Test if actions.test => {
                self.controller.send_test();
            }
            Intent::Submit if actions.send => {
                self.controller.submit_input();
            }
            Intent::ClearLog => self.controller.clear_log(),
            Intent::FocusInput if actions.input => self.editing = true,
            Intent::LeaveInput => self.editing = false,
            Intent::Type(c) if actions.input => self.controller.input_mut().push(c),
            Intent::Backspace if actions.input => {
                self.controller.input_mut().pop();
            }
            _ => {}
        }

        // Input is gated like the send action.
        if !self.controller.view().actions.input {
            self.editing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn command_keys() {
        assert_eq!(intent_for(press(KeyCode::Char('c')), false), Some(Intent::Connect));
        assert_eq!(intent_for(press(KeyCode::Char('d')), false), Some(Intent::Disconnect));
        assert_eq!(intent_for(press(KeyCode::Char('p')), false), Some(Intent::Ping));
        assert_eq!(intent_for(press(KeyCode::Char('t')), false), Some(Intent::Test));
        assert_eq!(intent_for(press(KeyCode::Char('l')), false), Some(Intent::ClearLog));
        assert_eq!(intent_for(press(KeyCode::Char('i')), false), Some(Intent::FocusInput));
        assert_eq!(intent_for(press(KeyCode::Char('q')), false), Some(Intent::Quit));
        assert_eq!(intent_for(press(KeyCode::Char('z')), false), None);
    }

    #[test]
    fn editing_turns_letters_into_text() {
        assert_eq!(intent_for(press(KeyCode::Char('q')), true), Some(Intent::Type('q')));
        assert_eq!(intent_for(press(KeyCode::Enter), true), Some(Intent::Submit));
        assert_eq!(intent_for(press(KeyCode::Esc), true), Some(Intent::LeaveInput));
        assert_eq!(intent_for(press(KeyCode::Backspace), true), Some(Intent::Backspace));
    }

    #[test]
    fn ctrl_c_always_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(intent_for(key, true), Some(Intent::Quit));
        assert_eq!(intent_for(key, false), Some(Intent::Quit));
    }

    #[test]
    fn releases_are_ignored() {
        let key = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(intent_for(key, false), None);
    }

    mod gating {
        use url::Url;

        use crate::app::{App, Intent};
        use crate::controller::ConnectionController;
        use crate::transport::fake::FakeConnector;
        use crate::transport::{ConnectionId, Envelope, TransportEvent};

        fn app() -> (App<FakeConnector>, FakeConnector) {
            let connector = FakeConnector::default();
            let url = Url::parse("ws://localhost:8000/ws").unwrap();
            let controller = ConnectionController::new(connector.clone(), url);
            (App::new(controller), connector)
        }

        #[test]
        fn disabled_actions_do_nothing() {
            let (mut app, connector) = app();
            let before = app.controller.view().log.len();

            app.apply(Intent::Ping);
            app.apply(Intent::FocusInput);
            app.apply(Intent::Type('x'));

            assert!(connector.calls.borrow().is_empty());
            assert!(!app.editing);
            assert!(app.controller.view().input.is_empty());
            assert_eq!(app.controller.view().log.len(), before);
        }

        #[test]
        fn typing_and_submitting_once_open() {
            let (mut app, connector) = app();
            app.apply(Intent::Connect);
            app.controller.handle_event(Envelope {
                id: ConnectionId(1),
                event: TransportEvent::Open,
            });

            app.apply(Intent::FocusInput);
            assert!(app.editing);
            for c in "hey".chars() {
                app.apply(Intent::Type(c));
            }
            app.apply(Intent::Backspace);
            app.apply(Intent::Submit);

            let sent: serde_json::Value = serde_json::from_str(&connector.sends()[0]).unwrap();
            assert_eq!(sent["message"], "he");
            assert!(app.controller.view().input.is_empty());
        }

        #[test]
        fn closing_leaves_input_mode() {
            let (mut app, _) = app();
            app.apply(Intent::Connect);
            app.controller.handle_event(Envelope {
                id: ConnectionId(1),
                event: TransportEvent::Open,
            });
            app.apply(Intent::FocusInput);
            app.controller.handle_event(Envelope {
                id: ConnectionId(1),
                event: TransportEvent::Close {
                    code: 1000,
                    reason: String::new(),
                    clean: true,
                },
            });
            app.apply(Intent::Type('x'));
            assert!(!app.editing);
        }

        #[test]
        fn quit_sets_flag() {
            let (mut app, _) = app();
            app.apply(Intent::Quit);
            assert!(app.quit);
        }
    }
}
