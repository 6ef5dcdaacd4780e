use crossbeam_channel::{Receiver, TryRecvError};
use itertools::Itertools;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};

use crate::client::{Answer, Citation, Dispatcher};
use crate::error::GENERIC_FAILURE;

type ReplyRx = Receiver<crate::Result<Answer>>;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// What the result pane is showing. Only one of these can be true at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Idle,
    Submitting,
    Success {
        answer: String,
        citations: Vec<Citation>,
    },
    Failure {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TypeChar(char),
    DeleteChar,
    ClearInput,
    Submit,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
}

const PAGE_LINES: u16 = 10;

/// State and behavior of the single question/answer screen
pub struct Screen<D: Dispatcher> {
    dispatcher: D,
    question: String,
    view: View,
    reply_rx: Option<ReplyRx>,
    scroll: u16,
}

impl<D: Dispatcher> Screen<D> {
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            question: String::new(),
            view: View::Idle,
            reply_rx: None,
            scroll: 0,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn is_loading(&self) -> bool {
        self.reply_rx.is_some()
    }

    /// Whether the submit control is enabled
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.question.trim().is_empty()
    }

    /// Start a query for the current question.
    /// Returns false, leaving everything untouched, when submitting isn't allowed.
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }

        tracing::debug!(question_len = self.question.len(), "submitting question");

        self.view = View::Submitting;
        self.scroll = 0;
        self.reply_rx = Some(self.dispatcher.dispatch(self.question.clone()));

        true
    }

    /// Check for the pending result without blocking.
    /// Returns true if the screen changed state.
    pub fn poll(&mut self) -> bool {
        let received = match self.reply_rx.as_ref().map(|rx| rx.try_recv()) {
            None | Some(Err(TryRecvError::Empty)) => return false,
            Some(Ok(result)) => result,
            Some(Err(TryRecvError::Disconnected)) => {
                tracing::error!("query worker exited without a result");
                Err(crate::Error::Other(GENERIC_FAILURE.into()))
            }
        };

        self.reply_rx = None;
        self.resolve(received);

        true
    }

    fn resolve(&mut self, result: crate::Result<Answer>) {
        self.view = match result {
            Ok(Answer { answer, citations }) => View::Success { answer, citations },
            Err(e) => View::Failure {
                message: e.to_string(),
            },
        };
    }

    pub fn update(&mut self, action: Action) {
        match action {
            Action::TypeChar(c) => self.question.push(c),
            Action::DeleteChar => {
                self.question.pop();
            }
            Action::ClearInput => self.question.clear(),
            Action::Submit => {
                self.submit();
            }
            Action::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            Action::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            Action::PageUp => self.scroll = self.scroll.saturating_sub(PAGE_LINES),
            Action::PageDown => self.scroll = self.scroll.saturating_add(PAGE_LINES),
        }
    }

    /// Hint text for the submit control, reflecting whether it is enabled
    pub fn action_label(&self) -> &'static str {
        if self.is_loading() {
            "Querying..."
        } else if self.can_submit() {
            "[Enter] Ask"
        } else {
            "Ask"
        }
    }

    /// Content of the result pane. `tick` drives the busy spinner.
    pub fn result_text(&self, tick: usize) -> Text<'_> {
        match &self.view {
            View::Idle => Text::default(),

            View::Submitting => Text::from(Line::from(vec![
                Span::styled(
                    SPINNER[tick % SPINNER.len()],
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(" Querying..."),
            ])),

            View::Failure { message } => Text::from(Line::from(Span::styled(
                format!("! {message}"),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))),

            View::Success { answer, citations } => answer_text(answer, citations),
        }
    }
}

fn heading(label: &str) -> Line<'_> {
    Line::from(Span::styled(
        label,
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
    ))
}

/// Answer verbatim, line breaks kept, then the sources list if there is one
pub fn answer_text<'a>(answer: &'a str, citations: &[Citation]) -> Text<'a> {
    let mut lines = vec![heading("Answer")];
    lines.extend(answer.split('\n').map(Line::raw));

    if !citations.is_empty() {
        lines.push(Line::default());
        lines.push(heading("Sources"));
        lines.extend(
            citations
                .iter()
                .map(|c| Line::raw(format!("- {c}")))
                .collect_vec(),
        );
    }

    Text::from(lines)
}

/// Flatten rendered text back into plain strings, one per line
pub fn plain_lines(text: &Text<'_>) -> Vec<String> {
    text.lines
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).join(""))
        .collect_vec()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;
    use crossbeam_channel::{bounded, Sender};
    use std::cell::RefCell;

    type ReplyTx = Sender<crate::Result<Answer>>;

    /// Records every dispatched question and keeps the sending half for the test to resolve
    #[derive(Default)]
    struct FakeDispatcher {
        sent: RefCell<Vec<String>>,
        pending: RefCell<Vec<ReplyTx>>,
    }

    impl Dispatcher for FakeDispatcher {
        fn dispatch(&self, question: String) -> Receiver<crate::Result<Answer>> {
            let (tx, rx) = bounded(1);
            self.sent.borrow_mut().push(question);
            self.pending.borrow_mut().push(tx);
            rx
        }
    }

    impl FakeDispatcher {
        fn reply(&self, result: crate::Result<Answer>) {
            let tx = self.pending.borrow_mut().remove(0);
            tx.send(result).unwrap();
        }

        fn sent(&self) -> Vec<String> {
            self.sent.borrow().clone()
        }
    }

    fn screen_with(question: &str) -> Screen<FakeDispatcher> {
        let mut screen = Screen::new(FakeDispatcher::default());
        question.chars().for_each(|c| screen.update(Action::TypeChar(c)));
        screen
    }

    fn rendered(screen: &Screen<FakeDispatcher>) -> Vec<String> {
        plain_lines(&screen.result_text(0))
    }

    #[test]
    fn test_blank_question_is_noop() {
        for question in ["", "   ", "\t\n "] {
            let mut screen = screen_with(question);

            assert!(!screen.can_submit());
            assert!(!screen.submit());
            assert_eq!(screen.view(), &View::Idle);
            assert!(!screen.is_loading());
            assert!(screen.dispatcher.sent().is_empty());
        }
    }

    #[test]
    fn test_submit_sends_exact_text_once() {
        let mut screen = screen_with(" What is RAG? ");

        assert!(screen.submit());

        assert_eq!(screen.dispatcher.sent(), vec![" What is RAG? ".to_string()]);
        assert_eq!(screen.view(), &View::Submitting);
        assert!(screen.is_loading());
        assert!(!screen.can_submit());
        assert_eq!(screen.action_label(), "Querying...");
    }

    #[test]
    fn test_no_second_submit_while_pending() {
        let mut screen = screen_with("first");
        screen.update(Action::Submit);

        screen.update(Action::TypeChar('!'));
        screen.update(Action::Submit);
        assert!(!screen.submit());

        assert_eq!(screen.dispatcher.sent().len(), 1);
        assert!(!screen.poll());
        assert!(screen.is_loading());
    }

    #[test]
    fn test_scenario_success_with_citation() {
        let mut screen = screen_with("capital of France?");
        screen.submit();

        screen.dispatcher.reply(Ok(Answer {
            answer: "Paris is the capital.".into(),
            citations: vec![Citation {
                source: Some("geo.pdf".into()),
                page: Some(12),
            }],
        }));

        assert!(screen.poll());
        assert!(!screen.is_loading());
        assert!(screen.can_submit());
        assert_eq!(
            rendered(&screen),
            vec!["Answer", "Paris is the capital.", "", "Sources", "- geo.pdf (p.12)"]
        );
    }

    #[test]
    fn test_scenario_server_error() {
        let mut screen = screen_with("q");
        screen.submit();

        screen.dispatcher.reply(Err(Error::HttpError {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: "model unavailable".into(),
        }));
        screen.poll();

        assert_eq!(
            screen.view(),
            &View::Failure {
                message: "model unavailable".into()
            }
        );
        assert_eq!(rendered(&screen), vec!["! model unavailable"]);
    }

    #[test]
    fn test_scenario_empty_body() {
        let mut screen = screen_with("q");
        screen.submit();
        screen.dispatcher.reply(Ok(Answer::default()));
        screen.poll();

        assert_eq!(rendered(&screen), vec!["Answer", ""]);
    }

    #[test]
    fn test_scenario_transport_failure() {
        let mut screen = screen_with("q");
        screen.submit();

        screen.dispatcher.reply(Err(Error::IOError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))));
        screen.poll();

        assert!(!screen.is_loading());
        assert!(matches!(screen.view(), View::Failure { message } if message == "connection refused"));
    }

    #[test]
    fn test_worker_gone_without_result() {
        let mut screen = screen_with("q");
        screen.submit();
        screen.dispatcher.pending.borrow_mut().clear();

        assert!(screen.poll());
        assert_eq!(
            screen.view(),
            &View::Failure {
                message: GENERIC_FAILURE.into()
            }
        );
    }

    #[test]
    fn test_resubmit_clears_previous_result() {
        let mut screen = screen_with("q");
        screen.submit();
        screen.dispatcher.reply(Err(Error::InvalidResponse {
            status: reqwest::StatusCode::OK,
        }));
        screen.poll();
        screen.update(Action::ScrollDown);

        assert!(screen.submit());
        assert_eq!(screen.view(), &View::Submitting);
        assert_eq!(screen.scroll(), 0);
        assert_eq!(screen.dispatcher.sent().len(), 2);

        screen.dispatcher.reply(Ok(Answer {
            answer: "second".into(),
            citations: vec![],
        }));
        screen.poll();

        assert_eq!(rendered(&screen), vec!["Answer", "second"]);
    }

    #[test]
    fn test_answer_line_breaks_kept() {
        let text = answer_text("line one\n\n  indented\n", &[]);

        assert_eq!(
            plain_lines(&text),
            vec!["Answer", "line one", "", "  indented", ""]
        );
    }

    #[test]
    fn test_citation_lines() {
        let citations = vec![
            Citation {
                source: Some("doc.pdf".into()),
                page: Some(3),
            },
            Citation {
                source: Some("doc.pdf".into()),
                page: None,
            },
            Citation::default(),
        ];

        let lines = plain_lines(&answer_text("a", &citations));

        assert_eq!(
            &lines[3..],
            &["Sources", "- doc.pdf (p.3)", "- doc.pdf ", "- unknown "]
        );
    }

    #[test]
    fn test_rendering_is_stable() {
        let citations = vec![Citation {
            source: Some("geo.pdf".into()),
            page: Some(12),
        }];

        assert_eq!(
            answer_text("same", &citations),
            answer_text("same", &citations)
        );
    }

    #[test]
    fn test_editing() {
        let mut screen = screen_with("abc");
        assert_eq!(screen.action_label(), "[Enter] Ask");

        screen.update(Action::DeleteChar);
        assert_eq!(screen.question(), "ab");

        screen.update(Action::ClearInput);
        assert_eq!(screen.question(), "");
        assert_eq!(screen.action_label(), "Ask");

        screen.update(Action::DeleteChar);
        assert_eq!(screen.question(), "");
    }

    #[test]
    fn test_scroll_saturates() {
        let mut screen = screen_with("");

        screen.update(Action::ScrollUp);
        assert_eq!(screen.scroll(), 0);

        screen.update(Action::PageDown);
        screen.update(Action::ScrollDown);
        assert_eq!(screen.scroll(), PAGE_LINES + 1);

        screen.update(Action::PageUp);
        assert_eq!(screen.scroll(), 1);
    }

    #[test]
    fn test_spinner_while_submitting() {
        let mut screen = screen_with("q");
        screen.submit();

        assert_eq!(plain_lines(&screen.result_text(1)), vec!["/ Querying..."]);
    }
}
