use std::mem;

use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use tracing::info;

use crate::access::{is_authorized, Operation, Role};
use crate::dispatch::{Dispatcher, Outcome, Request, SearchField};
use crate::store::CatalogStore;

use super::forms::{needs_confirmation, request_without_input, CommandForm, SearchChoice};
use super::helpers::{centered_rect, menu_line};
use super::screens::{MenuScreen, ReportView, RolePicker};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Rows scrolled per PageUp/PageDown inside a report.
const REPORT_PAGE: isize = 10;

/// High-level navigation states. The role picker is only ever shown before a
/// session exists; once a role is chosen the app stays on the menu.
enum Screen {
    RolePicker(RolePicker),
    Menu(MenuScreen),
}

/// Fine-grained modes layered over the menu.
enum Mode {
    Normal,
    Form(CommandForm),
    ChoosingSearchField(SearchChoice),
    Confirm(Operation),
    Report(ReportView),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App<S> {
    /// Store waiting for a role. Moved into the session once one is picked.
    store: Option<S>,
    session: Option<Dispatcher<S>>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<S: CatalogStore> App<S> {
    /// Build the app. With a preselected role the picker is skipped.
    pub fn new(store: S, role: Option<Role>) -> Self {
        let mut app = Self {
            store: Some(store),
            session: None,
            screen: Screen::RolePicker(RolePicker::default()),
            mode: Mode::Normal,
            status: None,
        };
        if let Some(role) = role {
            app.start_session(role);
        }
        app
    }

    /// Role of the running session, if one has been picked.
    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(Dispatcher::role)
    }

    /// Process one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Form(form) => self.handle_form(code, form),
            Mode::ChoosingSearchField(choice) => self.handle_search_choice(code, choice),
            Mode::Confirm(operation) => self.handle_confirm(code, operation),
            Mode::Report(view) => self.handle_report(code, view),
        };

        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match self.screen {
            Screen::RolePicker(ref mut picker) => match code {
                KeyCode::Char('q') | KeyCode::Esc => *exit = true,
                KeyCode::Up => picker.move_selection(-1),
                KeyCode::Down => picker.move_selection(1),
                KeyCode::Enter => {
                    let role = picker.current();
                    self.start_session(role);
                }
                _ => {}
            },
            Screen::Menu(ref mut menu) => match code {
                KeyCode::Char('q') | KeyCode::Esc => *exit = true,
                KeyCode::Up => menu.move_selection(-1),
                KeyCode::Down => menu.move_selection(1),
                KeyCode::Home => menu.select_first(),
                KeyCode::End => menu.select_last(),
                KeyCode::Enter => {
                    let operation = menu.current();
                    return self.begin(operation);
                }
                KeyCode::Char(ch @ '1'..='8') => {
                    let index = ch as usize - '1' as usize;
                    menu.selected = index;
                    return self.begin(Operation::ALL[index]);
                }
                _ => {}
            },
        }
        Mode::Normal
    }

    fn handle_form(&mut self, code: KeyCode, mut form: CommandForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => return self.run(form.to_request()),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Mode::Form(form)
    }

    fn handle_search_choice(&mut self, code: KeyCode, mut choice: SearchChoice) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Enter => return Mode::Form(CommandForm::search(choice.current())),
            KeyCode::Up | KeyCode::Left => choice.previous(),
            KeyCode::Down | KeyCode::Right | KeyCode::Tab => choice.next(),
            _ => {}
        }
        Mode::ChoosingSearchField(choice)
    }

    fn handle_confirm(&mut self, code: KeyCode, operation: Operation) -> Mode {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => match request_without_input(operation) {
                Some(request) => self.run(request),
                None => Mode::Normal,
            },
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.set_status("Cancelled.", StatusKind::Info);
                Mode::Normal
            }
            _ => Mode::Confirm(operation),
        }
    }

    fn handle_report(&mut self, code: KeyCode, mut view: ReportView) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => return Mode::Normal,
            KeyCode::Up => view.scroll_by(-1),
            KeyCode::Down => view.scroll_by(1),
            KeyCode::PageUp => view.scroll_by(-REPORT_PAGE),
            KeyCode::PageDown => view.scroll_by(REPORT_PAGE),
            _ => {}
        }
        Mode::Report(view)
    }

    /// Pick the role, probe the catalog once, and switch to the menu. A failed
    /// probe is reported but does not end the session.
    fn start_session(&mut self, role: Role) {
        let Some(store) = self.store.take() else {
            return;
        };
        let session = Dispatcher::new(role, store);
        match session.probe() {
            Ok(()) => {
                info!(%role, "connected to the catalog");
                self.set_status(format!("Connected to the catalog as {role}."), StatusKind::Info);
            }
            Err(err) => {
                info!(%role, error = %err, "catalog not reachable at startup");
                self.set_status(
                    format!("Signed in as {role}; catalog not reachable: {err}"),
                    StatusKind::Error,
                );
            }
        }
        self.session = Some(session);
        self.screen = Screen::Menu(MenuScreen::default());
    }

    /// Start a menu command. Denied commands are reported straight away
    /// instead of prompting for input that could never be used.
    fn begin(&mut self, operation: Operation) -> Mode {
        self.clear_status();
        let verdict = match &self.session {
            Some(session) => session.authorize(operation),
            None => return Mode::Normal,
        };
        if let Err(err) = verdict {
            self.set_status(err.to_string(), StatusKind::Error);
            return Mode::Normal;
        }

        if needs_confirmation(operation) {
            return Mode::Confirm(operation);
        }
        if operation == Operation::SearchRecord {
            return Mode::ChoosingSearchField(SearchChoice::default());
        }
        if let Some(form) = CommandForm::for_operation(operation) {
            return Mode::Form(form);
        }
        match request_without_input(operation) {
            Some(request) => self.run(request),
            None => Mode::Normal,
        }
    }

    /// Hand a request to the dispatcher and turn its result into a status line
    /// or a report popup.
    fn run(&mut self, request: Request) -> Mode {
        let result = match &self.session {
            Some(session) => session.dispatch(request),
            None => return Mode::Normal,
        };

        match result {
            Ok(outcome) => {
                self.set_status(outcome.message(), StatusKind::Info);
                match outcome {
                    Outcome::Report { heading, body } => Mode::Report(ReportView::new(heading, &body)),
                    _ => Mode::Normal,
                }
            }
            Err(err) => {
                self.set_status(err.to_string(), StatusKind::Error);
                Mode::Normal
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::RolePicker(picker) => self.draw_role_picker(frame, content_area, picker),
            Screen::Menu(menu) => self.draw_menu(frame, content_area, menu),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Form(form) => self.draw_form(frame, area, form),
            Mode::ChoosingSearchField(choice) => self.draw_search_choice(frame, area, choice),
            Mode::Confirm(operation) => self.draw_confirm(frame, area, *operation),
            Mode::Report(view) => self.draw_report(frame, area, view),
            Mode::Normal => {}
        }
    }

    fn draw_role_picker(&self, frame: &mut Frame, area: Rect, picker: &RolePicker) {
        let popup_area = centered_rect(40, 40, area);
        let block = Block::default()
            .title("Choose a role")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines: Vec<Line> = Role::ALL
            .iter()
            .enumerate()
            .map(|(idx, role)| menu_line(role.label(), true, idx == picker.selected))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_menu(&self, frame: &mut Frame, area: Rect, menu: &MenuScreen) {
        let title = match self.role() {
            Some(role) => format!("Library Catalog ({role})"),
            None => "Library Catalog".to_string(),
        };
        let popup_area = centered_rect(50, 70, area);
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let role = self.role();
        let lines: Vec<Line> = Operation::ALL
            .iter()
            .enumerate()
            .map(|(idx, op)| {
                let allowed = role.is_some_and(|role| is_authorized(role, *op));
                menu_line(
                    &format!("{}. {}", idx + 1, op.label()),
                    allowed,
                    idx == menu.selected,
                )
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (Screen::RolePicker(_), _) => &[("[↑↓]", "Navigate"), ("[Enter]", "Select"), ("[q]", "Quit")],
            (_, Mode::Form(_)) => &[("[Tab]", "Next field"), ("[Enter]", "Submit"), ("[Esc]", "Cancel")],
            (_, Mode::ChoosingSearchField(_)) => &[("[↑↓]", "Field"), ("[Enter]", "Choose"), ("[Esc]", "Cancel")],
            (_, Mode::Confirm(_)) => &[("[y]", "Confirm"), ("[n]", "Cancel")],
            (_, Mode::Report(_)) => &[("[↑↓/PgUp/PgDn]", "Scroll"), ("[Esc]", "Close")],
            (Screen::Menu(_), Mode::Normal) => &[("[↑↓/1-8]", "Navigate"), ("[Enter]", "Run"), ("[q]", "Quit")],
        };

        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, action) in keys {
            spans.push(Span::styled(key.to_string(), key_style));
            spans.push(Span::raw(format!(" {action}   ")));
        }
        Line::from(spans)
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &CommandForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = (0..form.fields.len())
            .map(|idx| form.build_line(idx))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to submit • Tab to switch • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let cursor_x = inner.x + form.cursor_offset() as u16;
        let cursor_y = inner.y + form.active as u16;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_search_choice(&self, frame: &mut Frame, area: Rect, choice: &SearchChoice) {
        let popup_area = centered_rect(40, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Search by")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines: Vec<Line> = SearchField::ALL
            .iter()
            .enumerate()
            .map(|(idx, field)| menu_line(field.label(), true, idx == choice.selected_index()))
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, operation: Operation) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Confirm {operation}"))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let warning = match operation {
            Operation::CreateStore => "Create the catalog database if it does not exist?",
            Operation::DeleteStore => "Delete the catalog database and every record in it?",
            _ => "Remove every record from the catalog?",
        };
        let lines = vec![
            Line::from(warning),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_report(&self, frame: &mut Frame, area: Rect, view: &ReportView) {
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(view.heading.clone())
            .borders(Borders::ALL);
        let lines: Vec<Line> = view.lines.iter().map(|line| Line::from(line.clone())).collect();
        let paragraph = Paragraph::new(lines)
            .block(block)
            .scroll((view.scroll, 0));
        frame.render_widget(paragraph, popup_area);
    }

    fn set_status<T: Into<String>>(&mut self, text: T, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
