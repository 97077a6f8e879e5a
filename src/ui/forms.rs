use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::access::Operation;
use crate::dispatch::{Request, SearchField};

/// A single prompted input.
#[derive(Clone)]
pub(crate) struct FormField {
    pub(crate) label: &'static str,
    pub(crate) value: String,
}

impl FormField {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
        }
    }
}

/// Which command a form is collecting input for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FormKind {
    Add,
    Update,
    Delete,
    Search(SearchField),
}

/// Input state for the commands that need typed values. Values are kept as
/// raw text; the dispatcher does all validation.
#[derive(Clone)]
pub(crate) struct CommandForm {
    kind: FormKind,
    pub(crate) fields: Vec<FormField>,
    pub(crate) active: usize,
}

impl CommandForm {
    /// Form for an operation that prompts for fields. Returns `None` for the
    /// operations that take no input, and for search, which first needs a
    /// field choice (see [`CommandForm::search`]).
    pub(crate) fn for_operation(operation: Operation) -> Option<Self> {
        let (kind, labels): (FormKind, &[&'static str]) = match operation {
            Operation::AddRecord => (FormKind::Add, &["Title", "Author", "Year"][..]),
            Operation::UpdateRecord => (
                FormKind::Update,
                &["ID", "New title", "New author", "New year"][..],
            ),
            Operation::DeleteRecord => (FormKind::Delete, &["Exact title"][..]),
            _ => return None,
        };
        Some(Self::with_labels(kind, labels))
    }

    pub(crate) fn search(field: SearchField) -> Self {
        Self::with_labels(FormKind::Search(field), &["Search for"])
    }

    fn with_labels(kind: FormKind, labels: &[&'static str]) -> Self {
        Self {
            kind,
            fields: labels.iter().copied().map(FormField::new).collect(),
            active: 0,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self.kind {
            FormKind::Add => Operation::AddRecord,
            FormKind::Update => Operation::UpdateRecord,
            FormKind::Delete => Operation::DeleteRecord,
            FormKind::Search(_) => Operation::SearchRecord,
        }
    }

    pub(crate) fn title(&self) -> String {
        match self.kind {
            FormKind::Search(field) => format!("{} by {}", self.operation(), field),
            _ => self.operation().label().to_string(),
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = (self.active + self.fields.len() - 1) % self.fields.len();
    }

    /// Append a character to the active field. Control characters are ignored.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.fields[self.active].value.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.fields[self.active].value.pop();
    }

    fn value(&self, index: usize) -> String {
        self.fields
            .get(index)
            .map(|field| field.value.clone())
            .unwrap_or_default()
    }

    /// Convert the collected text into a dispatcher request.
    pub(crate) fn to_request(&self) -> Request {
        match self.kind {
            FormKind::Add => Request::AddRecord {
                title: self.value(0),
                author: self.value(1),
                year: self.value(2),
            },
            FormKind::Update => Request::UpdateRecord {
                id: self.value(0),
                title: self.value(1),
                author: self.value(2),
                year: self.value(3),
            },
            FormKind::Delete => Request::DeleteRecord {
                title: self.value(0),
            },
            FormKind::Search(field) => Request::SearchRecord {
                field: field.label().to_ascii_lowercase(),
                term: self.value(0),
            },
        }
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, index: usize) -> Line<'static> {
        let field = &self.fields[index];
        let is_active = index == self.active;

        let display = if field.value.is_empty() {
            "<required>".to_string()
        } else {
            field.value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if field.value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label)),
            Span::styled(display, style),
        ])
    }

    /// Cursor column offset within the active line.
    pub(crate) fn cursor_offset(&self) -> usize {
        let field = &self.fields[self.active];
        field.label.chars().count() + 2 + field.value.chars().count()
    }
}

/// Requests for the commands that take no typed input.
pub(crate) fn request_without_input(operation: Operation) -> Option<Request> {
    match operation {
        Operation::CreateStore => Some(Request::CreateStore),
        Operation::DeleteStore => Some(Request::DeleteStore),
        Operation::ClearTable => Some(Request::ClearTable),
        Operation::ViewAll => Some(Request::ViewAll),
        _ => None,
    }
}

/// Whether a command asks for a y/n confirmation before it runs.
pub(crate) fn needs_confirmation(operation: Operation) -> bool {
    matches!(
        operation,
        Operation::CreateStore | Operation::DeleteStore | Operation::ClearTable
    )
}

/// Cursor over the three search fields.
#[derive(Clone, Default)]
pub(crate) struct SearchChoice {
    selected: usize,
}

impl SearchChoice {
    pub(crate) fn next(&mut self) {
        self.selected = (self.selected + 1) % SearchField::ALL.len();
    }

    pub(crate) fn previous(&mut self) {
        self.selected = (self.selected + SearchField::ALL.len() - 1) % SearchField::ALL.len();
    }

    pub(crate) fn current(&self) -> SearchField {
        SearchField::ALL[self.selected]
    }

    pub(crate) fn selected_index(&self) -> usize {
        self.selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(form: &mut CommandForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn add_form_collects_three_fields() {
        let mut form = CommandForm::for_operation(Operation::AddRecord).unwrap();
        type_text(&mut form, "Dune");
        form.next_field();
        type_text(&mut form, "Herbert");
        form.next_field();
        type_text(&mut form, "1965");

        assert_eq!(
            form.to_request(),
            Request::AddRecord {
                title: "Dune".into(),
                author: "Herbert".into(),
                year: "1965".into(),
            }
        );
    }

    #[test]
    fn field_focus_wraps_both_ways() {
        let mut form = CommandForm::for_operation(Operation::UpdateRecord).unwrap();
        form.previous_field();
        assert_eq!(form.active, 3);
        form.next_field();
        assert_eq!(form.active, 0);
    }

    #[test]
    fn typing_ignores_control_characters_and_backspace_edits_active_field() {
        let mut form = CommandForm::for_operation(Operation::DeleteRecord).unwrap();
        assert_eq!(form.fields[0].label, "Exact title");
        assert!(!form.push_char('\u{7}'));
        type_text(&mut form, "Dunex");
        form.backspace();
        assert_eq!(
            form.to_request(),
            Request::DeleteRecord {
                title: "Dune".into()
            }
        );
    }

    #[test]
    fn search_form_carries_the_chosen_field() {
        let mut choice = SearchChoice::default();
        choice.next();
        choice.next();
        let mut form = CommandForm::search(choice.current());
        type_text(&mut form, "1965");

        assert_eq!(form.title(), "Search Record by Year");
        assert_eq!(
            form.to_request(),
            Request::SearchRecord {
                field: "year".into(),
                term: "1965".into(),
            }
        );
    }

    #[test]
    fn inputless_operations_have_no_form() {
        for op in [
            Operation::CreateStore,
            Operation::DeleteStore,
            Operation::ClearTable,
            Operation::SearchRecord,
            Operation::ViewAll,
        ] {
            assert!(CommandForm::for_operation(op).is_none(), "{op}");
        }
        assert_eq!(
            request_without_input(Operation::ClearTable),
            Some(Request::ClearTable)
        );
        assert_eq!(request_without_input(Operation::AddRecord), None);
        assert!(needs_confirmation(Operation::DeleteStore));
        assert!(!needs_confirmation(Operation::ViewAll));
    }
}
