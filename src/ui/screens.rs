use crate::access::{Operation, Role};

/// Startup choice of session role. Guest is preselected.
pub(crate) struct RolePicker {
    pub(crate) selected: usize,
}

impl Default for RolePicker {
    fn default() -> Self {
        Self {
            selected: Role::ALL.len() - 1,
        }
    }
}

impl RolePicker {
    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_offset(self.selected, offset, Role::ALL.len());
    }

    pub(crate) fn current(&self) -> Role {
        Role::ALL[self.selected]
    }
}

/// Main command list.
#[derive(Default)]
pub(crate) struct MenuScreen {
    pub(crate) selected: usize,
}

impl MenuScreen {
    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_offset(self.selected, offset, Operation::ALL.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = Operation::ALL.len() - 1;
    }

    pub(crate) fn current(&self) -> Operation {
        Operation::ALL[self.selected]
    }
}

/// Scrollable popup for search and listing results.
pub(crate) struct ReportView {
    pub(crate) heading: String,
    pub(crate) lines: Vec<String>,
    pub(crate) scroll: u16,
}

impl ReportView {
    pub(crate) fn new(heading: impl Into<String>, body: &str) -> Self {
        Self {
            heading: heading.into(),
            lines: body.lines().map(str::to_string).collect(),
            scroll: 0,
        }
    }

    pub(crate) fn max_scroll(&self) -> u16 {
        self.lines.len().saturating_sub(1).min(u16::MAX as usize) as u16
    }

    pub(crate) fn scroll_by(&mut self, delta: isize) {
        let next = (self.scroll as isize + delta).clamp(0, self.max_scroll() as isize);
        self.scroll = next as u16;
    }
}

fn clamp_offset(current: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = (current as isize + offset).clamp(0, len as isize - 1);
    next as usize
}
