//! Ratatui front end: a role picker, the eight-command menu, input forms, and
//! report popups. All catalog work goes through the dispatcher.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
