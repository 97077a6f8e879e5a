//! Role tiers, the eight catalog operations, and the static permission table
//! that decides which tier may run which operation.

use std::fmt;
use std::str::FromStr;

/// Access tier for the whole session. Picked once at startup and then passed
/// by value wherever a decision or a connection needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Administrator,
    Moderator,
    Guest,
}

impl Role {
    /// Display order for the startup picker.
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Moderator, Role::Guest];

    /// Name of the store-level principal this role connects as.
    pub fn principal(self) -> &'static str {
        match self {
            Role::Administrator => "admin",
            Role::Moderator => "moderator",
            Role::Guest => "guest",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Moderator => "Moderator",
            Role::Guest => "Guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts either the principal name or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Administrator),
            "moderator" => Ok(Role::Moderator),
            "guest" => Ok(Role::Guest),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One of the eight actions the menu offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateStore,
    DeleteStore,
    ClearTable,
    AddRecord,
    SearchRecord,
    UpdateRecord,
    DeleteRecord,
    ViewAll,
}

impl Operation {
    /// Menu order.
    pub const ALL: [Operation; 8] = [
        Operation::CreateStore,
        Operation::DeleteStore,
        Operation::ClearTable,
        Operation::AddRecord,
        Operation::SearchRecord,
        Operation::UpdateRecord,
        Operation::DeleteRecord,
        Operation::ViewAll,
    ];

    /// Command label shown in the menu and in denial messages.
    pub fn label(self) -> &'static str {
        match self {
            Operation::CreateStore => "Create Database",
            Operation::DeleteStore => "Delete Database",
            Operation::ClearTable => "Clear Table",
            Operation::AddRecord => "Add Record",
            Operation::SearchRecord => "Search Record",
            Operation::UpdateRecord => "Update Record",
            Operation::DeleteRecord => "Delete Record",
            Operation::ViewAll => "View All",
        }
    }

    /// Lowest tier allowed to run this operation.
    pub fn required_role(self) -> Role {
        match self {
            Operation::CreateStore | Operation::DeleteStore => Role::Administrator,
            Operation::ClearTable
            | Operation::AddRecord
            | Operation::UpdateRecord
            | Operation::DeleteRecord => Role::Moderator,
            Operation::SearchRecord | Operation::ViewAll => Role::Guest,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decide whether `role` may run `operation`. Reads stay open to every tier,
/// mutations need Moderator, and catalog lifecycle is Administrator only.
pub fn is_authorized(role: Role, operation: Operation) -> bool {
    match (role, operation) {
        (Role::Administrator, _) => true,
        (Role::Moderator, Operation::CreateStore | Operation::DeleteStore) => false,
        (Role::Moderator, _) => true,
        (Role::Guest, Operation::SearchRecord | Operation::ViewAll) => true,
        (Role::Guest, _) => false,
    }
}
