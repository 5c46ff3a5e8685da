#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Staff = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Staff),
            _ => None,
        }
    }

    /// Roles allowed to approve or reject justifications.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}
