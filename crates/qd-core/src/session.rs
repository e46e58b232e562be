use qd_models::UserId;

/// The signed-in user an operation acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into() }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}
