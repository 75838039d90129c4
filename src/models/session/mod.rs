// Session module
// Operator session kept on the local profile between runs

use crate::models::event::EventId;

/// Everything the console remembers about the signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub token: Option<String>,
    pub operator_email: Option<String>,
    /// Event created by an interrupted draft submission.
    pub current_event_id: Option<EventId>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
    }
}
