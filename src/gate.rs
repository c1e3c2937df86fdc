//! Edit lock and confirmation slot.
//!
//! At most one draft is being edited at a time, and while one is, nothing may
//! be deleted or published. Destructive actions wait in a single confirmation
//! slot until the user confirms or cancels them.
use log::debug;

use crate::{Draft, DraftError, Result};

/// Action carried out once a confirmation is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    DeleteDraft,
    PublishDraft,
    PublishAll,
}

/// An action waiting for the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub message: String,
    /// Draft the action applies to, captured when the request was made
    pub target: Option<Draft>,
    pub action: PendingAction,
}

#[derive(Debug, Default)]
pub struct Gate {
    editing: Option<String>,
    pending: Option<ConfirmationRequest>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the draft being edited, if any
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn is_locked(&self) -> bool {
        self.editing.is_some()
    }

    /// Takes the edit lock for `id`; re-entering the same draft is allowed
    pub fn start_edit(&mut self, id: &str) -> Result<()> {
        match &self.editing {
            Some(current) if current != id => Err(DraftError::EditLocked {
                id: current.clone(),
            }),
            _ => {
                debug!("Edit lock taken for {}", id);
                self.editing = Some(id.to_string());
                Ok(())
            }
        }
    }

    /// Releases the edit lock, returning the id that held it
    pub fn end_edit(&mut self) -> Option<String> {
        let released = self.editing.take();
        if let Some(id) = &released {
            debug!("Edit lock released for {}", id);
        }
        released
    }

    /// Fails while any draft is being edited
    pub fn ensure_unlocked(&self) -> Result<()> {
        match &self.editing {
            Some(id) => Err(DraftError::EditLocked { id: id.clone() }),
            None => Ok(()),
        }
    }

    /// Parks an action until it is confirmed or cancelled
    pub fn request(&mut self, request: ConfirmationRequest) -> Result<&ConfirmationRequest> {
        if self.pending.is_some() {
            return Err(DraftError::ConfirmationPending);
        }
        debug!("Confirmation requested: {}", request.message);
        Ok(self.pending.insert(request))
    }

    pub fn pending(&self) -> Option<&ConfirmationRequest> {
        self.pending.as_ref()
    }

    /// Clears the slot and hands back the action to run
    pub fn confirm(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take()
    }

    /// Clears the slot without running anything
    pub fn cancel(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str) -> ConfirmationRequest {
        ConfirmationRequest {
            message: message.to_string(),
            target: None,
            action: PendingAction::PublishAll,
        }
    }

    #[test]
    fn only_one_draft_can_be_edited() {
        let mut gate = Gate::new();
        gate.start_edit("a").unwrap();
        gate.start_edit("a").unwrap();

        assert!(matches!(
            gate.start_edit("b"),
            Err(DraftError::EditLocked { ref id }) if id == "a"
        ));
        assert!(gate.ensure_unlocked().is_err());

        assert_eq!(gate.end_edit().as_deref(), Some("a"));
        assert!(gate.start_edit("b").is_ok());
    }

    #[test]
    fn single_pending_confirmation() {
        let mut gate = Gate::new();
        gate.request(request("first")).unwrap();
        assert!(matches!(
            gate.request(request("second")),
            Err(DraftError::ConfirmationPending)
        ));

        let taken = gate.confirm().unwrap();
        assert_eq!(taken.message, "first");
        assert!(gate.pending().is_none());
        assert!(gate.confirm().is_none());
    }

    #[test]
    fn cancel_clears_the_slot() {
        let mut gate = Gate::new();
        gate.request(request("first")).unwrap();
        assert!(gate.cancel().is_some());
        assert!(gate.pending().is_none());
        assert!(gate.request(request("again")).is_ok());
    }
}
