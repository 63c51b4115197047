//! Keystroke gating for restricted-edit mode.
//!
//! In restricted mode the user can only move forward: deleting and moving
//! the cursor backwards or up are dropped before they reach the buffer.
//! A dropped key is not an error; the caller discards it silently.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::context::SessionContext;

/// A keystroke, classified by what it would do to the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    /// Insert text at the cursor (newlines included).
    Insert(SmolStr),
    DeleteBackward,
    DeleteForward,
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
}

impl EditOp {
    /// Whether restricted mode blocks this class of key.
    pub fn is_restricted(&self) -> bool {
        matches!(
            self,
            EditOp::DeleteBackward | EditOp::DeleteForward | EditOp::CursorLeft | EditOp::CursorUp
        )
    }

    /// Whether the op changes buffer content (as opposed to moving the cursor).
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            EditOp::Insert(_) | EditOp::DeleteBackward | EditOp::DeleteForward
        )
    }
}

/// Decides whether a keystroke may reach the buffer.
pub struct EditGate;

impl EditGate {
    /// Returns false for restricted key classes while restricted mode is on.
    pub fn allow(ctx: &SessionContext, op: &EditOp) -> bool {
        let allowed = !(ctx.restricted_edit && op.is_restricted());
        if !allowed {
            tracing::trace!(?op, "key dropped by restricted mode");
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_ops() -> Vec<EditOp> {
        vec![
            EditOp::Insert("x".into()),
            EditOp::DeleteBackward,
            EditOp::DeleteForward,
            EditOp::CursorLeft,
            EditOp::CursorRight,
            EditOp::CursorUp,
            EditOp::CursorDown,
        ]
    }

    #[test]
    fn test_unrestricted_allows_everything() {
        let ctx = SessionContext::default();
        assert!(all_ops().iter().all(|op| EditGate::allow(&ctx, op)));
    }

    #[test]
    fn test_restricted_blocks_exactly_four_classes() {
        let ctx = SessionContext {
            restricted_edit: true,
            ..Default::default()
        };
        let blocked: Vec<_> = all_ops()
            .into_iter()
            .filter(|op| !EditGate::allow(&ctx, op))
            .collect();
        assert_eq!(
            blocked,
            vec![
                EditOp::DeleteBackward,
                EditOp::DeleteForward,
                EditOp::CursorLeft,
                EditOp::CursorUp,
            ]
        );
        assert!(EditGate::allow(&ctx, &EditOp::Insert("a".into())));
    }

    #[test]
    fn test_toggling_restores_allowances() {
        let mut ctx = SessionContext {
            restricted_edit: true,
            ..Default::default()
        };
        assert!(!EditGate::allow(&ctx, &EditOp::DeleteBackward));
        ctx.restricted_edit = false;
        assert!(EditGate::allow(&ctx, &EditOp::DeleteBackward));
    }
}
