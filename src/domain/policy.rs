//! The authorization policy: one place that answers "may this requester
//! perform this action", consulted by every mutating handler.

use crate::domain::session::SessionAuth;

/// A requested action on a resource. Ownership of the target travels with
/// the action so the policy stays a pure function.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    ReadPosts,
    ReadComments,
    CreatePost,
    CreateComment,
    /// `owner` is None for anonymous comments.
    EditComment { owner: Option<i32> },
    DeleteComment { owner: Option<i32> },
    DeletePost { owner: i32 },
    ToggleFlag,
}

/// The requester's identity as the policy sees it.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub user_id: Option<i32>,
    pub elevated: bool,
}

impl Requester {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user_id: None,
            elevated: false,
        }
    }

    #[must_use]
    pub fn from_session(auth: Option<&SessionAuth>) -> Self {
        match auth {
            Some(a) => Self {
                user_id: Some(a.user_id),
                elevated: a.elevated(),
            },
            None => Self::anonymous(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(DenyReason),
}

/// Why a request was denied. `AuthenticationRequired` maps to 401 at the
/// boundary, the rest to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AuthenticationRequired,
    NotOwner,
}

#[must_use]
pub fn authorize(action: Action, requester: Requester) -> Decision {
    match action {
        // Reads are always permitted; what an anonymous reader actually
        // sees is the visibility engine's concern, not the policy's.
        Action::ReadPosts | Action::ReadComments => Decision::Permit,

        // Anyone may comment; an authenticated requester becomes the owner.
        Action::CreateComment => Decision::Permit,

        // Any authenticated session suffices; no ownership involved.
        Action::CreatePost | Action::ToggleFlag => match requester.user_id {
            Some(_) => Decision::Permit,
            None => Decision::Deny(DenyReason::AuthenticationRequired),
        },

        Action::EditComment { owner } | Action::DeleteComment { owner } => {
            permit_owner_or_elevated(requester, owner)
        }

        Action::DeletePost { owner } => permit_owner_or_elevated(requester, Some(owner)),
    }
}

fn permit_owner_or_elevated(requester: Requester, owner: Option<i32>) -> Decision {
    if requester.elevated {
        return Decision::Permit;
    }
    match requester.user_id {
        None => Decision::Deny(DenyReason::AuthenticationRequired),
        Some(uid) if owner == Some(uid) => Decision::Permit,
        Some(_) => Decision::Deny(DenyReason::NotOwner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn user(id: i32) -> Requester {
        Requester {
            user_id: Some(id),
            elevated: false,
        }
    }

    const fn admin_elevated(id: i32) -> Requester {
        Requester {
            user_id: Some(id),
            elevated: true,
        }
    }

    #[test]
    fn reads_permitted_for_everyone() {
        assert_eq!(
            authorize(Action::ReadPosts, Requester::anonymous()),
            Decision::Permit
        );
        assert_eq!(
            authorize(Action::ReadComments, Requester::anonymous()),
            Decision::Permit
        );
    }

    #[test]
    fn anonymous_may_comment_but_not_post() {
        assert_eq!(
            authorize(Action::CreateComment, Requester::anonymous()),
            Decision::Permit
        );
        assert_eq!(
            authorize(Action::CreatePost, Requester::anonymous()),
            Decision::Deny(DenyReason::AuthenticationRequired)
        );
    }

    #[test]
    fn flag_toggle_requires_any_session() {
        assert_eq!(
            authorize(Action::ToggleFlag, Requester::anonymous()),
            Decision::Deny(DenyReason::AuthenticationRequired)
        );
        assert_eq!(authorize(Action::ToggleFlag, user(7)), Decision::Permit);
    }

    #[test]
    fn owner_may_edit_own_comment_without_elevation() {
        assert_eq!(
            authorize(Action::EditComment { owner: Some(3) }, user(3)),
            Decision::Permit
        );
    }

    #[test]
    fn non_owner_standard_session_is_denied() {
        assert_eq!(
            authorize(Action::DeleteComment { owner: Some(3) }, user(4)),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn elevated_session_may_moderate_anything() {
        assert_eq!(
            authorize(Action::DeleteComment { owner: Some(3) }, admin_elevated(1)),
            Decision::Permit
        );
        assert_eq!(
            authorize(Action::DeleteComment { owner: None }, admin_elevated(1)),
            Decision::Permit
        );
        assert_eq!(
            authorize(Action::DeletePost { owner: 3 }, admin_elevated(1)),
            Decision::Permit
        );
    }

    #[test]
    fn anonymous_comment_is_only_editable_by_elevated() {
        assert_eq!(
            authorize(Action::EditComment { owner: None }, user(4)),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn non_elevated_admin_gets_no_shortcut() {
        // An admin who has not completed the second factor is a standard
        // session like any other.
        assert_eq!(
            authorize(Action::DeleteComment { owner: Some(3) }, user(1)),
            Decision::Deny(DenyReason::NotOwner)
        );
    }
}
