use crate::models::{CustomerDetails, DetailsPatch, IdentityMode, SessionUser};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub mode: IdentityMode,
    pub details: CustomerDetails,
}

impl ResolvedIdentity {
    /// Identity fields of a signed-in customer come from the session and
    /// are not editable.
    pub fn is_locked(&self) -> bool {
        self.mode == IdentityMode::Authenticated
    }
}

/// Decides who is booking. A session user pre-fills and locks the identity;
/// otherwise the guest gets an editable form seeded from `hint`. Notes
/// already typed into `previous` survive either way.
pub fn resolve(
    session_user: Option<&SessionUser>,
    hint: Option<&DetailsPatch>,
    previous: Option<&CustomerDetails>,
) -> ResolvedIdentity {
    let notes = previous
        .and_then(|p| p.notes.clone())
        .or_else(|| hint.and_then(|h| h.notes.clone()));

    match session_user {
        Some(user) => ResolvedIdentity {
            mode: IdentityMode::Authenticated,
            details: CustomerDetails {
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                phone_number: user.phone_number.clone().filter(|p| !p.trim().is_empty()),
                notes,
                password: None,
            },
        },
        None => {
            let mut details = CustomerDetails::default();
            if let Some(hint) = hint {
                apply_patch(&mut details, hint, IdentityMode::Guest);
            }
            details.notes = notes;
            details.password = None;
            ResolvedIdentity {
                mode: IdentityMode::Guest,
                details,
            }
        }
    }
}

/// Copies the set fields of `patch` onto `details`. Locked identity fields
/// are left alone for authenticated customers.
pub fn apply_patch(details: &mut CustomerDetails, patch: &DetailsPatch, mode: IdentityMode) {
    if let Some(notes) = &patch.notes {
        details.notes = Some(notes.clone());
    }

    if mode == IdentityMode::Authenticated {
        if patch.first_name.is_some()
            || patch.last_name.is_some()
            || patch.email.is_some()
            || patch.phone_number.is_some()
            || patch.password.is_some()
        {
            tracing::debug!("ignoring identity edits for signed-in customer");
        }
        return;
    }

    if let Some(v) = &patch.first_name {
        details.first_name = v.clone();
    }
    if let Some(v) = &patch.last_name {
        details.last_name = v.clone();
    }
    if let Some(v) = &patch.email {
        details.email = v.clone();
    }
    if let Some(v) = &patch.phone_number {
        details.phone_number = Some(v.clone());
    }
    if let Some(v) = &patch.password {
        details.password = Some(v.clone());
    }
}
