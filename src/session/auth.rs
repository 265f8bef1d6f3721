use crate::session::error::SessionError;

/// The member invoking a command, reduced to what permission checks need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub is_owner: bool,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: u64, name: impl Into<String>, is_owner: bool, roles: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_owner,
            roles: roles.iter().map(|role| normalize_role(role)).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        let role = normalize_role(role);
        self.roles.iter().any(|held| *held == role)
    }
}

/// Role names are matched case-insensitively everywhere.
pub fn normalize_role(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    OwnerOnly,
    RoleAnyOf(Vec<String>),
}

impl AuthorizationPolicy {
    pub fn role_any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        AuthorizationPolicy::RoleAnyOf(
            roles
                .into_iter()
                .map(|role| normalize_role(role.as_ref()))
                .filter(|role| !role.is_empty())
                .collect(),
        )
    }

    /// Owners pass every policy.
    pub fn permits(&self, actor: &Actor) -> bool {
        if actor.is_owner {
            return true;
        }
        match self {
            AuthorizationPolicy::OwnerOnly => false,
            AuthorizationPolicy::RoleAnyOf(roles) => roles.iter().any(|role| actor.has_role(role)),
        }
    }

    pub fn authorize(&self, actor: &Actor, action: &str) -> Result<(), SessionError> {
        if self.permits(actor) {
            Ok(())
        } else {
            tracing::info!("Denied {} for user_id={} ({})", action, actor.id, actor.name);
            Err(SessionError::unauthorized(actor.name.clone(), action))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Actor {
        Actor::new(1, "sam", false, vec!["Student".into()])
    }

    fn teacher() -> Actor {
        Actor::new(2, "tess", false, vec!["TEACHER".into(), "Student".into()])
    }

    fn owner() -> Actor {
        Actor::new(3, "olive", true, vec![])
    }

    #[test]
    fn role_match_ignores_case() {
        let policy = AuthorizationPolicy::role_any_of(["Teacher", "ta"]);
        assert!(policy.permits(&teacher()));
        assert!(!policy.permits(&student()));
    }

    #[test]
    fn owner_only_rejects_role_holders() {
        let policy = AuthorizationPolicy::OwnerOnly;
        assert!(policy.permits(&owner()));
        assert!(!policy.permits(&teacher()));
    }

    #[test]
    fn owner_passes_role_policies() {
        let policy = AuthorizationPolicy::role_any_of(["teacher"]);
        assert!(policy.permits(&owner()));
    }

    #[test]
    fn denial_names_actor_and_action() {
        let err = AuthorizationPolicy::OwnerOnly
            .authorize(&student(), "assign roles")
            .unwrap_err();
        assert_eq!(err.to_string(), "sam is not allowed to assign roles");
    }

    #[test]
    fn blank_roles_are_dropped() {
        let policy = AuthorizationPolicy::role_any_of(["teacher", " ", ""]);
        assert_eq!(policy, AuthorizationPolicy::RoleAnyOf(vec!["teacher".into()]));
    }
}
