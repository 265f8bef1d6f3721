use crate::session::auth::normalize_role;
use crate::session::error::PlatformError;
use crate::session::model::Participant;
use async_trait::async_trait;

/// Which members of the guild are eligible for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterFilter {
    AllHumans,
    WithRole(String),
    /// Holders of the role, or every human when nobody holds it.
    WithRoleOrAllHumans(String),
}

impl RosterFilter {
    pub fn with_role(name: &str) -> Self {
        RosterFilter::WithRole(normalize_role(name))
    }

    pub fn with_role_or_all(name: &str) -> Self {
        RosterFilter::WithRoleOrAllHumans(normalize_role(name))
    }
}

/// A guild member as seen by roster filtering.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub participant: Participant,
    pub is_bot: bool,
    pub roles: Vec<String>,
}

/// Applies `filter` to a member listing, preserving order and dropping bots.
pub fn filter_members(members: Vec<MemberInfo>, filter: &RosterFilter) -> Vec<Participant> {
    let humans = members.into_iter().filter(|member| !member.is_bot);

    match filter {
        RosterFilter::AllHumans => humans.map(|member| member.participant).collect(),
        RosterFilter::WithRole(role) => humans
            .filter(|member| holds(member, role))
            .map(|member| member.participant)
            .collect(),
        RosterFilter::WithRoleOrAllHumans(role) => {
            let humans: Vec<MemberInfo> = humans.collect();
            if humans.iter().any(|member| holds(member, role)) {
                humans
                    .into_iter()
                    .filter(|member| holds(member, role))
                    .map(|member| member.participant)
                    .collect()
            } else {
                humans.into_iter().map(|member| member.participant).collect()
            }
        }
    }
}

fn holds(member: &MemberInfo, role: &str) -> bool {
    member.roles.iter().any(|held| normalize_role(held) == role)
}

#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn request_roster(&self, filter: &RosterFilter) -> Result<Vec<Participant>, PlatformError>;
}
