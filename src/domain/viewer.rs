//! The requesting identity, as resolved by the session middleware.

/// Roles and memberships of an authenticated profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerProfile {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Ids of organizations the profile belongs to.
    pub organizations: Vec<i64>,
    /// Ids of organizations the profile administers.
    pub admin_of: Vec<i64>,
}

/// The viewer of the current request. Anonymous viewers carry no profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    profile: Option<ViewerProfile>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { profile: None }
    }

    pub fn authenticated(profile: ViewerProfile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub fn profile(&self) -> Option<&ViewerProfile> {
        self.profile.as_ref()
    }

    pub fn profile_id(&self) -> Option<i64> {
        self.profile.as_ref().map(|profile| profile.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.is_staff)
    }

    pub fn is_superuser(&self) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.is_superuser)
    }

    pub fn organization_ids(&self) -> &[i64] {
        self.profile
            .as_ref()
            .map(|profile| profile.organizations.as_slice())
            .unwrap_or(&[])
    }

    pub fn in_organization(&self, organization_id: i64) -> bool {
        self.organization_ids().contains(&organization_id)
    }

    pub fn administers(&self, organization_id: i64) -> bool {
        self.profile
            .as_ref()
            .is_some_and(|profile| profile.admin_of.contains(&organization_id))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn member(id: i64, organizations: Vec<i64>) -> Viewer {
        Viewer::authenticated(ViewerProfile {
            id,
            username: format!("user{id}"),
            is_staff: false,
            is_superuser: false,
            organizations,
            admin_of: Vec::new(),
        })
    }

    pub fn staff(id: i64) -> Viewer {
        Viewer::authenticated(ViewerProfile {
            id,
            username: format!("staff{id}"),
            is_staff: true,
            is_superuser: false,
            organizations: Vec::new(),
            admin_of: Vec::new(),
        })
    }
}
