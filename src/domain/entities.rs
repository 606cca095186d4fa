//! Domain entities mirrored from the judge's relational schema.
//!
//! Everything here is read-only from this service's point of view: the
//! tables are owned by the judge proper, and the feed pages only filter
//! and present them.

use time::OffsetDateTime;

/// A profile attached to a blog post, kept alongside the post so the
/// author check never needs a second round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAuthor {
    pub id: i64,
    pub username: String,
}

/// An organization attached to a blog post or held by a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// A blog post aggregate: the row plus its author and organization links.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPostRecord {
    pub id: i64,
    pub title: String,
    pub content_markdown: String,
    pub og_image: Option<String>,
    pub visible: bool,
    pub sticky: bool,
    pub publish_on: OffsetDateTime,
    pub is_organization_private: bool,
    pub authors: Vec<PostAuthor>,
    pub organizations: Vec<OrganizationRecord>,
}

impl BlogPostRecord {
    pub fn has_author(&self, profile_id: i64) -> bool {
        self.authors.iter().any(|author| author.id == profile_id)
    }

    pub fn organization_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.organizations.iter().map(|org| org.id)
    }
}

/// The item a ticket was opened against, when it still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLink {
    pub label: String,
    pub url: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub owner_username: String,
    pub is_open: bool,
    pub created_at: OffsetDateTime,
    pub assignee_ids: Vec<i64>,
    pub linked_item: Option<TicketLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: i64,
    /// Page key of the commented item, e.g. `b:42` for blog post 42.
    pub page: String,
    pub author_id: i64,
    pub author_username: String,
    pub body_markdown: String,
    pub hidden: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub id: i64,
    pub username: String,
    pub rating: Option<i32>,
    pub performance_points: f64,
    pub is_unlisted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContestRecord {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub is_visible: bool,
    pub is_organization_private: bool,
}

/// The viewer's live contest participation, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationRecord {
    pub contest_id: i64,
    pub contest_key: String,
    pub contest_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClarificationRecord {
    pub id: i64,
    pub problem_code: String,
    pub problem_name: String,
    pub body: String,
    pub date: OffsetDateTime,
}

/// Sitewide counters shown in the feed sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteCounts {
    pub users: i64,
    pub problems: i64,
    pub submissions: i64,
    pub languages: i64,
}
