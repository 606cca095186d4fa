//! Visibility and permission predicates.
//!
//! These are the rules the feed pages and the SQL filters both follow. The
//! repository layer expresses the same predicates as WHERE clauses so that
//! pagination can never widen a result set; the functions here are the
//! authoritative form, used for direct fetches and exercised by the tests.

use time::OffsetDateTime;

use crate::domain::entities::{BlogPostRecord, TicketRecord};
use crate::domain::viewer::Viewer;

/// Whether the viewer may see a blog post at all.
///
/// A post is publicly visible once it is marked visible and its publish
/// time has passed. Organization-private posts additionally require the
/// viewer to belong to one of the attached organizations. Authors always
/// see their own posts and superusers see everything, so a draft never
/// 404s on its writer.
pub fn post_visible_to(post: &BlogPostRecord, viewer: &Viewer, now: OffsetDateTime) -> bool {
    if viewer.is_superuser() {
        return true;
    }
    if let Some(profile_id) = viewer.profile_id()
        && post.has_author(profile_id)
    {
        return true;
    }
    if !post.visible || post.publish_on > now {
        return false;
    }
    if post.is_organization_private {
        return post
            .organization_ids()
            .any(|org| viewer.in_organization(org));
    }
    true
}

/// Outcome of the edit-affordance check on a post detail page.
///
/// `editable_organizations` is only populated when `can_edit` holds, and is
/// always a subset of both the post's organizations and the viewer's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditEligibility {
    pub can_edit: bool,
    pub editable_organizations: Vec<i64>,
}

pub fn post_edit_eligibility(post: &BlogPostRecord, viewer: &Viewer) -> EditEligibility {
    let is_author = viewer
        .profile_id()
        .is_some_and(|profile_id| post.has_author(profile_id));
    let is_org_admin = post.organization_ids().any(|org| viewer.administers(org));

    let can_edit = is_author || is_org_admin;
    if !can_edit {
        return EditEligibility::default();
    }

    let editable_organizations = post
        .organization_ids()
        .filter(|org| viewer.in_organization(*org))
        .collect();

    EditEligibility {
        can_edit,
        editable_organizations,
    }
}

/// Which ticket feed is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketFeedScope {
    /// Tickets the viewer owns or is assigned to.
    Own,
    /// Every open ticket, staff only.
    All,
}

/// Whether the viewer may read the given ticket feed at all. A refusal
/// means an empty feed, never an error.
pub fn ticket_feed_allowed(scope: TicketFeedScope, viewer: &Viewer) -> bool {
    match scope {
        TicketFeedScope::Own => viewer.is_authenticated(),
        TicketFeedScope::All => viewer.is_staff(),
    }
}

/// Fine-grained ticket visibility used by the staff-wide feed: staff see a
/// ticket when they own it, are assigned to it, or its linked item is
/// public. Tickets with no surviving linked item stay visible.
pub fn ticket_visible_to(ticket: &TicketRecord, viewer: &Viewer) -> bool {
    let Some(profile_id) = viewer.profile_id() else {
        return false;
    };
    if ticket.owner_id == profile_id || ticket.assignee_ids.contains(&profile_id) {
        return true;
    }
    ticket
        .linked_item
        .as_ref()
        .is_none_or(|link| link.is_public)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::{OrganizationRecord, PostAuthor, TicketLink};
    use crate::domain::viewer::test_support::{member, staff};
    use crate::domain::viewer::{Viewer, ViewerProfile};

    fn org(id: i64) -> OrganizationRecord {
        OrganizationRecord {
            id,
            slug: format!("org-{id}"),
            name: format!("Org {id}"),
        }
    }

    fn post() -> BlogPostRecord {
        BlogPostRecord {
            id: 1,
            title: "Welcome".into(),
            content_markdown: "hello".into(),
            og_image: None,
            visible: true,
            sticky: false,
            publish_on: datetime!(2024-01-01 00:00 UTC),
            is_organization_private: false,
            authors: vec![PostAuthor {
                id: 10,
                username: "alice".into(),
            }],
            organizations: Vec::new(),
        }
    }

    fn now() -> OffsetDateTime {
        datetime!(2024-06-01 00:00 UTC)
    }

    #[test]
    fn public_post_is_visible_to_anonymous() {
        assert!(post_visible_to(&post(), &Viewer::anonymous(), now()));
    }

    #[test]
    fn hidden_post_is_invisible() {
        let mut hidden = post();
        hidden.visible = false;
        assert!(!post_visible_to(&hidden, &Viewer::anonymous(), now()));
        assert!(!post_visible_to(&hidden, &member(99, vec![]), now()));
    }

    #[test]
    fn future_post_is_invisible_until_publish_time() {
        let mut scheduled = post();
        scheduled.publish_on = datetime!(2024-12-01 00:00 UTC);
        assert!(!post_visible_to(&scheduled, &member(99, vec![]), now()));
        assert!(post_visible_to(
            &scheduled,
            &member(99, vec![]),
            datetime!(2024-12-01 00:00 UTC)
        ));
    }

    #[test]
    fn author_sees_own_hidden_post() {
        let mut hidden = post();
        hidden.visible = false;
        assert!(post_visible_to(&hidden, &member(10, vec![]), now()));
    }

    #[test]
    fn org_private_post_requires_membership() {
        let mut private = post();
        private.is_organization_private = true;
        private.organizations = vec![org(5)];

        assert!(!post_visible_to(&private, &Viewer::anonymous(), now()));
        assert!(!post_visible_to(&private, &member(99, vec![7]), now()));
        assert!(post_visible_to(&private, &member(99, vec![5]), now()));
    }

    #[test]
    fn visibility_is_idempotent() {
        let viewer = member(99, vec![5]);
        let mut private = post();
        private.is_organization_private = true;
        private.organizations = vec![org(5)];

        let first = post_visible_to(&private, &viewer, now());
        let second = post_visible_to(&private, &viewer, now());
        assert_eq!(first, second);
    }

    #[test]
    fn non_author_non_admin_cannot_edit() {
        let eligibility = post_edit_eligibility(&post(), &member(99, vec![]));
        assert!(!eligibility.can_edit);
        assert!(eligibility.editable_organizations.is_empty());
    }

    #[test]
    fn author_can_edit() {
        let eligibility = post_edit_eligibility(&post(), &member(10, vec![]));
        assert!(eligibility.can_edit);
    }

    #[test]
    fn org_admin_can_edit_attached_post() {
        let mut attached = post();
        attached.organizations = vec![org(5), org(6)];

        let admin = Viewer::authenticated(ViewerProfile {
            id: 99,
            username: "carol".into(),
            is_staff: false,
            is_superuser: false,
            organizations: vec![5],
            admin_of: vec![5],
        });

        let eligibility = post_edit_eligibility(&attached, &admin);
        assert!(eligibility.can_edit);
        // Only the org the viewer belongs to is offered for scoping.
        assert_eq!(eligibility.editable_organizations, vec![5]);
    }

    #[test]
    fn editable_organizations_stay_a_subset() {
        let mut attached = post();
        attached.organizations = vec![org(5), org(6)];

        let viewer = Viewer::authenticated(ViewerProfile {
            id: 10,
            username: "alice".into(),
            is_staff: false,
            is_superuser: false,
            organizations: vec![6, 7],
            admin_of: Vec::new(),
        });

        let eligibility = post_edit_eligibility(&attached, &viewer);
        assert!(eligibility.can_edit);
        for org_id in &eligibility.editable_organizations {
            assert!(attached.organization_ids().any(|id| id == *org_id));
            assert!(viewer.in_organization(*org_id));
        }
        assert_eq!(eligibility.editable_organizations, vec![6]);
    }

    #[test]
    fn ticket_feeds_degrade_to_empty() {
        assert!(!ticket_feed_allowed(
            TicketFeedScope::Own,
            &Viewer::anonymous()
        ));
        assert!(ticket_feed_allowed(TicketFeedScope::Own, &member(1, vec![])));
        assert!(!ticket_feed_allowed(
            TicketFeedScope::All,
            &member(1, vec![])
        ));
        assert!(ticket_feed_allowed(TicketFeedScope::All, &staff(1)));
    }

    #[test]
    fn staff_ticket_visibility_tracks_linked_item() {
        let ticket = TicketRecord {
            id: 1,
            title: "WA on test 5".into(),
            owner_id: 10,
            owner_username: "alice".into(),
            is_open: true,
            created_at: datetime!(2024-05-01 00:00 UTC),
            assignee_ids: vec![20],
            linked_item: Some(TicketLink {
                label: "aplusb".into(),
                url: "/problem/aplusb".into(),
                is_public: false,
            }),
        };

        // Owner and assignee always see it; other staff need a public item.
        assert!(ticket_visible_to(&ticket, &staff(10)));
        assert!(ticket_visible_to(&ticket, &staff(20)));
        assert!(!ticket_visible_to(&ticket, &staff(30)));

        let mut public = ticket.clone();
        public.linked_item = Some(TicketLink {
            label: "aplusb".into(),
            url: "/problem/aplusb".into(),
            is_public: true,
        });
        assert!(ticket_visible_to(&public, &staff(30)));

        let mut unlinked = ticket;
        unlinked.linked_item = None;
        assert!(ticket_visible_to(&unlinked, &staff(30)));
    }
}
