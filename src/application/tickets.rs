//! Ticket feed services.

use std::sync::Arc;

use crate::application::feed::FeedError;
use crate::application::pagination::{DiggPaginator, PageBounds};
use crate::application::repos::TicketsRepo;
use crate::domain::entities::TicketRecord;
use crate::domain::viewer::Viewer;
use crate::domain::visibility::{TicketFeedScope, ticket_feed_allowed};

pub const TICKETS_PER_PAGE: u64 = 30;

#[derive(Debug, Clone)]
pub struct TicketFeedPage {
    pub scope: TicketFeedScope,
    pub tickets: Vec<TicketRecord>,
    pub bounds: PageBounds,
}

pub struct TicketFeedService {
    tickets: Arc<dyn TicketsRepo>,
    paginator: DiggPaginator,
}

impl TicketFeedService {
    pub fn new(tickets: Arc<dyn TicketsRepo>) -> Self {
        Self {
            tickets,
            paginator: DiggPaginator::new(TICKETS_PER_PAGE).body(6).padding(2),
        }
    }

    /// One page of the requested ticket feed. Viewers the feed is not for
    /// get an empty page rather than an error.
    pub async fn list_page(
        &self,
        viewer: &Viewer,
        scope: TicketFeedScope,
        number: u32,
    ) -> Result<TicketFeedPage, FeedError> {
        if !ticket_feed_allowed(scope, viewer) {
            let bounds = self.paginator.page(number, 0)?;
            return Ok(TicketFeedPage {
                scope,
                tickets: Vec::new(),
                bounds,
            });
        }
        // ticket_feed_allowed only passes authenticated viewers.
        let Some(profile_id) = viewer.profile_id() else {
            let bounds = self.paginator.page(number, 0)?;
            return Ok(TicketFeedPage {
                scope,
                tickets: Vec::new(),
                bounds,
            });
        };

        let total = match scope {
            TicketFeedScope::Own => self.tickets.count_own_open(profile_id).await?,
            TicketFeedScope::All => self.tickets.count_all_open(profile_id).await?,
        };
        let bounds = self.paginator.page(number, total)?;
        let tickets = match scope {
            TicketFeedScope::Own => {
                self.tickets
                    .list_own_open(profile_id, bounds.offset, bounds.limit)
                    .await?
            }
            TicketFeedScope::All => {
                self.tickets
                    .list_all_open(profile_id, bounds.offset, bounds.limit)
                    .await?
            }
        };

        Ok(TicketFeedPage {
            scope,
            tickets,
            bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::RepoError;
    use crate::domain::viewer::test_support::{member, staff};
    use crate::domain::visibility::ticket_visible_to;

    struct FakeTickets {
        tickets: Vec<TicketRecord>,
    }

    impl FakeTickets {
        fn own(&self, profile_id: i64) -> Vec<TicketRecord> {
            let mut tickets: Vec<_> = self
                .tickets
                .iter()
                .filter(|ticket| ticket.is_open)
                .filter(|ticket| {
                    ticket.owner_id == profile_id || ticket.assignee_ids.contains(&profile_id)
                })
                .cloned()
                .collect();
            tickets.sort_by(|a, b| b.id.cmp(&a.id));
            tickets
        }

        fn all(&self, profile_id: i64) -> Vec<TicketRecord> {
            let viewer = staff(profile_id);
            let mut tickets: Vec<_> = self
                .tickets
                .iter()
                .filter(|ticket| ticket.is_open)
                .filter(|ticket| ticket_visible_to(ticket, &viewer))
                .cloned()
                .collect();
            tickets.sort_by(|a, b| b.id.cmp(&a.id));
            tickets
        }
    }

    #[async_trait]
    impl TicketsRepo for FakeTickets {
        async fn list_own_open(
            &self,
            profile_id: i64,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<TicketRecord>, RepoError> {
            Ok(self
                .own(profile_id)
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn count_own_open(&self, profile_id: i64) -> Result<u64, RepoError> {
            Ok(self.own(profile_id).len() as u64)
        }

        async fn list_all_open(
            &self,
            profile_id: i64,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<TicketRecord>, RepoError> {
            Ok(self
                .all(profile_id)
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn count_all_open(&self, profile_id: i64) -> Result<u64, RepoError> {
            Ok(self.all(profile_id).len() as u64)
        }
    }

    fn ticket(id: i64, owner_id: i64, is_open: bool) -> TicketRecord {
        TicketRecord {
            id,
            title: format!("Ticket {id}"),
            owner_id,
            owner_username: format!("user{owner_id}"),
            is_open,
            created_at: datetime!(2026-05-01 00:00 UTC),
            assignee_ids: Vec::new(),
            linked_item: None,
        }
    }

    fn service(tickets: Vec<TicketRecord>) -> TicketFeedService {
        TicketFeedService::new(Arc::new(FakeTickets { tickets }))
    }

    #[tokio::test]
    async fn anonymous_own_feed_is_empty() {
        let service = service(vec![ticket(1, 10, true)]);
        let page = service
            .list_page(&Viewer::anonymous(), TicketFeedScope::Own, 1)
            .await
            .unwrap();
        assert!(page.tickets.is_empty());
        assert_eq!(page.bounds.total, 0);
    }

    #[tokio::test]
    async fn non_staff_all_feed_is_empty() {
        let service = service(vec![ticket(1, 10, true)]);
        let page = service
            .list_page(&member(10, Vec::new()), TicketFeedScope::All, 1)
            .await
            .unwrap();
        assert!(page.tickets.is_empty());
    }

    #[tokio::test]
    async fn own_feed_lists_owned_and_assigned_open_tickets_newest_first() {
        let mut assigned = ticket(3, 50, true);
        assigned.assignee_ids = vec![10];
        let tickets = vec![
            ticket(1, 10, true),
            ticket(2, 10, false),
            assigned,
            ticket(4, 50, true),
        ];
        let service = service(tickets);

        let page = service
            .list_page(&member(10, Vec::new()), TicketFeedScope::Own, 1)
            .await
            .unwrap();
        let ids: Vec<i64> = page.tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn staff_all_feed_applies_linked_item_filter() {
        let mut private_link = ticket(2, 50, true);
        private_link.linked_item = Some(crate::domain::entities::TicketLink {
            label: "hidden".into(),
            url: "/problem/hidden".into(),
            is_public: false,
        });
        let service = service(vec![ticket(1, 50, true), private_link]);

        let page = service
            .list_page(&staff(30), TicketFeedScope::All, 1)
            .await
            .unwrap();
        let ids: Vec<i64> = page.tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn past_range_page_errors_even_when_authorized() {
        let service = service(vec![ticket(1, 10, true)]);
        assert!(matches!(
            service
                .list_page(&member(10, Vec::new()), TicketFeedScope::Own, 3)
                .await,
            Err(FeedError::Page(_))
        ));
    }
}
