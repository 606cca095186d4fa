//! Digg-style page-number pagination.
//!
//! Feed pages are addressed by `?page=N` and rendered with a page-range
//! widget that keeps the first and last pages reachable: a leading tail,
//! a body of pages around the current one, and a trailing tail, with gap
//! markers between non-adjacent segments.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page number must be at least 1, got {0}")]
    BelowRange(u32),
    #[error("page {number} is past the last page {last}")]
    PastRange { number: u32, last: u32 },
}

/// One entry of the rendered page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMark {
    Number(u32),
    Gap,
}

/// The slice of a result set corresponding to one page, plus the widget
/// data needed to render its navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBounds {
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub marks: Vec<PageMark>,
}

impl PageBounds {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiggPaginator {
    per_page: u64,
    orphans: u64,
    allow_empty_first_page: bool,
    body: u32,
    tail: u32,
    padding: u32,
    margin: u32,
}

impl DiggPaginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
            orphans: 0,
            allow_empty_first_page: true,
            body: 6,
            tail: 2,
            padding: 2,
            margin: 4,
        }
    }

    pub fn orphans(mut self, orphans: u64) -> Self {
        self.orphans = orphans;
        self
    }

    pub fn body(mut self, body: u32) -> Self {
        self.body = body.max(1);
        self
    }

    pub fn tail(mut self, tail: u32) -> Self {
        self.tail = tail.max(1);
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `total` items. Orphans on the final page are
    /// folded into the one before it.
    pub fn num_pages(&self, total: u64) -> u32 {
        if total == 0 && self.allow_empty_first_page {
            return 1;
        }
        let hits = total.saturating_sub(self.orphans).max(1);
        hits.div_ceil(self.per_page) as u32
    }

    /// Validate a page number against `total` items and produce its bounds
    /// and page-range marks.
    pub fn page(&self, number: u32, total: u64) -> Result<PageBounds, PageError> {
        if number < 1 {
            return Err(PageError::BelowRange(number));
        }
        let num_pages = self.num_pages(total);
        if number > num_pages {
            return Err(PageError::PastRange {
                number,
                last: num_pages,
            });
        }

        let offset = u64::from(number - 1) * self.per_page;
        // The final page absorbs the orphans.
        let limit = if number == num_pages {
            total.saturating_sub(offset)
        } else {
            self.per_page
        };

        Ok(PageBounds {
            number,
            num_pages,
            total,
            offset,
            limit,
            marks: self.marks(number, num_pages),
        })
    }

    /// Compose leading tail, main body, and trailing tail with gap markers.
    fn marks(&self, number: u32, num_pages: u32) -> Vec<PageMark> {
        let number = i64::from(number);
        let num_pages = i64::from(num_pages);
        let body = i64::from(self.body);
        let tail = i64::from(self.tail);
        let padding = i64::from(self.padding);
        let margin = i64::from(self.margin);

        // Centre the body on the current page, then clamp it into range.
        let mut main = (number - body / 2 + 1, number + (body + 1) / 2);
        if main.0 < 1 {
            let shift = 1 - main.0;
            main = (main.0 + shift, main.1 + shift);
        }
        if main.1 > num_pages {
            let shift = main.1 - num_pages;
            main = (main.0 - shift, main.1 - shift);
        }

        let leading = if main.0 <= tail + margin {
            main = (1, (number + padding).clamp(body.min(num_pages), num_pages));
            Vec::new()
        } else {
            (1..=tail).collect::<Vec<_>>()
        };

        let trailing = if main.1 >= num_pages - (tail + margin) + 1 {
            if leading.is_empty() {
                main = (1, num_pages);
            } else {
                main = (
                    (number - padding)
                        .min(num_pages - body + 1)
                        .max(main.0)
                        .max(1),
                    num_pages,
                );
            }
            Vec::new()
        } else {
            (num_pages - tail + 1..=num_pages).collect::<Vec<_>>()
        };

        main = (main.0.max(1), main.1.min(num_pages));

        let mut marks = Vec::new();
        for page in leading {
            marks.push(PageMark::Number(page as u32));
        }
        if !marks.is_empty() {
            marks.push(PageMark::Gap);
        }
        for page in main.0..=main.1 {
            marks.push(PageMark::Number(page as u32));
        }
        if !trailing.is_empty() {
            marks.push(PageMark::Gap);
            for page in trailing {
                marks.push(PageMark::Number(page as u32));
            }
        }
        marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(marks: &[PageMark]) -> Vec<u32> {
        marks
            .iter()
            .filter_map(|mark| match mark {
                PageMark::Number(n) => Some(*n),
                PageMark::Gap => None,
            })
            .collect()
    }

    fn digg() -> DiggPaginator {
        DiggPaginator::new(10).body(6).padding(2)
    }

    #[test]
    fn empty_first_page_is_allowed() {
        let bounds = digg().page(1, 0).expect("empty first page");
        assert_eq!(bounds.num_pages, 1);
        assert_eq!(bounds.limit, 0);
        assert_eq!(numbers(&bounds.marks), vec![1]);
    }

    #[test]
    fn page_zero_and_past_range_fail() {
        assert_eq!(digg().page(0, 100), Err(PageError::BelowRange(0)));
        assert_eq!(
            digg().page(11, 100),
            Err(PageError::PastRange {
                number: 11,
                last: 10
            })
        );
    }

    #[test]
    fn offsets_cover_the_result_set_exactly_once() {
        let paginator = digg();
        let total = 95;
        let mut seen = 0;
        for number in 1..=paginator.num_pages(total) {
            let bounds = paginator.page(number, total).expect("valid page");
            assert_eq!(bounds.offset, seen);
            seen += bounds.limit;
        }
        assert_eq!(seen, total);
    }

    #[test]
    fn orphans_fold_into_the_previous_page() {
        let paginator = DiggPaginator::new(10).orphans(3);
        assert_eq!(paginator.num_pages(13), 1);
        let bounds = paginator.page(1, 13).expect("valid page");
        assert_eq!(bounds.limit, 13);

        assert_eq!(paginator.num_pages(14), 2);
    }

    #[test]
    fn first_page_of_long_feed_shows_body_and_trailing_tail() {
        let bounds = digg().page(1, 200).expect("valid page");
        assert_eq!(bounds.num_pages, 20);
        assert_eq!(
            bounds.marks,
            vec![
                PageMark::Number(1),
                PageMark::Number(2),
                PageMark::Number(3),
                PageMark::Number(4),
                PageMark::Number(5),
                PageMark::Number(6),
                PageMark::Gap,
                PageMark::Number(19),
                PageMark::Number(20),
            ]
        );
    }

    #[test]
    fn middle_page_shows_both_tails() {
        let bounds = digg().page(10, 200).expect("valid page");
        let pages = numbers(&bounds.marks);
        assert!(pages.starts_with(&[1, 2]));
        assert!(pages.ends_with(&[19, 20]));
        assert!(pages.contains(&10));
        assert_eq!(
            bounds.marks.iter().filter(|m| **m == PageMark::Gap).count(),
            2
        );
    }

    #[test]
    fn last_page_merges_into_trailing_range() {
        let bounds = digg().page(20, 200).expect("valid page");
        let pages = numbers(&bounds.marks);
        assert!(pages.starts_with(&[1, 2]));
        assert_eq!(*pages.last().expect("nonempty"), 20);
        // No gap between the body and the final page.
        assert!(matches!(bounds.marks.last(), Some(PageMark::Number(20))));
    }

    #[test]
    fn short_feeds_render_every_page() {
        let bounds = digg().page(2, 40).expect("valid page");
        assert_eq!(numbers(&bounds.marks), vec![1, 2, 3, 4]);
        assert!(!bounds.marks.contains(&PageMark::Gap));
    }

    #[test]
    fn current_page_always_appears() {
        let paginator = digg();
        let total = 500;
        for number in 1..=paginator.num_pages(total) {
            let bounds = paginator.page(number, total).expect("valid page");
            assert!(
                numbers(&bounds.marks).contains(&number),
                "page {number} missing from its own range"
            );
            assert!(numbers(&bounds.marks).contains(&1));
            assert!(numbers(&bounds.marks).contains(&bounds.num_pages));
        }
    }
}
