use serde::Serialize;

use crate::ports::Window;

/// Splits an ordered collection into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

/// A resolved, always-valid page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub window: Window,
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `count` items. An empty collection still has
    /// one (empty) page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw `?page=` value against `count` items.
    ///
    /// Missing or non-integer input yields the first page; numbers below 1
    /// clamp to the first page and numbers past the end to the last.
    pub fn resolve(&self, count: u64, raw: Option<&str>) -> PageRequest {
        let num_pages = self.num_pages(count);
        let number = raw.map_or(1, |value| requested_page(value, num_pages));

        PageRequest {
            number,
            num_pages,
            count,
            window: Window {
                offset: (number - 1) * self.per_page,
                limit: Some(self.per_page),
            },
        }
    }
}

/// Clamp a raw page number into `1..=num_pages`. Integers too large for
/// `u64` still count as past the end.
fn requested_page(raw: &str, num_pages: u64) -> u64 {
    let value = raw.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || negative {
        return 1;
    }

    match digits.parse::<u64>() {
        Ok(0) => 1,
        Ok(n) => n.min(num_pages),
        Err(_) => num_pages,
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, items: Vec<T>) -> Self {
        Self {
            items,
            number: request.number,
            num_pages: request.num_pages,
            count: request.count,
            has_previous: request.number > 1,
            has_next: request.number < request.num_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_in_range_page() {
        let request = Paginator::new(3).resolve(10, Some("2"));

        assert_eq!(request.number, 2);
        assert_eq!(request.num_pages, 4);
        assert_eq!(request.window.offset, 3);
        assert_eq!(request.window.limit, Some(3));
    }

    #[test]
    fn non_integer_and_missing_pages_fall_back_to_first() {
        let paginator = Paginator::new(3);

        assert_eq!(paginator.resolve(10, Some("abc")).number, 1);
        assert_eq!(paginator.resolve(10, Some("2.5")).number, 1);
        assert_eq!(paginator.resolve(10, None).number, 1);
    }

    #[test]
    fn out_of_range_pages_clamp_to_the_nearest_end() {
        let paginator = Paginator::new(3);

        assert_eq!(paginator.resolve(10, Some("0")).number, 1);
        assert_eq!(paginator.resolve(10, Some("-4")).number, 1);
        assert_eq!(paginator.resolve(10, Some("99")).number, 4);
        assert_eq!(paginator.resolve(10, Some("99")).window.offset, 9);
    }

    #[test]
    fn integers_beyond_u64_still_clamp_by_sign() {
        let paginator = Paginator::new(3);

        assert_eq!(paginator.resolve(10, Some("99999999999999999999")).number, 4);
        assert_eq!(paginator.resolve(10, Some("-99999999999999999999")).number, 1);
        assert_eq!(paginator.resolve(10, Some(" +2 ")).number, 2);
        assert_eq!(paginator.resolve(10, Some("1e3")).number, 1);
    }

    #[test]
    fn empty_collection_has_a_single_empty_page() {
        let request = Paginator::new(3).resolve(0, Some("5"));
        let page: Page<u8> = Page::new(request, Vec::new());

        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(!page.has_previous);
        assert!(!page.has_next);
    }

    #[test]
    fn zero_page_size_is_treated_as_one() {
        assert_eq!(Paginator::new(0).per_page(), 1);
    }
}
