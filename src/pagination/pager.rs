use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// One visible slice of the character list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// An empty list has no renderable page.
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }
}

pub fn total_pages(item_count: usize, page_size: usize) -> usize {
    item_count.div_ceil(page_size)
}

/// Slice `items` into the page at `page_index`.
///
/// A stale index (the list shrank since the page was rendered) is clamped to the
/// last page instead of producing a blank one.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page_index: usize) -> Result<Page<T>, PagerError> {
    if page_size == 0 {
        return Err(PagerError::InvalidArgument("page size must be positive"));
    }

    let total = total_pages(items.len(), page_size);
    if total == 0 {
        return Ok(Page {
            items: vec![],
            page_index: 0,
            total_pages: 0,
            has_prev: false,
            has_next: false,
        });
    }

    let page_index = page_index.min(total - 1);
    let start = page_index * page_size;
    let end = (start + page_size).min(items.len());

    Ok(Page {
        items: items[start..end].to_vec(),
        page_index,
        total_pages: total,
        has_prev: page_index > 0,
        has_next: page_index < total - 1,
    })
}

/// Inclusive range of page numbers to show as shortcuts around `current_page`.
///
/// The window starts `len / 2` pages before the current one (one page for the usual
/// window of three) and slides back inside `[0, total_pages - 1]` when it would run
/// past either end. Returns `None` when there is nothing to show.
pub fn page_window(current_page: usize, total_pages: usize, window_size: usize) -> Option<(usize, usize)> {
    let len = window_size.min(total_pages);
    if len == 0 {
        return None;
    }

    let current_page = current_page.min(total_pages - 1);
    let mut start = current_page.saturating_sub(len / 2);
    if start + len > total_pages {
        start = total_pages - len;
    }

    Some((start, start + len - 1))
}
