//! Paging

/// Row limit and offset, applied after join and sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    /// Maximum number of rows; `None` is unlimited
    pub row_limit: Option<usize>,
    /// Rows skipped from the start of the ordered result
    pub offset: usize,
}

impl Limit {
    /// No paging
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(row_limit: usize, offset: usize) -> Self {
        Self {
            row_limit: Some(row_limit),
            offset,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.row_limit.is_none() && self.offset == 0
    }

    /// Cuts the page out of an ordered sequence.
    ///
    /// Returns the page and whether rows remain after it.
    pub fn apply<T>(&self, rows: Vec<T>) -> (Vec<T>, bool) {
        let total = rows.len();
        let page: Vec<T> = rows
            .into_iter()
            .skip(self.offset)
            .take(self.row_limit.unwrap_or(usize::MAX))
            .collect();
        let has_more = self.offset.saturating_add(page.len()) < total;
        (page, has_more)
    }
}
