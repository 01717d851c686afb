/// A decoded list response carrying a continuation token.
pub trait Paginated {
    /// The type of the listed items.
    type Item;

    /// The items of this page.
    fn items(&self) -> &[Self::Item];

    /// The token of the next page; absent or empty on the last page.
    fn next_page_token(&self) -> Option<&str>;
}

/// Options of a list operation that accept a page token.
pub trait PagedOptions: Clone {
    /// A copy of these options requesting the page of `token`; every other
    /// parameter is unchanged.
    #[must_use]
    fn with_page_token(&self, token: &str) -> Self;
}

/// Position after a page that has a successor.
///
/// ```rust
/// use wirecall_core::{PageCursor, Paginated};
///
/// struct Page {
///     items: Vec<u32>,
///     next: Option<String>,
/// }
///
/// impl Paginated for Page {
///     type Item = u32;
///
///     fn items(&self) -> &[u32] {
///         &self.items
///     }
///
///     fn next_page_token(&self) -> Option<&str> {
///         self.next.as_deref()
///     }
/// }
///
/// let first = Page { items: vec![1, 2], next: Some("T2".to_string()) };
/// let last = Page { items: vec![3], next: None };
///
/// let cursor = PageCursor::from_page(&first).expect("first page has a successor");
/// assert_eq!(cursor.token(), "T2");
/// assert!(PageCursor::from_page(&last).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    token: String,
}

impl PageCursor {
    /// The cursor after `page`, `None` on the last page.
    ///
    /// A page without items but with a token still has a successor.
    pub fn from_page<P: Paginated + ?Sized>(page: &P) -> Option<Self> {
        page.next_page_token()
            .filter(|token| !token.is_empty())
            .map(|token| Self {
                token: token.to_string(),
            })
    }

    /// The opaque continuation token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The options requesting the next page.
    pub fn next_options<O: PagedOptions>(&self, options: &O) -> O {
        options.with_page_token(&self.token)
    }
}
