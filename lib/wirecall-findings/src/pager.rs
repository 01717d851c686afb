use tracing::debug;
use wirecall_core::{CallContext, CallError, PageCursor};

use crate::FindingsService;
use crate::models::ApiNote;
use crate::options::ListNotesOptions;

/// Walks the pages of `list_notes`.
///
/// Each page request reuses the initial options, only the page token changes.
/// The pager stops once a page comes back without a next page token.
#[derive(Debug, Clone)]
pub struct NotesPager {
    service: FindingsService,
    options: ListNotesOptions,
    exhausted: bool,
}

impl NotesPager {
    pub(crate) fn new(service: FindingsService, options: ListNotesOptions) -> Self {
        Self {
            service,
            options,
            exhausted: false,
        }
    }

    /// Whether another page can be requested.
    pub fn has_next(&self) -> bool {
        !self.exhausted
    }

    /// Fetches the next page.
    ///
    /// A failed call leaves the pager where it was, so the page can be requested again.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] once every page was read, any other [`CallError`] from the call.
    pub async fn next_page(&mut self, ctx: &CallContext) -> Result<Vec<ApiNote>, CallError> {
        if self.exhausted {
            return Err(CallError::validation("no more pages"));
        }

        let page = self
            .service
            .list_notes(&self.options, ctx)
            .await?
            .into_result();
        match PageCursor::from_page(&page) {
            Some(cursor) => {
                debug!(token = cursor.token(), "next page");
                self.options = cursor.next_options(&self.options);
            }
            None => self.exhausted = true,
        }
        Ok(page.notes)
    }

    /// Reads every remaining page.
    ///
    /// # Errors
    ///
    /// The first [`CallError`] of a page call.
    pub async fn collect_all(mut self, ctx: &CallContext) -> Result<Vec<ApiNote>, CallError> {
        let mut notes = Vec::new();
        while self.has_next() {
            notes.extend(self.next_page(ctx).await?);
        }
        Ok(notes)
    }
}
