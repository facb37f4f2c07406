//! Access to the hosted backend's `pages` and `texts` collections.
//!
//! The traits are the seam between the editor and the network: the
//! PocketBase client implements them over HTTP, tests implement them in
//! memory.

pub mod auth;
pub mod client;

use async_trait::async_trait;

use crate::block::{Block, BlockPatch, Page, TextRecord};
use crate::error::CmsError;

pub use client::PocketBase;

/// Quote a value for use inside a backend filter expression.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[async_trait(?Send)]
pub trait PageStore {
    async fn find_pages(&self, filter: &str) -> Result<Vec<Page>, CmsError>;

    async fn get_page(&self, id: &str) -> Result<Page, CmsError>;

    /// Overwrite the page's structure and revision unconditionally.
    async fn write_structure(
        &self,
        page_id: &str,
        structure: &[Block],
        revision: u64,
    ) -> Result<Page, CmsError>;

    async fn fetch_page_by_slug(&self, slug: &str) -> Result<Page, CmsError> {
        let filter = format!("slug={}", quote(slug));
        self.find_pages(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CmsError::PageNotFound {
                slug: slug.to_string(),
            })
    }

    /// Merge `patch` into one block of the stored structure. Fails with
    /// `Conflict` when the stored revision is not `expected_revision`.
    async fn patch_block(
        &self,
        page_id: &str,
        block_id: &str,
        patch: &BlockPatch,
        expected_revision: u64,
    ) -> Result<Page, CmsError> {
        let mut page = self.get_page(page_id).await?;
        check_revision(&page, expected_revision)?;
        let block = page
            .structure
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or_else(|| CmsError::BlockNotFound {
                page_id: page_id.to_string(),
                block_id: block_id.to_string(),
            })?;
        patch.apply_to(block);
        self.write_structure(page_id, &page.structure, expected_revision + 1)
            .await
    }

    /// Replace the whole structure, guarded by the same revision check.
    async fn save_structure(
        &self,
        page_id: &str,
        structure: &[Block],
        expected_revision: u64,
    ) -> Result<Page, CmsError> {
        let page = self.get_page(page_id).await?;
        check_revision(&page, expected_revision)?;
        self.write_structure(page_id, structure, expected_revision + 1)
            .await
    }
}

fn check_revision(page: &Page, expected: u64) -> Result<(), CmsError> {
    if page.revision == expected {
        Ok(())
    } else {
        Err(CmsError::Conflict {
            page_id: page.id.clone(),
            expected,
            found: page.revision,
        })
    }
}

#[async_trait(?Send)]
pub trait TextStore {
    async fn find_text(&self, key: &str, lang: &str) -> Result<Option<TextRecord>, CmsError>;

    async fn create_text(&self, key: &str, lang: &str, content: &str)
        -> Result<TextRecord, CmsError>;

    async fn update_text(&self, id: &str, content: &str) -> Result<TextRecord, CmsError>;

    async fn load_text(&self, key: &str, lang: &str) -> Result<Option<String>, CmsError> {
        Ok(self.find_text(key, lang).await?.map(|r| r.content))
    }

    /// Create the (key, lang) record on first save, update it afterwards.
    async fn save_text(&self, key: &str, lang: &str, content: &str) -> Result<TextRecord, CmsError> {
        match self.find_text(key, lang).await? {
            Some(existing) => self.update_text(&existing.id, content).await,
            None => self.create_text(key, lang, content).await,
        }
    }
}
