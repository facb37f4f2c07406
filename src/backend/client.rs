//! Minimal client for the PocketBase records API.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::auth::{self, AuthRecord, AuthState};
use super::{quote, PageStore, TextStore};
use crate::block::{Block, Page, TextRecord};
use crate::error::CmsError;

pub const PAGES: &str = "pages";
pub const TEXTS: &str = "texts";

const FULL_LIST_BATCH: u32 = 500;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResult<T> {
    page: u32,
    total_pages: u32,
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    record: AuthRecord,
}

/// Handle to one backend instance. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct PocketBase {
    http: Client,
    base_url: String,
    auth: Rc<RefCell<AuthState>>,
}

impl PartialEq for PocketBase {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url && Rc::ptr_eq(&self.auth, &other.auth)
    }
}

impl PocketBase {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: Rc::new(RefCell::new(auth::load_persisted())),
        }
    }

    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection {
            client: self,
            name: name.to_string(),
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.borrow().clone()
    }

    pub fn sign_out(&self) {
        self.auth.borrow_mut().clear();
        auth::persist(&self.auth.borrow());
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        let auth = self.auth.borrow();
        if auth.token.is_empty() {
            builder
        } else {
            builder.header("Authorization", auth.token.as_str())
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, CmsError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => status.to_string(),
        };
        debug!(status = status.as_u16(), %message, "backend request failed");
        if status.as_u16() == 401 {
            return Err(CmsError::Unauthorized);
        }
        Err(CmsError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

pub struct Collection<'a> {
    client: &'a PocketBase,
    name: String,
}

impl Collection<'_> {
    fn records_path(&self) -> String {
        format!("collections/{}/records", self.name)
    }

    /// Every record matching `filter`, fetched batch by batch.
    pub async fn get_full_list<T: DeserializeOwned>(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<T>, CmsError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let mut query = vec![
                ("page", page.to_string()),
                ("perPage", FULL_LIST_BATCH.to_string()),
                ("skipTotal", "0".to_string()),
            ];
            if let Some(filter) = filter {
                query.push(("filter", filter.to_string()));
            }
            let builder = self
                .client
                .request(Method::GET, &self.records_path())
                .query(&query);
            let batch: ListResult<T> = self.client.send(builder).await?;
            let done = batch.items.is_empty() || batch.page >= batch.total_pages;
            items.extend(batch.items);
            if done {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    pub async fn get_one<T: DeserializeOwned>(&self, id: &str) -> Result<T, CmsError> {
        let path = format!("{}/{}", self.records_path(), id);
        self.client
            .send(self.client.request(Method::GET, &path))
            .await
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<T, CmsError> {
        let builder = self
            .client
            .request(Method::POST, &self.records_path())
            .json(body);
        self.client.send(builder).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        id: &str,
        body: &B,
    ) -> Result<T, CmsError> {
        let path = format!("{}/{}", self.records_path(), id);
        let builder = self.client.request(Method::PATCH, &path).json(body);
        self.client.send(builder).await
    }

    /// Exchange credentials for a session token and keep it on the client.
    pub async fn auth_with_password(
        &self,
        identity: &str,
        password: &str,
    ) -> Result<AuthRecord, CmsError> {
        let path = format!("collections/{}/auth-with-password", self.name);
        let builder = self
            .client
            .request(Method::POST, &path)
            .json(&json!({ "identity": identity, "password": password }));
        let response: AuthResponse = self.client.send(builder).await?;
        let state = AuthState {
            token: response.token,
            record: Some(response.record.clone()),
        };
        auth::persist(&state);
        *self.client.auth.borrow_mut() = state;
        Ok(response.record)
    }
}

#[async_trait(?Send)]
impl PageStore for PocketBase {
    async fn find_pages(&self, filter: &str) -> Result<Vec<Page>, CmsError> {
        self.collection(PAGES).get_full_list(Some(filter)).await
    }

    async fn get_page(&self, id: &str) -> Result<Page, CmsError> {
        self.collection(PAGES).get_one(id).await
    }

    async fn write_structure(
        &self,
        page_id: &str,
        structure: &[Block],
        revision: u64,
    ) -> Result<Page, CmsError> {
        self.collection(PAGES)
            .update(page_id, &json!({ "structure": structure, "revision": revision }))
            .await
    }
}

#[async_trait(?Send)]
impl TextStore for PocketBase {
    async fn find_text(&self, key: &str, lang: &str) -> Result<Option<TextRecord>, CmsError> {
        let filter = format!("key={} && lang={}", quote(key), quote(lang));
        let records: Vec<TextRecord> = self.collection(TEXTS).get_full_list(Some(&filter)).await?;
        Ok(records.into_iter().next())
    }

    async fn create_text(
        &self,
        key: &str,
        lang: &str,
        content: &str,
    ) -> Result<TextRecord, CmsError> {
        self.collection(TEXTS)
            .create(&json!({ "key": key, "lang": lang, "content": content }))
            .await
    }

    async fn update_text(&self, id: &str, content: &str) -> Result<TextRecord, CmsError> {
        self.collection(TEXTS)
            .update(id, &json!({ "content": content }))
            .await
    }
}
