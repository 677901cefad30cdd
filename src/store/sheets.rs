use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tokio::sync::Mutex;

use crate::config::SheetsStoreConfig;
use crate::store::{CharacterStore, StoreError, StoreMetadata, StoreResult, SCHEMA_VERSION};

const CHARACTERS_RANGE: &str = "Characters!A:B";
const NAMES_RANGE: &str = "Characters!B:B";
const HEADER: [&str; 2] = ["ID", "Name"];

#[derive(Deserialize, Default)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct ValueRangeBody<'a> {
    values: &'a [Vec<String>],
}

/// Characters kept in a Google Sheets tab: column A holds a 1-based ID, column B the
/// name, row 1 is a header.
pub struct SheetsStore {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
    max_characters: usize,
    // Sheets has no transactions, so mutations go one at a time.
    write_lock: Mutex<()>,
}

impl SheetsStore {
    pub async fn open(config: &SheetsStoreConfig, max_characters: usize) -> StoreResult<Self> {
        let base_url = Url::parse(&config.api_base).map_err(|e| StoreError::Unavailable(format!("invalid sheets api base {:?}: {e}", config.api_base)))?;
        let store = SheetsStore {
            client: Client::new(),
            base_url,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
            max_characters,
            write_lock: Mutex::new(()),
        };

        store.ensure_sheet(&config.initial_characters).await?;
        Ok(store)
    }

    async fn ensure_sheet(&self, initial_characters: &[String]) -> StoreResult<()> {
        let rows = self.read_range(CHARACTERS_RANGE).await?;
        if !rows.is_empty() {
            return Ok(());
        }

        let mut rows = vec![header_row()];
        rows.extend(initial_characters.iter().enumerate().map(|(index, name)| vec![(index + 1).to_string(), name.clone()]));
        self.write_range(CHARACTERS_RANGE, &rows).await?;
        tracing::info!("Initialized characters sheet with {} characters", initial_characters.len());
        Ok(())
    }

    fn values_url(&self, range: &str, suffix: &str) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable("sheets api base cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", format!("{range}{suffix}").as_str()]);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Sheets API request failed with {}: {}", status, body);
        Err(StoreError::Unavailable(format!("sheets api returned {status}")))
    }

    async fn read_range(&self, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let value_range: ValueRange = response.json().await?;
        Ok(value_range.values)
    }

    async fn write_range(&self, range: &str, values: &[Vec<String>]) -> StoreResult<()> {
        let url = self.values_url(range, "")?;
        let request = self.request(Method::PUT, url).query(&[("valueInputOption", "RAW")]).json(&ValueRangeBody { values });
        self.send(request).await?;
        Ok(())
    }

    async fn append_rows(&self, range: &str, values: &[Vec<String>]) -> StoreResult<()> {
        let url = self.values_url(range, ":append")?;
        let request = self
            .request(Method::POST, url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&ValueRangeBody { values });
        self.send(request).await?;
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> StoreResult<()> {
        let url = self.values_url(range, ":clear")?;
        self.send(self.request(Method::POST, url).json(&serde_json::json!({}))).await?;
        Ok(())
    }

    /// Rewrites the tab without blank rows and with IDs renumbered from 1.
    async fn compact(&self) -> StoreResult<()> {
        let rows = self.read_range(CHARACTERS_RANGE).await?;
        let mut compacted = vec![rows.first().cloned().unwrap_or_else(header_row)];
        compacted.extend(character_names(&rows).enumerate().map(|(index, name)| vec![(index + 1).to_string(), name.to_string()]));

        self.clear_range(CHARACTERS_RANGE).await?;
        self.write_range(CHARACTERS_RANGE, &compacted).await
    }
}

fn header_row() -> Vec<String> {
    HEADER.iter().map(|cell| cell.to_string()).collect()
}

/// Names from `Characters!A:B` rows, header and blank rows skipped.
fn character_names(rows: &[Vec<String>]) -> impl Iterator<Item = &str> {
    rows.iter().skip(1).filter_map(|row| row.get(1)).map(String::as_str).filter(|name| !name.trim().is_empty())
}

#[async_trait]
impl CharacterStore for SheetsStore {
    fn backend_name(&self) -> &'static str {
        "sheets"
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        let rows = self.read_range(NAMES_RANGE).await?;
        Ok(rows.iter().skip(1).filter_map(|row| row.first()).filter(|name| !name.trim().is_empty()).cloned().collect())
    }

    async fn add(&self, name: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let existing = self.list().await?;
        if existing.iter().any(|existing| existing == name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        if existing.len() >= self.max_characters {
            return Err(StoreError::LimitReached(self.max_characters));
        }

        // The header counts as a row, so the row count is the next ID.
        let rows = self.read_range(CHARACTERS_RANGE).await?;
        let new_id = rows.len().max(1);
        self.append_rows(CHARACTERS_RANGE, &[vec![new_id.to_string(), name.to_string()]]).await?;

        tracing::info!("Character added to spreadsheet: {}", name);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let rows = self.read_range(CHARACTERS_RANGE).await?;
        let row_index = rows.iter().skip(1).position(|row| row.get(1).map(String::as_str) == Some(name)).ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        // +1 for the header, +1 because sheet rows are 1-based.
        let sheet_row = row_index + 2;
        self.clear_range(&format!("Characters!A{sheet_row}:B{sheet_row}")).await?;

        // The row is already cleared at this point.
        if let Err(e) = self.compact().await {
            tracing::error!("Failed to compact character sheet after removing {}: {}", name, e);
            return Err(StoreError::Unavailable(format!("removed {name} but the sheet could not be compacted: {e}")));
        }

        tracing::info!("Character removed from spreadsheet: {}", name);
        Ok(())
    }

    async fn metadata(&self) -> StoreResult<StoreMetadata> {
        Ok(StoreMetadata {
            version: SCHEMA_VERSION.to_string(),
            max_characters: self.max_characters,
            last_updated: Utc::now(),
        })
    }

    async fn health_check(&self) -> bool {
        let mut url = self.base_url.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()]);
            }
            Err(_) => return false,
        }

        match self.send(self.request(Method::GET, url)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Google Sheets health check failed: {}", e);
                false
            }
        }
    }
}
