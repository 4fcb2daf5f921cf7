//! Caller-facing portal operations.
//!
//! Every method returns domain values. Transport failures are logged and
//! replaced with fallback data; the only error a caller can see is a rejected
//! property identifier.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;

use crate::cache::CacheStats;
use crate::config::ClientConfig;
use crate::types::{
  is_numeric_id, HistoryEntry, MarketInsight, PropertyDetail, PropertyStats, PropertySummary,
  ResponseEnvelope, School, SearchFilters,
};

use super::client::ApiClient;
use super::error::ClientError;
use super::fallback;
use super::metrics::PerformanceStats;
use super::transport::RequestOptions;
use super::types::{Listing, ListingDetail, Overview};

/// High-level client for the property portal API.
#[derive(Clone)]
pub struct PropertyPortal {
  api: ApiClient,
}

impl PropertyPortal {
  pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
    Ok(Self::from_client(ApiClient::new(config)?))
  }

  pub fn from_client(api: ApiClient) -> Self {
    Self { api }
  }

  /// Request `endpoint` and decode `data` as `T`.
  /// A `success: false` envelope or a missing payload is [`ClientError::Unsuccessful`].
  async fn fetch_data<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    options: &RequestOptions,
  ) -> Result<T, ClientError> {
    let envelope = self.api.request(endpoint, options).await?.data;
    match envelope.data {
      Some(data) if envelope.success => Ok(serde_json::from_value(data)?),
      _ => Err(ClientError::Unsuccessful(
        envelope
          .message
          .unwrap_or_else(|| format!("Request to {} was unsuccessful", endpoint)),
      )),
    }
  }

  pub async fn all_properties(&self) -> Vec<Listing> {
    match self.fetch_data::<Vec<PropertySummary>>("properties", &RequestOptions::default()).await {
      Ok(rows) => rows.into_iter().map(Listing::from).collect(),
      Err(e) => {
        tracing::error!("Error fetching properties: {}", e);
        fallback::properties()
      }
    }
  }

  /// Fetch one property. Non-numeric ids are rejected without a request.
  pub async fn property_by_id(&self, id: &str) -> Result<ListingDetail, ClientError> {
    let id = id.trim();
    if !is_numeric_id(id) {
      return Err(ClientError::InvalidIdentifier(id.to_string()));
    }

    let endpoint = format!("properties/{}", id);
    match self.fetch_data::<PropertyDetail>(&endpoint, &RequestOptions::default()).await {
      Ok(detail) => Ok(ListingDetail::from(detail)),
      Err(e) => {
        tracing::error!("Error fetching property {}: {}", id, e);
        let id = id.parse::<i64>().unwrap_or_default();
        Ok(ListingDetail::from(fallback::property(id)))
      }
    }
  }

  /// Search by address phrase. Queries shorter than two characters return
  /// nothing without touching the network.
  pub async fn search_properties(&self, query: &str, filters: &SearchFilters) -> Vec<Listing> {
    let query = query.trim();
    if query.chars().count() < 2 {
      return Vec::new();
    }

    let mut params = form_urlencoded::Serializer::new(String::new());
    params.append_pair("query", query);
    for (name, value) in filters.pairs() {
      params.append_pair(name, value);
    }
    let endpoint = format!("search?{}", params.finish());

    match self.fetch_data::<Vec<PropertySummary>>(&endpoint, &RequestOptions::default()).await {
      Ok(rows) => rows.into_iter().map(Listing::from).collect(),
      Err(ClientError::Unsuccessful(message)) => {
        tracing::warn!("Search returned no results: {}", message);
        Vec::new()
      }
      Err(e) => {
        tracing::error!("Error searching properties: {}", e);
        fallback::search(query)
      }
    }
  }

  pub async fn property_history(&self, property_id: i64) -> Vec<HistoryEntry> {
    let endpoint = format!("property-history/{}", property_id);
    self
      .fetch_data(&endpoint, &RequestOptions::default())
      .await
      .unwrap_or_else(|e| {
        tracing::error!("Error fetching property history for {}: {}", property_id, e);
        Vec::new()
      })
  }

  pub async fn market_insights(&self, suburb: Option<&str>) -> Vec<MarketInsight> {
    let endpoint = with_query("market-insights", &[("suburb", suburb)]);
    self
      .fetch_data(&endpoint, &RequestOptions::default())
      .await
      .unwrap_or_else(|e| {
        tracing::error!("Error fetching market insights: {}", e);
        Vec::new()
      })
  }

  pub async fn schools(&self, suburb: Option<&str>, postcode: Option<&str>) -> Vec<School> {
    let endpoint = with_query("schools", &[("suburb", suburb), ("postcode", postcode)]);
    self
      .fetch_data(&endpoint, &RequestOptions::default())
      .await
      .unwrap_or_else(|e| {
        tracing::error!("Error fetching schools: {}", e);
        Vec::new()
      })
  }

  pub async fn property_stats(&self) -> PropertyStats {
    self
      .fetch_data("stats", &RequestOptions::default())
      .await
      .unwrap_or_else(|e| {
        tracing::error!("Error fetching stats: {}", e);
        PropertyStats::default()
      })
  }

  /// Raw health envelope, never cached. Failures become a `success: false` envelope.
  pub async fn health_check(&self) -> ResponseEnvelope<Value> {
    match self.api.request("health", &RequestOptions::uncached()).await {
      Ok(result) => result.data,
      Err(e) => {
        tracing::error!("API health check failed: {}", e);
        ResponseEnvelope::failure(e.to_string())
      }
    }
  }

  /// Listings, insights, schools and stats, fetched concurrently.
  pub async fn overview(&self) -> Overview {
    let (properties, market_insights, schools, stats) = futures::join!(
      self.all_properties(),
      self.market_insights(None),
      self.schools(None, None),
      self.property_stats(),
    );

    Overview {
      properties,
      market_insights,
      schools,
      stats,
    }
  }

  pub fn clear_cache(&self) {
    self.api.clear_cache();
  }

  pub fn cache_stats(&self) -> CacheStats {
    self.api.cache_stats()
  }

  pub fn performance_stats(&self) -> PerformanceStats {
    self.api.performance_stats()
  }
}

/// `base` with the set parameters appended as a query string.
fn with_query(base: &str, params: &[(&str, Option<&str>)]) -> String {
  let mut serializer = form_urlencoded::Serializer::new(String::new());
  let mut any = false;
  for (name, value) in params {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
      serializer.append_pair(name, value);
      any = true;
    }
  }

  if any {
    format!("{}?{}", base, serializer.finish())
  } else {
    base.to_string()
  }
}
