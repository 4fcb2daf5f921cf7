//! Display-ready listing types returned by [`super::PropertyPortal`].

use serde::{Deserialize, Serialize};

use crate::types::{
  format_price, MarketInsight, Property, PropertyDetail, PropertyStats, PropertySummary,
  SaleRecord, School,
};

pub const DEFAULT_PROPERTY_IMAGE: &str = "/assets/images/default-property.jpg";

/// A property enriched with the fields listing pages render directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
  #[serde(flatten)]
  pub property: Property,
  pub full_address: String,
  pub price_formatted: String,
  pub bedrooms_bathrooms: String,
  pub has_images: bool,
  pub primary_image: String,
  pub slug: String,
  #[serde(default)]
  pub history_count: i64,
  #[serde(default)]
  pub has_history: bool,
  #[serde(default)]
  pub last_sold_date: Option<String>,
  #[serde(default)]
  pub last_sold_price: Option<i64>,
}

impl Listing {
  /// Enhance a bare property. Server-computed display values win when present.
  pub fn enhance(
    property: Property,
    full_address: Option<String>,
    price_formatted: Option<String>,
    history_count: i64,
  ) -> Self {
    let full_address = full_address.unwrap_or_else(|| property.full_address());
    let price_formatted = price_formatted.unwrap_or_else(|| format_price(property.price));
    let bedrooms_bathrooms = format!("{} bed, {} bath", property.bedrooms, property.bathrooms);
    let primary_image = property
      .images
      .first()
      .cloned()
      .unwrap_or_else(|| DEFAULT_PROPERTY_IMAGE.to_string());
    let slug = slugify(&format!("{}-{}", property.address, property.suburb));

    Self {
      has_images: !property.images.is_empty(),
      property,
      full_address,
      price_formatted,
      bedrooms_bathrooms,
      primary_image,
      slug,
      history_count,
      has_history: history_count > 0,
      last_sold_date: None,
      last_sold_price: None,
    }
  }

  /// Attach the most recent sale as computed by the server.
  pub fn with_last_sale(mut self, date: Option<String>, price: Option<i64>) -> Self {
    self.last_sold_date = date;
    self.last_sold_price = price;
    self
  }
}

impl From<Property> for Listing {
  fn from(property: Property) -> Self {
    Self::enhance(property, None, None, 0)
  }
}

impl From<PropertySummary> for Listing {
  fn from(summary: PropertySummary) -> Self {
    let mut listing = Self::enhance(
      summary.property,
      summary.full_address,
      summary.price_formatted,
      summary.history_count,
    )
    .with_last_sale(summary.last_sold_date, summary.last_sold_price);
    listing.has_history = summary.has_history;
    listing
  }
}

/// Single listing with its sale history and nearby schools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetail {
  #[serde(flatten)]
  pub listing: Listing,
  pub avg_price: Option<f64>,
  pub last_activity: Option<String>,
  pub history: Vec<SaleRecord>,
  pub nearby_schools: Vec<School>,
}

impl From<PropertyDetail> for ListingDetail {
  fn from(detail: PropertyDetail) -> Self {
    // History arrives newest first
    let (last_date, last_price) = detail
      .history
      .first()
      .map(|sale| (Some(sale.date.clone()), Some(sale.price)))
      .unwrap_or_default();

    Self {
      listing: Listing::enhance(
        detail.property,
        detail.full_address,
        detail.price_formatted,
        detail.history_count,
      )
      .with_last_sale(last_date, last_price),
      avg_price: detail.avg_price,
      last_activity: detail.last_activity,
      history: detail.history,
      nearby_schools: detail.nearby_schools,
    }
  }
}

impl From<Listing> for ListingDetail {
  fn from(listing: Listing) -> Self {
    Self {
      listing,
      avg_price: None,
      last_activity: None,
      history: Vec::new(),
      nearby_schools: Vec::new(),
    }
  }
}

/// Everything the landing page needs, fetched concurrently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
  pub properties: Vec<Listing>,
  pub market_insights: Vec<MarketInsight>,
  pub schools: Vec<School>,
  pub stats: PropertyStats,
}

/// Lowercase, collapse every non-alphanumeric run into one `-`, trim dashes.
pub fn slugify(input: &str) -> String {
  let mut slug = String::with_capacity(input.len());
  let mut pending_dash = false;
  for ch in input.chars() {
    if ch.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(ch.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  slug
}
