//! Static listings served when the API cannot be reached.

use crate::types::{Coordinates, Property};

use super::types::Listing;

#[allow(clippy::too_many_arguments)]
fn fallback_property(
  id: i64,
  address: &str,
  suburb: &str,
  postcode: &str,
  property_type: &str,
  price: i64,
  (bedrooms, bathrooms, parking): (u32, u32, u32),
  features: &[&str],
  image: &str,
  (lat, lng): (f64, f64),
) -> Property {
  Property {
    id,
    address: address.to_string(),
    suburb: suburb.to_string(),
    state: "QLD".to_string(),
    postcode: postcode.to_string(),
    property_type: property_type.to_string(),
    price: Some(price),
    bedrooms,
    bathrooms,
    parking_spaces: Some(parking),
    land_area: None,
    floor_area: None,
    year_built: None,
    description: None,
    features: features.iter().map(|f| f.to_string()).collect(),
    images: vec![image.to_string()],
    coordinates: Some(Coordinates { lat, lng }),
    created_at: None,
    updated_at: None,
  }
}

pub fn properties() -> Vec<Listing> {
  vec![
    fallback_property(
      1,
      "24 Arthur Street",
      "Woody Point",
      "4019",
      "House",
      850_000,
      (4, 2, 2),
      &["Air Conditioning", "Built-in Wardrobes", "Garden"],
      "/assets/images/sample-property-1.jpg",
      (-27.2631, 153.1097),
    ),
    fallback_property(
      2,
      "15 Marine Parade",
      "Redcliffe",
      "4020",
      "House",
      920_000,
      (3, 2, 2),
      &["Modern Kitchen", "Large Backyard", "Double Garage"],
      "/assets/images/sample-property-2.jpg",
      (-27.2308, 153.1106),
    ),
  ]
  .into_iter()
  .map(Listing::from)
  .collect()
}

/// The fallback listing with `id`, or the first one.
pub fn property(id: i64) -> Listing {
  let mut all = properties();
  let index = all.iter().position(|l| l.property.id == id).unwrap_or(0);
  all.swap_remove(index)
}

/// Fallback listings whose address or suburb contains `query`, case-insensitively.
pub fn search(query: &str) -> Vec<Listing> {
  let needle = query.trim().to_lowercase();
  properties()
    .into_iter()
    .filter(|l| {
      l.property.address.to_lowercase().contains(&needle)
        || l.property.suburb.to_lowercase().contains(&needle)
    })
    .collect()
}
