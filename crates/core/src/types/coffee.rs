//! Coffee catalog entries and their validated write payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use super::id::CoffeeId;
use super::price::{Price, PriceError};
use super::tag::Tag;

/// Errors that can occur when validating coffee fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoffeeError {
    /// The name is empty or whitespace.
    #[error("name cannot be empty")]
    EmptyName,
    /// The description is too short or too long.
    #[error("description must be between {min} and {max} characters (got {actual})")]
    DescriptionLength {
        /// Minimum number of characters.
        min: usize,
        /// Maximum number of characters.
        max: usize,
        /// Length of the rejected description.
        actual: usize,
    },
    /// The price violates the price rules.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),
    /// The image reference is not an absolute http(s) URL.
    #[error("image URL is invalid: {0}")]
    InvalidImageUrl(String),
    /// A new coffee must reference at least one tag.
    #[error("at least one tag ID is required")]
    NoTags,
}

/// A catalog entry with its resolved tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coffee {
    /// Unique coffee ID.
    pub id: CoffeeId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Price, at most two decimal places.
    pub price: Price,
    /// Image reference.
    pub image_url: String,
    /// When the coffee was created.
    pub created_at: DateTime<Utc>,
    /// When the coffee was last updated.
    pub updated_at: DateTime<Utc>,
    /// Associated tags, ordered by name then ID.
    pub tags: Vec<Tag>,
}

/// Validated fields for a coffee that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoffee {
    /// Display name (trimmed, non-empty).
    pub name: String,
    /// Description.
    pub description: String,
    /// Price.
    pub price: Price,
    /// Image reference.
    pub image_url: String,
}

impl NewCoffee {
    /// Minimum description length, in characters.
    pub const DESCRIPTION_MIN: usize = 10;
    /// Maximum description length, in characters.
    pub const DESCRIPTION_MAX: usize = 200;

    /// Validate the fields of a new coffee.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks: empty name, description
    /// outside 10-200 characters, invalid price, or an image URL that is not
    /// an absolute `http`/`https` URL.
    pub fn new(
        name: &str,
        description: &str,
        price: Decimal,
        image_url: &str,
    ) -> Result<Self, CoffeeError> {
        Ok(Self {
            name: validate_name(name)?,
            description: validate_description(description)?,
            price: Price::new(price)?,
            image_url: validate_image_url(image_url)?,
        })
    }
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoffeeChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New price.
    pub price: Option<Price>,
    /// New image reference.
    pub image_url: Option<String>,
}

impl CoffeeChanges {
    /// Validate the supplied fields of a partial update.
    ///
    /// # Errors
    ///
    /// Applies the same rules as [`NewCoffee::new`] to every field that is
    /// present.
    pub fn new(
        name: Option<&str>,
        description: Option<&str>,
        price: Option<Decimal>,
        image_url: Option<&str>,
    ) -> Result<Self, CoffeeError> {
        Ok(Self {
            name: name.map(validate_name).transpose()?,
            description: description.map(validate_description).transpose()?,
            price: price.map(Price::new).transpose()?,
            image_url: image_url.map(validate_image_url).transpose()?,
        })
    }

    /// Whether no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
    }
}

fn validate_name(name: &str) -> Result<String, CoffeeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoffeeError::EmptyName);
    }
    Ok(name.to_owned())
}

fn validate_description(description: &str) -> Result<String, CoffeeError> {
    let actual = description.chars().count();
    if !(NewCoffee::DESCRIPTION_MIN..=NewCoffee::DESCRIPTION_MAX).contains(&actual) {
        return Err(CoffeeError::DescriptionLength {
            min: NewCoffee::DESCRIPTION_MIN,
            max: NewCoffee::DESCRIPTION_MAX,
            actual,
        });
    }
    Ok(description.to_owned())
}

fn validate_image_url(image_url: &str) -> Result<String, CoffeeError> {
    let url = Url::parse(image_url).map_err(|e| CoffeeError::InvalidImageUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoffeeError::InvalidImageUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    Ok(image_url.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = "Smooth and creamy espresso drink";
    const IMAGE: &str = "https://example.com/latte.png";

    #[test]
    fn test_new_coffee_valid() {
        let coffee = NewCoffee::new("  Latte ", DESCRIPTION, Decimal::new(350, 2), IMAGE).unwrap();
        assert_eq!(coffee.name, "Latte");
        assert_eq!(coffee.price.to_string(), "3.50");
    }

    #[test]
    fn test_new_coffee_empty_name() {
        assert_eq!(
            NewCoffee::new("   ", DESCRIPTION, Decimal::ONE, IMAGE),
            Err(CoffeeError::EmptyName)
        );
    }

    #[test]
    fn test_new_coffee_description_bounds() {
        assert!(matches!(
            NewCoffee::new("Latte", "short", Decimal::ONE, IMAGE),
            Err(CoffeeError::DescriptionLength { actual: 5, .. })
        ));
        let long = "x".repeat(201);
        assert!(matches!(
            NewCoffee::new("Latte", &long, Decimal::ONE, IMAGE),
            Err(CoffeeError::DescriptionLength { actual: 201, .. })
        ));
        assert!(NewCoffee::new("Latte", &"x".repeat(200), Decimal::ONE, IMAGE).is_ok());
    }

    #[test]
    fn test_new_coffee_bad_price() {
        assert!(matches!(
            NewCoffee::new("Latte", DESCRIPTION, Decimal::ZERO, IMAGE),
            Err(CoffeeError::InvalidPrice(PriceError::TooLow { .. }))
        ));
    }

    #[test]
    fn test_new_coffee_bad_image_url() {
        assert!(matches!(
            NewCoffee::new("Latte", DESCRIPTION, Decimal::ONE, "latte.png"),
            Err(CoffeeError::InvalidImageUrl(_))
        ));
        assert!(matches!(
            NewCoffee::new("Latte", DESCRIPTION, Decimal::ONE, "ftp://example.com/a.png"),
            Err(CoffeeError::InvalidImageUrl(_))
        ));
    }

    #[test]
    fn test_changes_validate_only_present_fields() {
        let changes = CoffeeChanges::new(None, None, Some(Decimal::new(425, 2)), None).unwrap();
        assert_eq!(changes.price.unwrap().to_string(), "4.25");
        assert!(changes.name.is_none());
        assert!(!changes.is_empty());

        assert_eq!(
            CoffeeChanges::new(Some(""), None, None, None),
            Err(CoffeeError::EmptyName)
        );
    }

    #[test]
    fn test_changes_default_is_empty() {
        assert!(CoffeeChanges::default().is_empty());
    }
}
