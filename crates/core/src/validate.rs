use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::locale::Locale;
use crate::models::{ListingCategory, ListingStatus, ListingType, ProCategory};

pub const ITEMS_PER_PAGE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 50;

const TITLE_MIN_LEN: usize = 5;
const TITLE_MAX_LEN: usize = 120;
const DESCRIPTION_MAX_LEN: usize = 2_000;
const ADDRESS_MAX_LEN: usize = 200;
const MAX_IMAGES: usize = 20;
const MAX_ROOMS: i32 = 20;
const MAX_BATHROOMS: i32 = 10;
const SEARCH_MAX_LEN: usize = 200;
const BUSINESS_NAME_MIN_LEN: usize = 2;
const BUSINESS_NAME_MAX_LEN: usize = 120;
const BIO_MAX_LEN: usize = 1_000;
const MESSAGE_MAX_LEN: usize = 2_000;
const COMMENT_MAX_LEN: usize = 1_000;
const FULL_NAME_MIN_LEN: usize = 2;
const FULL_NAME_MAX_LEN: usize = 100;

// Tunisian numbers: eight digits, optional +216 country prefix.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+216)?[0-9]{8}$").expect("valid phone regex"));

#[derive(Debug, Clone, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Error)]
#[error("invalid payload: {} issue(s)", .issues.len())]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            field,
            message: message.into(),
        });
    }

    fn text_len(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.push(field, format!("must be at least {min} characters"));
        } else if len > max {
            self.push(field, format!("must be at most {max} characters"));
        }
    }

    fn optional_len(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.push(field, format!("must be at most {max} characters"));
            }
        }
    }

    fn phone(&mut self, field: &'static str, value: &str) {
        if !PHONE_RE.is_match(value.trim()) {
            self.push(field, "must be a Tunisian phone number");
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues: self.0 })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListing {
    pub listing_type: ListingType,
    pub category: ListingCategory,
    pub title_fr: String,
    pub title_ar: Option<String>,
    pub title_en: Option<String>,
    pub description_fr: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub price: i64,
    #[serde(default = "default_currency")]
    pub price_currency: String,
    pub surface: Option<f64>,
    pub rooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub governorate: String,
    pub city: String,
    pub address: Option<String>,
    pub images: Vec<String>,
}

fn default_currency() -> String {
    "TND".to_string()
}

impl CreateListing {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();

        issues.text_len("title_fr", &self.title_fr, TITLE_MIN_LEN, TITLE_MAX_LEN);
        issues.optional_len("title_ar", self.title_ar.as_deref(), TITLE_MAX_LEN);
        issues.optional_len("title_en", self.title_en.as_deref(), TITLE_MAX_LEN);
        issues.optional_len(
            "description_fr",
            self.description_fr.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        issues.optional_len(
            "description_ar",
            self.description_ar.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        issues.optional_len(
            "description_en",
            self.description_en.as_deref(),
            DESCRIPTION_MAX_LEN,
        );

        if self.price <= 0 {
            issues.push("price", "must be positive");
        }
        if let Some(surface) = self.surface {
            if surface <= 0.0 {
                issues.push("surface", "must be positive");
            }
        }
        if let Some(rooms) = self.rooms {
            if !(0..=MAX_ROOMS).contains(&rooms) {
                issues.push("rooms", format!("must be between 0 and {MAX_ROOMS}"));
            }
        }
        if let Some(bathrooms) = self.bathrooms {
            if !(0..=MAX_BATHROOMS).contains(&bathrooms) {
                issues.push(
                    "bathrooms",
                    format!("must be between 0 and {MAX_BATHROOMS}"),
                );
            }
        }
        if self.governorate.trim().is_empty() {
            issues.push("governorate", "must not be empty");
        }
        if self.city.trim().is_empty() {
            issues.push("city", "must not be empty");
        }
        issues.optional_len("address", self.address.as_deref(), ADDRESS_MAX_LEN);

        if self.images.is_empty() {
            issues.push("images", "at least one image is required");
        } else if self.images.len() > MAX_IMAGES {
            issues.push("images", format!("at most {MAX_IMAGES} images"));
        } else if self.images.iter().any(|image| Url::parse(image).is_err()) {
            issues.push("images", "every image must be a valid URL");
        }

        issues.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateListing {
    pub listing_type: Option<ListingType>,
    pub category: Option<ListingCategory>,
    pub title_fr: Option<String>,
    pub title_ar: Option<String>,
    pub title_en: Option<String>,
    pub description_fr: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub price: Option<i64>,
    pub surface: Option<f64>,
    pub rooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub governorate: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub images: Option<Vec<String>>,
}

impl UpdateListing {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();

        if let Some(title_fr) = self.title_fr.as_deref() {
            issues.text_len("title_fr", title_fr, TITLE_MIN_LEN, TITLE_MAX_LEN);
        }
        issues.optional_len("title_ar", self.title_ar.as_deref(), TITLE_MAX_LEN);
        issues.optional_len("title_en", self.title_en.as_deref(), TITLE_MAX_LEN);
        issues.optional_len(
            "description_fr",
            self.description_fr.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        issues.optional_len(
            "description_ar",
            self.description_ar.as_deref(),
            DESCRIPTION_MAX_LEN,
        );
        issues.optional_len(
            "description_en",
            self.description_en.as_deref(),
            DESCRIPTION_MAX_LEN,
        );

        if let Some(price) = self.price {
            if price <= 0 {
                issues.push("price", "must be positive");
            }
        }
        if let Some(surface) = self.surface {
            if surface <= 0.0 {
                issues.push("surface", "must be positive");
            }
        }
        if let Some(rooms) = self.rooms {
            if !(0..=MAX_ROOMS).contains(&rooms) {
                issues.push("rooms", format!("must be between 0 and {MAX_ROOMS}"));
            }
        }
        if let Some(bathrooms) = self.bathrooms {
            if !(0..=MAX_BATHROOMS).contains(&bathrooms) {
                issues.push(
                    "bathrooms",
                    format!("must be between 0 and {MAX_BATHROOMS}"),
                );
            }
        }
        if let Some(governorate) = self.governorate.as_deref() {
            if governorate.trim().is_empty() {
                issues.push("governorate", "must not be empty");
            }
        }
        if let Some(city) = self.city.as_deref() {
            if city.trim().is_empty() {
                issues.push("city", "must not be empty");
            }
        }
        issues.optional_len("address", self.address.as_deref(), ADDRESS_MAX_LEN);

        if let Some(images) = self.images.as_deref() {
            if images.is_empty() {
                issues.push("images", "at least one image is required");
            } else if images.len() > MAX_IMAGES {
                issues.push("images", format!("at most {MAX_IMAGES} images"));
            } else if images.iter().any(|image| Url::parse(image).is_err()) {
                issues.push("images", "every image must be a valid URL");
            }
        }

        issues.finish()
    }

    /// Folds the patch into an existing listing. Absent fields stay as
    /// they are; every successful edit sends the listing back to
    /// moderation.
    pub fn apply(&self, listing: &mut crate::models::Listing) {
        if let Some(listing_type) = self.listing_type {
            listing.listing_type = listing_type;
        }
        if let Some(category) = self.category {
            listing.category = category;
        }
        if let Some(title_fr) = &self.title_fr {
            listing.title_fr = title_fr.clone();
        }
        if let Some(title_ar) = &self.title_ar {
            listing.title_ar = Some(title_ar.clone());
        }
        if let Some(title_en) = &self.title_en {
            listing.title_en = Some(title_en.clone());
        }
        if let Some(description_fr) = &self.description_fr {
            listing.description_fr = Some(description_fr.clone());
        }
        if let Some(description_ar) = &self.description_ar {
            listing.description_ar = Some(description_ar.clone());
        }
        if let Some(description_en) = &self.description_en {
            listing.description_en = Some(description_en.clone());
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
        if let Some(surface) = self.surface {
            listing.surface = Some(surface);
        }
        if let Some(rooms) = self.rooms {
            listing.rooms = Some(rooms);
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = Some(bathrooms);
        }
        if let Some(governorate) = &self.governorate {
            listing.governorate = governorate.clone();
        }
        if let Some(city) = &self.city {
            listing.city = city.clone();
        }
        if let Some(address) = &self.address {
            listing.address = Some(address.clone());
        }
        if let Some(images) = &self.images {
            listing.images = images.clone();
        }
        listing.status = ListingStatus::Pending;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingFilters {
    pub listing_type: Option<ListingType>,
    pub category: Option<ListingCategory>,
    pub governorate: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub rooms: Option<i32>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ListingFilters {
    fn default() -> Self {
        Self {
            listing_type: None,
            category: None,
            governorate: None,
            min_price: None,
            max_price: None,
            rooms: None,
            search: None,
            page: 1,
            limit: ITEMS_PER_PAGE,
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    issues: &mut Issues,
    field: &'static str,
    value: Option<&String>,
) -> Option<T> {
    let raw = value?;
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            issues.push(field, "must be a number");
            None
        }
    }
}

impl ListingFilters {
    /// Builds filters from raw query parameters, coercing numeric
    /// values the way the search form submits them.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut issues = Issues::default();
        let mut filters = Self::default();

        if let Some(raw) = params.get("type") {
            match ListingType::parse(raw) {
                Some(listing_type) => filters.listing_type = Some(listing_type),
                None => issues.push("type", "must be sale or rent"),
            }
        }
        if let Some(raw) = params.get("category") {
            match ListingCategory::parse(raw) {
                Some(category) => filters.category = Some(category),
                None => issues.push("category", "unknown category"),
            }
        }
        if let Some(governorate) = params.get("governorate") {
            if !governorate.trim().is_empty() {
                filters.governorate = Some(governorate.trim().to_string());
            }
        }

        filters.min_price = parse_number(&mut issues, "min_price", params.get("min_price"));
        filters.max_price = parse_number(&mut issues, "max_price", params.get("max_price"));
        if filters.min_price.is_some_and(|price| price <= 0) {
            issues.push("min_price", "must be positive");
        }
        if filters.max_price.is_some_and(|price| price <= 0) {
            issues.push("max_price", "must be positive");
        }
        filters.rooms = parse_number(&mut issues, "rooms", params.get("rooms"));
        if filters.rooms.is_some_and(|rooms| rooms < 0) {
            issues.push("rooms", "must not be negative");
        }

        if let Some(search) = params.get("search") {
            if search.chars().count() > SEARCH_MAX_LEN {
                issues.push("search", format!("must be at most {SEARCH_MAX_LEN} characters"));
            } else if !search.trim().is_empty() {
                filters.search = Some(search.trim().to_string());
            }
        }

        if let Some(page) = parse_number::<u32>(&mut issues, "page", params.get("page")) {
            if page < 1 {
                issues.push("page", "must be at least 1");
            } else {
                filters.page = page;
            }
        }
        if let Some(limit) = parse_number::<u32>(&mut issues, "limit", params.get("limit")) {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                issues.push("limit", format!("must be between 1 and {MAX_PAGE_SIZE}"));
            } else {
                filters.limit = limit;
            }
        }

        issues.finish()?;
        Ok(filters)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProFilters {
    pub category: Option<ProCategory>,
    pub governorate: Option<String>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProFilters {
    fn default() -> Self {
        Self {
            category: None,
            governorate: None,
            search: None,
            page: 1,
            limit: ITEMS_PER_PAGE,
        }
    }
}

impl ProFilters {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut issues = Issues::default();
        let mut filters = Self::default();

        if let Some(raw) = params.get("category") {
            match ProCategory::parse(raw) {
                Some(category) => filters.category = Some(category),
                None => issues.push("category", "unknown category"),
            }
        }
        if let Some(governorate) = params.get("governorate") {
            if !governorate.trim().is_empty() {
                filters.governorate = Some(governorate.trim().to_string());
            }
        }
        if let Some(search) = params.get("search") {
            if search.chars().count() > SEARCH_MAX_LEN {
                issues.push("search", format!("must be at most {SEARCH_MAX_LEN} characters"));
            } else if !search.trim().is_empty() {
                filters.search = Some(search.trim().to_string());
            }
        }
        if let Some(page) = parse_number::<u32>(&mut issues, "page", params.get("page")) {
            if page < 1 {
                issues.push("page", "must be at least 1");
            } else {
                filters.page = page;
            }
        }
        if let Some(limit) = parse_number::<u32>(&mut issues, "limit", params.get("limit")) {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                issues.push("limit", format!("must be between 1 and {MAX_PAGE_SIZE}"));
            } else {
                filters.limit = limit;
            }
        }

        issues.finish()?;
        Ok(filters)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub to_id: String,
    pub listing_id: Option<String>,
    pub content: String,
}

impl CreateMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        if self.to_id.trim().is_empty() {
            issues.push("to_id", "must not be empty");
        }
        issues.text_len("content", &self.content, 1, MESSAGE_MAX_LEN);
        issues.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleFavorite {
    pub listing_id: String,
}

impl ToggleFavorite {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        if self.listing_id.trim().is_empty() {
            issues.push("listing_id", "must not be empty");
        }
        issues.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPro {
    pub business_name_fr: String,
    pub business_name_ar: Option<String>,
    pub category: ProCategory,
    pub phone: String,
    pub bio_fr: Option<String>,
    pub bio_ar: Option<String>,
    pub governorates: Vec<String>,
}

impl RegisterPro {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text_len(
            "business_name_fr",
            &self.business_name_fr,
            BUSINESS_NAME_MIN_LEN,
            BUSINESS_NAME_MAX_LEN,
        );
        issues.optional_len(
            "business_name_ar",
            self.business_name_ar.as_deref(),
            BUSINESS_NAME_MAX_LEN,
        );
        issues.phone("phone", &self.phone);
        issues.optional_len("bio_fr", self.bio_fr.as_deref(), BIO_MAX_LEN);
        issues.optional_len("bio_ar", self.bio_ar.as_deref(), BIO_MAX_LEN);
        if self.governorates.is_empty() {
            issues.push("governorates", "at least one governorate is required");
        }
        issues.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    pub pro_id: String,
    pub rating: i32,
    pub comment: Option<String>,
}

impl CreateReview {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        if self.pro_id.trim().is_empty() {
            issues.push("pro_id", "must not be empty");
        }
        if !(1..=5).contains(&self.rating) {
            issues.push("rating", "must be between 1 and 5");
        }
        issues.optional_len("comment", self.comment.as_deref(), COMMENT_MAX_LEN);
        issues.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub preferred_lang: Option<Locale>,
}

impl UpdateProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text_len(
            "full_name",
            &self.full_name,
            FULL_NAME_MIN_LEN,
            FULL_NAME_MAX_LEN,
        );
        if let Some(phone) = self.phone.as_deref() {
            if !phone.is_empty() {
                issues.phone("phone", phone);
            }
        }
        if let Some(avatar_url) = self.avatar_url.as_deref() {
            if !avatar_url.is_empty() && Url::parse(avatar_url).is_err() {
                issues.push("avatar_url", "must be a valid URL");
            }
        }
        issues.finish()
    }
}

/// Identity-sync payload pushed by the auth gateway when an upstream
/// account is created or updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProfile {
    pub id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub preferred_lang: Option<Locale>,
}

impl UpsertProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::default();
        issues.text_len(
            "full_name",
            &self.full_name,
            FULL_NAME_MIN_LEN,
            FULL_NAME_MAX_LEN,
        );
        if !self.email.contains('@') {
            issues.push("email", "must be an email address");
        }
        if let Some(phone) = self.phone.as_deref() {
            if !phone.is_empty() {
                issues.phone("phone", phone);
            }
        }
        issues.finish()
    }
}
