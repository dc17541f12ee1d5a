use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Pro,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "pro" => Some(Self::Pro),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Pro => "pro",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sale" | "vente" | "بيع" => Some(Self::Sale),
            "rent" | "location" | "كراء" => Some(Self::Rent),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    Apartment,
    House,
    Land,
    Commercial,
    Office,
}

impl ListingCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "apartment" | "appartement" | "شقة" => Some(Self::Apartment),
            "house" | "maison" | "منزل" => Some(Self::House),
            "land" | "terrain" | "أرض" => Some(Self::Land),
            "commercial" | "محل" => Some(Self::Commercial),
            "office" | "bureau" | "مكتب" => Some(Self::Office),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Land => "land",
            Self::Commercial => "commercial",
            Self::Office => "office",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Verified,
    Rejected,
}

impl ListingStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProCategory {
    Plumber,
    Electrician,
    Painter,
    Carpenter,
    Mason,
    Cleaner,
    Mover,
    Ac,
    Gardener,
    Other,
}

impl ProCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "plumber" | "plombier" | "سباك" => Some(Self::Plumber),
            "electrician" | "électricien" | "كهربائي" => Some(Self::Electrician),
            "painter" | "peintre" | "دهان" => Some(Self::Painter),
            "carpenter" | "menuisier" | "نجار" => Some(Self::Carpenter),
            "mason" | "maçon" | "بنّاء" => Some(Self::Mason),
            "cleaner" | "nettoyage" | "تنظيف" => Some(Self::Cleaner),
            "mover" | "déménagement" | "نقل" => Some(Self::Mover),
            "ac" | "climatisation" | "تكييف" => Some(Self::Ac),
            "gardener" | "jardinier" | "بستاني" => Some(Self::Gardener),
            "other" | "autre" | "أخرى" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Plumber => "plumber",
            Self::Electrician => "electrician",
            Self::Painter => "painter",
            Self::Carpenter => "carpenter",
            Self::Mason => "mason",
            Self::Cleaner => "cleaner",
            Self::Mover => "mover",
            Self::Ac => "ac",
            Self::Gardener => "gardener",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub preferred_lang: Locale,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub owner_id: String,
    pub listing_type: ListingType,
    pub category: ListingCategory,
    pub title_fr: String,
    pub title_ar: Option<String>,
    pub title_en: Option<String>,
    pub description_fr: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub price: i64,
    pub price_currency: String,
    pub surface: Option<f64>,
    pub rooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub governorate: String,
    pub city: String,
    pub address: Option<String>,
    pub images: Vec<String>,
    pub status: ListingStatus,
    pub featured: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Browse-page projection of a listing. Display strings are resolved
/// server side for the viewer's locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCard {
    pub id: String,
    pub listing_type: ListingType,
    pub category: ListingCategory,
    pub display_title: String,
    pub display_excerpt: String,
    pub price: i64,
    pub price_currency: String,
    pub surface: Option<f64>,
    pub rooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub governorate: String,
    pub city: String,
    pub cover_image: Option<String>,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactCard {
    pub id: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    pub display_title: String,
    pub display_description: String,
    pub owner: ContactCard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pro {
    pub id: String,
    pub user_id: String,
    pub business_name_fr: String,
    pub business_name_ar: Option<String>,
    pub category: ProCategory,
    pub phone: String,
    pub bio_fr: Option<String>,
    pub bio_ar: Option<String>,
    pub governorates: Vec<String>,
    pub verified: bool,
    pub rating: f32,
    pub reviews_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub pro_id: String,
    pub author_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub listing_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub listing_id: Option<String>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub other_user: ContactCard,
    pub last_message: Message,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_enums_round_trip_their_codes() {
        assert_eq!(ListingType::parse("SALE"), Some(ListingType::Sale));
        assert_eq!(ListingType::parse("location"), Some(ListingType::Rent));
        assert_eq!(
            ListingCategory::parse("terrain"),
            Some(ListingCategory::Land)
        );
        assert_eq!(
            ListingStatus::parse("verified"),
            Some(ListingStatus::Verified)
        );
        assert_eq!(ListingStatus::parse("archived"), None);
        assert_eq!(ProCategory::parse("سباك"), Some(ProCategory::Plumber));
        assert_eq!(ProCategory::Ac.as_code(), "ac");
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let pagination = Pagination::new(2, 12, 25);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.offset(), 12);

        assert_eq!(Pagination::new(1, 12, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 12, 12).total_pages, 1);
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        let value = serde_json::to_value(ListingType::Sale).unwrap();
        assert_eq!(value, serde_json::json!("sale"));
        let role = serde_json::to_value(Role::Admin).unwrap();
        assert_eq!(role, serde_json::json!("admin"));
    }
}
