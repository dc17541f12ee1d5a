use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dari_core::models::{Favorite, Listing, ListingStatus, Message, Pro, Profile, Review};
use dari_core::validate::{ListingFilters, ProFilters};
use dari_core::Locale;
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};

pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
}

pub trait ListingRepository: Send + Sync {
    async fn get_listing(&self, id: &str) -> Result<Option<Listing>>;
    async fn upsert_listing(&self, listing: &Listing) -> Result<()>;
    async fn delete_listing(&self, id: &str) -> Result<bool>;
    async fn increment_views(&self, id: &str) -> Result<()>;
    async fn search_listings(&self, filters: &ListingFilters) -> Result<(Vec<Listing>, u64)>;
    async fn pending_listings(&self) -> Result<Vec<Listing>>;
}

pub trait FavoriteRepository: Send + Sync {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>>;
    async fn has_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool>;
    async fn add_favorite(&self, favorite: &Favorite) -> Result<()>;
    async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool>;
}

pub trait MessageRepository: Send + Sync {
    async fn insert_message(&self, message: &Message) -> Result<()>;
    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<Message>>;
    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>>;
    async fn mark_conversation_read(&self, user_id: &str, other_id: &str) -> Result<u64>;
    async fn unread_count(&self, user_id: &str) -> Result<u64>;
}

pub trait ProRepository: Send + Sync {
    async fn get_pro(&self, id: &str) -> Result<Option<Pro>>;
    async fn pro_for_user(&self, user_id: &str) -> Result<Option<Pro>>;
    async fn upsert_pro(&self, pro: &Pro) -> Result<()>;
    async fn search_pros(&self, filters: &ProFilters) -> Result<(Vec<Pro>, u64)>;
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn reviews_for_pro(&self, pro_id: &str) -> Result<Vec<Review>>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
    listings: Arc<RwLock<HashMap<String, Listing>>>,
    favorites: Arc<RwLock<HashMap<(String, String), DateTime<Utc>>>>,
    messages: Arc<RwLock<Vec<Message>>>,
    pros: Arc<RwLock<HashMap<String, Pro>>>,
    reviews: Arc<RwLock<Vec<Review>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn order_for_browse(listings: &mut [Listing]) {
    listings.sort_by(|a, b| {
        b.featured
            .cmp(&a.featured)
            .then(b.created_at.cmp(&a.created_at))
    });
}

fn matches_filters(listing: &Listing, filters: &ListingFilters) -> bool {
    if listing.status != ListingStatus::Verified {
        return false;
    }
    if filters
        .listing_type
        .is_some_and(|wanted| listing.listing_type != wanted)
    {
        return false;
    }
    if filters
        .category
        .is_some_and(|wanted| listing.category != wanted)
    {
        return false;
    }
    if filters
        .governorate
        .as_deref()
        .is_some_and(|wanted| listing.governorate != wanted)
    {
        return false;
    }
    if filters.min_price.is_some_and(|min| listing.price < min) {
        return false;
    }
    if filters.max_price.is_some_and(|max| listing.price > max) {
        return false;
    }
    if filters
        .rooms
        .is_some_and(|wanted| listing.rooms.unwrap_or(0) < wanted)
    {
        return false;
    }
    if let Some(term) = filters.search.as_deref() {
        let needle = term.to_lowercase();
        let haystack = [
            Some(listing.title_fr.as_str()),
            listing.title_ar.as_deref(),
            listing.title_en.as_deref(),
        ];
        if !haystack
            .into_iter()
            .flatten()
            .any(|title| title.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    true
}

fn matches_pro_filters(pro: &Pro, filters: &ProFilters) -> bool {
    if filters.category.is_some_and(|wanted| pro.category != wanted) {
        return false;
    }
    if filters
        .governorate
        .as_deref()
        .is_some_and(|wanted| !pro.governorates.iter().any(|entry| entry.as_str() == wanted))
    {
        return false;
    }
    if let Some(term) = filters.search.as_deref() {
        let needle = term.to_lowercase();
        let name_fr = pro.business_name_fr.to_lowercase();
        let name_ar = pro
            .business_name_ar
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !name_fr.contains(&needle) && !name_ar.contains(&needle) {
            return false;
        }
    }
    true
}

fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let offset = (page.saturating_sub(1) as usize) * limit as usize;
    items
        .iter()
        .skip(offset)
        .take(limit as usize)
        .cloned()
        .collect()
}

impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.read().get(id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.profiles
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}

impl ListingRepository for MemoryStore {
    async fn get_listing(&self, id: &str) -> Result<Option<Listing>> {
        Ok(self.listings.read().get(id).cloned())
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        self.listings
            .write()
            .insert(listing.id.clone(), listing.clone());
        Ok(())
    }

    async fn delete_listing(&self, id: &str) -> Result<bool> {
        let removed = self.listings.write().remove(id).is_some();
        if removed {
            self.favorites
                .write()
                .retain(|(_, listing_id), _| listing_id != id);
        }
        Ok(removed)
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        if let Some(listing) = self.listings.write().get_mut(id) {
            listing.views_count += 1;
        }
        Ok(())
    }

    async fn search_listings(&self, filters: &ListingFilters) -> Result<(Vec<Listing>, u64)> {
        let mut matching: Vec<Listing> = self
            .listings
            .read()
            .values()
            .filter(|listing| matches_filters(listing, filters))
            .cloned()
            .collect();
        order_for_browse(&mut matching);

        let total = matching.len() as u64;
        Ok((paginate(&matching, filters.page, filters.limit), total))
    }

    async fn pending_listings(&self) -> Result<Vec<Listing>> {
        let mut pending: Vec<Listing> = self
            .listings
            .read()
            .values()
            .filter(|listing| listing.status == ListingStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}

impl FavoriteRepository for MemoryStore {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let mut entries: Vec<(String, DateTime<Utc>)> = self
            .favorites
            .read()
            .iter()
            .filter(|((owner, _), _)| owner.as_str() == user_id)
            .map(|((_, listing_id), created_at)| (listing_id.clone(), *created_at))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().map(|(listing_id, _)| listing_id).collect())
    }

    async fn has_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        Ok(self
            .favorites
            .read()
            .contains_key(&(user_id.to_string(), listing_id.to_string())))
    }

    async fn add_favorite(&self, favorite: &Favorite) -> Result<()> {
        self.favorites.write().insert(
            (favorite.user_id.clone(), favorite.listing_id.clone()),
            favorite.created_at,
        );
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        Ok(self
            .favorites
            .write()
            .remove(&(user_id.to_string(), listing_id.to_string()))
            .is_some())
    }
}

impl MessageRepository for MemoryStore {
    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.messages.write().push(message.clone());
        Ok(())
    }

    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<Message>> {
        let mut related: Vec<Message> = self
            .messages
            .read()
            .iter()
            .filter(|message| message.from_id == user_id || message.to_id == user_id)
            .cloned()
            .collect();
        related.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(related)
    }

    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let mut thread: Vec<Message> = self
            .messages
            .read()
            .iter()
            .filter(|message| {
                (message.from_id == user_id && message.to_id == other_id)
                    || (message.from_id == other_id && message.to_id == user_id)
            })
            .cloned()
            .collect();
        thread.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(thread)
    }

    async fn mark_conversation_read(&self, user_id: &str, other_id: &str) -> Result<u64> {
        let mut marked = 0_u64;
        for message in self.messages.write().iter_mut() {
            if message.to_id == user_id && message.from_id == other_id && !message.read {
                message.read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|message| message.to_id == user_id && !message.read)
            .count() as u64)
    }
}

impl ProRepository for MemoryStore {
    async fn get_pro(&self, id: &str) -> Result<Option<Pro>> {
        Ok(self.pros.read().get(id).cloned())
    }

    async fn pro_for_user(&self, user_id: &str) -> Result<Option<Pro>> {
        Ok(self
            .pros
            .read()
            .values()
            .find(|pro| pro.user_id == user_id)
            .cloned())
    }

    async fn upsert_pro(&self, pro: &Pro) -> Result<()> {
        self.pros.write().insert(pro.id.clone(), pro.clone());
        Ok(())
    }

    async fn search_pros(&self, filters: &ProFilters) -> Result<(Vec<Pro>, u64)> {
        let mut matching: Vec<Pro> = self
            .pros
            .read()
            .values()
            .filter(|pro| matches_pro_filters(pro, filters))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.verified.cmp(&a.verified).then(
                b.rating
                    .partial_cmp(&a.rating)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        let total = matching.len() as u64;
        Ok((paginate(&matching, filters.page, filters.limit), total))
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        self.reviews.write().push(review.clone());
        Ok(())
    }

    async fn reviews_for_pro(&self, pro_id: &str) -> Result<Vec<Review>> {
        let mut related: Vec<Review> = self
            .reviews
            .read()
            .iter()
            .filter(|review| review.pro_id == pro_id)
            .cloned()
            .collect();
        related.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(related)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
              id TEXT PRIMARY KEY,
              full_name TEXT NOT NULL,
              email TEXT NOT NULL,
              phone TEXT,
              avatar_url TEXT,
              preferred_lang TEXT NOT NULL,
              role TEXT NOT NULL,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
              id TEXT PRIMARY KEY,
              owner_id TEXT NOT NULL,
              listing_type TEXT NOT NULL,
              category TEXT NOT NULL,
              title_fr TEXT NOT NULL,
              title_ar TEXT,
              title_en TEXT,
              description_fr TEXT,
              description_ar TEXT,
              description_en TEXT,
              price INTEGER NOT NULL,
              price_currency TEXT NOT NULL,
              surface REAL,
              rooms INTEGER,
              bathrooms INTEGER,
              governorate TEXT NOT NULL,
              city TEXT NOT NULL,
              address TEXT,
              images_json TEXT NOT NULL,
              status TEXT NOT NULL,
              featured INTEGER NOT NULL,
              views_count INTEGER NOT NULL,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS favorites (
              user_id TEXT NOT NULL,
              listing_id TEXT NOT NULL,
              created_at TEXT NOT NULL,
              PRIMARY KEY (user_id, listing_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
              id TEXT PRIMARY KEY,
              from_id TEXT NOT NULL,
              to_id TEXT NOT NULL,
              listing_id TEXT,
              content TEXT NOT NULL,
              read INTEGER NOT NULL,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pros (
              id TEXT PRIMARY KEY,
              user_id TEXT NOT NULL UNIQUE,
              business_name_fr TEXT NOT NULL,
              business_name_ar TEXT,
              category TEXT NOT NULL,
              phone TEXT NOT NULL,
              bio_fr TEXT,
              bio_ar TEXT,
              governorates_json TEXT NOT NULL,
              verified INTEGER NOT NULL,
              rating REAL NOT NULL,
              reviews_count INTEGER NOT NULL,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
              id TEXT PRIMARY KEY,
              pro_id TEXT NOT NULL,
              author_id TEXT NOT NULL,
              rating INTEGER NOT NULL,
              comment TEXT,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_timestamp(raw: String) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|_| Utc::now())
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> Profile {
    Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        avatar_url: row.get("avatar_url"),
        preferred_lang: Locale::from_optional_str(Some(
            row.get::<String, _>("preferred_lang").as_str(),
        )),
        role: dari_core::models::Role::parse(row.get::<String, _>("role").as_str())
            .unwrap_or(dari_core::models::Role::User),
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn listing_from_row(row: &sqlx::sqlite::SqliteRow) -> Listing {
    let images_json: String = row.get("images_json");
    Listing {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        listing_type: dari_core::models::ListingType::parse(
            row.get::<String, _>("listing_type").as_str(),
        )
        .unwrap_or(dari_core::models::ListingType::Sale),
        category: dari_core::models::ListingCategory::parse(
            row.get::<String, _>("category").as_str(),
        )
        .unwrap_or(dari_core::models::ListingCategory::Apartment),
        title_fr: row.get("title_fr"),
        title_ar: row.get("title_ar"),
        title_en: row.get("title_en"),
        description_fr: row.get("description_fr"),
        description_ar: row.get("description_ar"),
        description_en: row.get("description_en"),
        price: row.get("price"),
        price_currency: row.get("price_currency"),
        surface: row.get("surface"),
        rooms: row.get("rooms"),
        bathrooms: row.get("bathrooms"),
        governorate: row.get("governorate"),
        city: row.get("city"),
        address: row.get("address"),
        images: serde_json::from_str(&images_json).unwrap_or_default(),
        status: ListingStatus::parse(row.get::<String, _>("status").as_str())
            .unwrap_or(ListingStatus::Pending),
        featured: row.get::<i64, _>("featured") != 0,
        views_count: row.get("views_count"),
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        from_id: row.get("from_id"),
        to_id: row.get("to_id"),
        listing_id: row.get("listing_id"),
        content: row.get("content"),
        read: row.get::<i64, _>("read") != 0,
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn pro_from_row(row: &sqlx::sqlite::SqliteRow) -> Pro {
    let governorates_json: String = row.get("governorates_json");
    Pro {
        id: row.get("id"),
        user_id: row.get("user_id"),
        business_name_fr: row.get("business_name_fr"),
        business_name_ar: row.get("business_name_ar"),
        category: dari_core::models::ProCategory::parse(row.get::<String, _>("category").as_str())
            .unwrap_or(dari_core::models::ProCategory::Other),
        phone: row.get("phone"),
        bio_fr: row.get("bio_fr"),
        bio_ar: row.get("bio_ar"),
        governorates: serde_json::from_str(&governorates_json).unwrap_or_default(),
        verified: row.get::<i64, _>("verified") != 0,
        rating: row.get::<f64, _>("rating") as f32,
        reviews_count: row.get("reviews_count"),
        created_at: parse_timestamp(row.get("created_at")),
    }
}

fn review_from_row(row: &sqlx::sqlite::SqliteRow) -> Review {
    Review {
        id: row.get("id"),
        pro_id: row.get("pro_id"),
        author_id: row.get("author_id"),
        rating: row.get("rating"),
        comment: row.get("comment"),
        created_at: parse_timestamp(row.get("created_at")),
    }
}

const LISTING_FILTER_WHERE: &str = r#"
    status = 'verified'
    AND (?1 IS NULL OR listing_type = ?1)
    AND (?2 IS NULL OR category = ?2)
    AND (?3 IS NULL OR governorate = ?3)
    AND (?4 IS NULL OR price >= ?4)
    AND (?5 IS NULL OR price <= ?5)
    AND (?6 IS NULL OR COALESCE(rooms, 0) >= ?6)
    AND (?7 IS NULL OR title_fr LIKE ?7 OR title_ar LIKE ?7 OR title_en LIKE ?7)
"#;

impl ProfileRepository for SqliteStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| profile_from_row(&row)))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, email, phone, avatar_url, preferred_lang, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
              full_name=excluded.full_name,
              email=excluded.email,
              phone=excluded.phone,
              avatar_url=excluded.avatar_url,
              preferred_lang=excluded.preferred_lang,
              role=excluded.role
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.avatar_url)
        .bind(profile.preferred_lang.as_code())
        .bind(profile.role.as_code())
        .bind(profile.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl ListingRepository for SqliteStore {
    async fn get_listing(&self, id: &str) -> Result<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| listing_from_row(&row)))
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        let images_json = serde_json::to_string(&listing.images)?;

        sqlx::query(
            r#"
            INSERT INTO listings (
              id, owner_id, listing_type, category,
              title_fr, title_ar, title_en,
              description_fr, description_ar, description_en,
              price, price_currency, surface, rooms, bathrooms,
              governorate, city, address, images_json,
              status, featured, views_count, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)
            ON CONFLICT(id) DO UPDATE SET
              listing_type=excluded.listing_type,
              category=excluded.category,
              title_fr=excluded.title_fr,
              title_ar=excluded.title_ar,
              title_en=excluded.title_en,
              description_fr=excluded.description_fr,
              description_ar=excluded.description_ar,
              description_en=excluded.description_en,
              price=excluded.price,
              price_currency=excluded.price_currency,
              surface=excluded.surface,
              rooms=excluded.rooms,
              bathrooms=excluded.bathrooms,
              governorate=excluded.governorate,
              city=excluded.city,
              address=excluded.address,
              images_json=excluded.images_json,
              status=excluded.status,
              featured=excluded.featured,
              views_count=excluded.views_count
            "#,
        )
        .bind(&listing.id)
        .bind(&listing.owner_id)
        .bind(listing.listing_type.as_code())
        .bind(listing.category.as_code())
        .bind(&listing.title_fr)
        .bind(&listing.title_ar)
        .bind(&listing.title_en)
        .bind(&listing.description_fr)
        .bind(&listing.description_ar)
        .bind(&listing.description_en)
        .bind(listing.price)
        .bind(&listing.price_currency)
        .bind(listing.surface)
        .bind(listing.rooms)
        .bind(listing.bathrooms)
        .bind(&listing.governorate)
        .bind(&listing.city)
        .bind(&listing.address)
        .bind(images_json)
        .bind(listing.status.as_code())
        .bind(i64::from(listing.featured))
        .bind(listing.views_count)
        .bind(listing.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_listing(&self, id: &str) -> Result<bool> {
        sqlx::query("DELETE FROM favorites WHERE listing_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM listings WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE listings SET views_count = views_count + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn search_listings(&self, filters: &ListingFilters) -> Result<(Vec<Listing>, u64)> {
        let search_pattern = filters.search.as_deref().map(|term| format!("%{term}%"));

        let select = format!(
            "SELECT * FROM listings WHERE {LISTING_FILTER_WHERE} \
             ORDER BY featured DESC, created_at DESC LIMIT ?8 OFFSET ?9"
        );
        let rows = sqlx::query(&select)
            .bind(filters.listing_type.map(|value| value.as_code()))
            .bind(filters.category.map(|value| value.as_code()))
            .bind(filters.governorate.as_deref())
            .bind(filters.min_price)
            .bind(filters.max_price)
            .bind(filters.rooms)
            .bind(search_pattern.as_deref())
            .bind(i64::from(filters.limit))
            .bind((filters.page.saturating_sub(1) as i64) * i64::from(filters.limit))
            .fetch_all(&self.pool)
            .await?;

        let count = format!("SELECT COUNT(*) AS total FROM listings WHERE {LISTING_FILTER_WHERE}");
        let total: i64 = sqlx::query(&count)
            .bind(filters.listing_type.map(|value| value.as_code()))
            .bind(filters.category.map(|value| value.as_code()))
            .bind(filters.governorate.as_deref())
            .bind(filters.min_price)
            .bind(filters.max_price)
            .bind(filters.rooms)
            .bind(search_pattern.as_deref())
            .fetch_one(&self.pool)
            .await?
            .get("total");

        let listings = rows.iter().map(listing_from_row).collect();
        Ok((listings, total as u64))
    }

    async fn pending_listings(&self) -> Result<Vec<Listing>> {
        let rows =
            sqlx::query("SELECT * FROM listings WHERE status = 'pending' ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(listing_from_row).collect())
    }
}

impl FavoriteRepository for SqliteStore {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT listing_id FROM favorites WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("listing_id")).collect())
    }

    async fn has_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = ?1 AND listing_id = ?2")
            .bind(user_id)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    async fn add_favorite(&self, favorite: &Favorite) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO favorites (user_id, listing_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&favorite.user_id)
        .bind(&favorite.listing_id)
        .bind(favorite.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND listing_id = ?2")
            .bind(user_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl MessageRepository for SqliteStore {
    async fn insert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, from_id, to_id, listing_id, content, read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&message.id)
        .bind(&message.from_id)
        .bind(&message.to_id)
        .bind(&message.listing_id)
        .bind(&message.content)
        .bind(i64::from(message.read))
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE from_id = ?1 OR to_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE (from_id = ?1 AND to_id = ?2) OR (from_id = ?2 AND to_id = ?1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn mark_conversation_read(&self, user_id: &str, other_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE to_id = ?1 AND from_id = ?2 AND read = 0",
        )
        .bind(user_id)
        .bind(other_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let total: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM messages WHERE to_id = ?1 AND read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
                .get("total");

        Ok(total as u64)
    }
}

impl ProRepository for SqliteStore {
    async fn get_pro(&self, id: &str) -> Result<Option<Pro>> {
        let row = sqlx::query("SELECT * FROM pros WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| pro_from_row(&row)))
    }

    async fn pro_for_user(&self, user_id: &str) -> Result<Option<Pro>> {
        let row = sqlx::query("SELECT * FROM pros WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| pro_from_row(&row)))
    }

    async fn upsert_pro(&self, pro: &Pro) -> Result<()> {
        let governorates_json = serde_json::to_string(&pro.governorates)?;

        sqlx::query(
            r#"
            INSERT INTO pros (
              id, user_id, business_name_fr, business_name_ar, category, phone,
              bio_fr, bio_ar, governorates_json, verified, rating, reviews_count, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(id) DO UPDATE SET
              business_name_fr=excluded.business_name_fr,
              business_name_ar=excluded.business_name_ar,
              category=excluded.category,
              phone=excluded.phone,
              bio_fr=excluded.bio_fr,
              bio_ar=excluded.bio_ar,
              governorates_json=excluded.governorates_json,
              verified=excluded.verified,
              rating=excluded.rating,
              reviews_count=excluded.reviews_count
            "#,
        )
        .bind(&pro.id)
        .bind(&pro.user_id)
        .bind(&pro.business_name_fr)
        .bind(&pro.business_name_ar)
        .bind(pro.category.as_code())
        .bind(&pro.phone)
        .bind(&pro.bio_fr)
        .bind(&pro.bio_ar)
        .bind(governorates_json)
        .bind(i64::from(pro.verified))
        .bind(f64::from(pro.rating))
        .bind(pro.reviews_count)
        .bind(pro.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search_pros(&self, filters: &ProFilters) -> Result<(Vec<Pro>, u64)> {
        let governorate_pattern = filters
            .governorate
            .as_deref()
            .map(|value| format!("%\"{value}\"%"));
        let search_pattern = filters.search.as_deref().map(|term| format!("%{term}%"));

        let rows = sqlx::query(
            r#"
            SELECT * FROM pros
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR governorates_json LIKE ?2)
              AND (?3 IS NULL OR business_name_fr LIKE ?3 OR business_name_ar LIKE ?3)
            ORDER BY verified DESC, rating DESC
            LIMIT ?4 OFFSET ?5
            "#,
        )
        .bind(filters.category.map(|value| value.as_code()))
        .bind(governorate_pattern.as_deref())
        .bind(search_pattern.as_deref())
        .bind(i64::from(filters.limit))
        .bind((filters.page.saturating_sub(1) as i64) * i64::from(filters.limit))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM pros
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR governorates_json LIKE ?2)
              AND (?3 IS NULL OR business_name_fr LIKE ?3 OR business_name_ar LIKE ?3)
            "#,
        )
        .bind(filters.category.map(|value| value.as_code()))
        .bind(governorate_pattern.as_deref())
        .bind(search_pattern.as_deref())
        .fetch_one(&self.pool)
        .await?
        .get("total");

        let pros = rows.iter().map(pro_from_row).collect();
        Ok((pros, total as u64))
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, pro_id, author_id, rating, comment, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&review.id)
        .bind(&review.pro_id)
        .bind(&review.author_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reviews_for_pro(&self, pro_id: &str) -> Result<Vec<Review>> {
        let rows = sqlx::query("SELECT * FROM reviews WHERE pro_id = ?1 ORDER BY created_at DESC")
            .bind(pro_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(review_from_row).collect())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }
}

impl ProfileRepository for Store {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        match self {
            Store::Memory(store) => store.get_profile(id).await,
            Store::Sqlite(store) => store.get_profile(id).await,
        }
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_profile(profile).await,
            Store::Sqlite(store) => store.upsert_profile(profile).await,
        }
    }
}

impl ListingRepository for Store {
    async fn get_listing(&self, id: &str) -> Result<Option<Listing>> {
        match self {
            Store::Memory(store) => store.get_listing(id).await,
            Store::Sqlite(store) => store.get_listing(id).await,
        }
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_listing(listing).await,
            Store::Sqlite(store) => store.upsert_listing(listing).await,
        }
    }

    async fn delete_listing(&self, id: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.delete_listing(id).await,
            Store::Sqlite(store) => store.delete_listing(id).await,
        }
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        match self {
            Store::Memory(store) => store.increment_views(id).await,
            Store::Sqlite(store) => store.increment_views(id).await,
        }
    }

    async fn search_listings(&self, filters: &ListingFilters) -> Result<(Vec<Listing>, u64)> {
        match self {
            Store::Memory(store) => store.search_listings(filters).await,
            Store::Sqlite(store) => store.search_listings(filters).await,
        }
    }

    async fn pending_listings(&self) -> Result<Vec<Listing>> {
        match self {
            Store::Memory(store) => store.pending_listings().await,
            Store::Sqlite(store) => store.pending_listings().await,
        }
    }
}

impl FavoriteRepository for Store {
    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.favorite_ids(user_id).await,
            Store::Sqlite(store) => store.favorite_ids(user_id).await,
        }
    }

    async fn has_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.has_favorite(user_id, listing_id).await,
            Store::Sqlite(store) => store.has_favorite(user_id, listing_id).await,
        }
    }

    async fn add_favorite(&self, favorite: &Favorite) -> Result<()> {
        match self {
            Store::Memory(store) => store.add_favorite(favorite).await,
            Store::Sqlite(store) => store.add_favorite(favorite).await,
        }
    }

    async fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.remove_favorite(user_id, listing_id).await,
            Store::Sqlite(store) => store.remove_favorite(user_id, listing_id).await,
        }
    }
}

impl MessageRepository for Store {
    async fn insert_message(&self, message: &Message) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert_message(message).await,
            Store::Sqlite(store) => store.insert_message(message).await,
        }
    }

    async fn messages_for_user(&self, user_id: &str) -> Result<Vec<Message>> {
        match self {
            Store::Memory(store) => store.messages_for_user(user_id).await,
            Store::Sqlite(store) => store.messages_for_user(user_id).await,
        }
    }

    async fn conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<Message>> {
        match self {
            Store::Memory(store) => store.conversation(user_id, other_id).await,
            Store::Sqlite(store) => store.conversation(user_id, other_id).await,
        }
    }

    async fn mark_conversation_read(&self, user_id: &str, other_id: &str) -> Result<u64> {
        match self {
            Store::Memory(store) => store.mark_conversation_read(user_id, other_id).await,
            Store::Sqlite(store) => store.mark_conversation_read(user_id, other_id).await,
        }
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64> {
        match self {
            Store::Memory(store) => store.unread_count(user_id).await,
            Store::Sqlite(store) => store.unread_count(user_id).await,
        }
    }
}

impl ProRepository for Store {
    async fn get_pro(&self, id: &str) -> Result<Option<Pro>> {
        match self {
            Store::Memory(store) => store.get_pro(id).await,
            Store::Sqlite(store) => store.get_pro(id).await,
        }
    }

    async fn pro_for_user(&self, user_id: &str) -> Result<Option<Pro>> {
        match self {
            Store::Memory(store) => store.pro_for_user(user_id).await,
            Store::Sqlite(store) => store.pro_for_user(user_id).await,
        }
    }

    async fn upsert_pro(&self, pro: &Pro) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_pro(pro).await,
            Store::Sqlite(store) => store.upsert_pro(pro).await,
        }
    }

    async fn search_pros(&self, filters: &ProFilters) -> Result<(Vec<Pro>, u64)> {
        match self {
            Store::Memory(store) => store.search_pros(filters).await,
            Store::Sqlite(store) => store.search_pros(filters).await,
        }
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert_review(review).await,
            Store::Sqlite(store) => store.insert_review(review).await,
        }
    }

    async fn reviews_for_pro(&self, pro_id: &str) -> Result<Vec<Review>> {
        match self {
            Store::Memory(store) => store.reviews_for_pro(pro_id).await,
            Store::Sqlite(store) => store.reviews_for_pro(pro_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use dari_core::models::{ListingCategory, ListingType};

    use super::*;

    fn listing(id: &str, price: i64, status: ListingStatus, featured: bool) -> Listing {
        Listing {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            listing_type: ListingType::Sale,
            category: ListingCategory::Apartment,
            title_fr: format!("Appartement {id}"),
            title_ar: Some("شقة".to_string()),
            title_en: None,
            description_fr: None,
            description_ar: None,
            description_en: None,
            price,
            price_currency: "TND".to_string(),
            surface: Some(90.0),
            rooms: Some(3),
            bathrooms: Some(1),
            governorate: "tunis".to_string(),
            city: "Tunis".to_string(),
            address: None,
            images: vec!["https://img.example.com/1.jpg".to_string()],
            status,
            featured,
            views_count: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn search_only_returns_verified_listings() {
        let store = MemoryStore::new();
        store
            .upsert_listing(&listing("a", 100_000, ListingStatus::Verified, false))
            .await
            .unwrap();
        store
            .upsert_listing(&listing("b", 100_000, ListingStatus::Pending, false))
            .await
            .unwrap();

        let (found, total) = store
            .search_listings(&ListingFilters::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, "a");
    }

    #[tokio::test]
    async fn featured_listings_rank_first() {
        let store = MemoryStore::new();
        let mut old_featured = listing("feat", 100_000, ListingStatus::Verified, true);
        old_featured.created_at = Utc::now() - Duration::days(10);
        store.upsert_listing(&old_featured).await.unwrap();
        store
            .upsert_listing(&listing("fresh", 100_000, ListingStatus::Verified, false))
            .await
            .unwrap();

        let (found, _) = store
            .search_listings(&ListingFilters::default())
            .await
            .unwrap();
        assert_eq!(found[0].id, "feat");
        assert_eq!(found[1].id, "fresh");
    }

    #[tokio::test]
    async fn price_and_search_filters_narrow_results() {
        let store = MemoryStore::new();
        store
            .upsert_listing(&listing("cheap", 80_000, ListingStatus::Verified, false))
            .await
            .unwrap();
        store
            .upsert_listing(&listing("dear", 400_000, ListingStatus::Verified, false))
            .await
            .unwrap();

        let filters = ListingFilters {
            min_price: Some(100_000),
            ..ListingFilters::default()
        };
        let (found, total) = store.search_listings(&filters).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, "dear");

        let filters = ListingFilters {
            search: Some("شقة".to_string()),
            ..ListingFilters::default()
        };
        let (_, total) = store.search_listings(&filters).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn favorite_toggle_round_trip() {
        let store = MemoryStore::new();
        let favorite = Favorite {
            user_id: "u1".to_string(),
            listing_id: "l1".to_string(),
            created_at: Utc::now(),
        };

        assert!(!store.has_favorite("u1", "l1").await.unwrap());
        store.add_favorite(&favorite).await.unwrap();
        assert!(store.has_favorite("u1", "l1").await.unwrap());
        assert_eq!(store.favorite_ids("u1").await.unwrap(), vec!["l1"]);
        assert!(store.remove_favorite("u1", "l1").await.unwrap());
        assert!(!store.remove_favorite("u1", "l1").await.unwrap());
    }

    #[tokio::test]
    async fn conversations_are_ordered_and_marked_read() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for (index, (from, to)) in [("a", "b"), ("b", "a"), ("a", "b")].iter().enumerate() {
            store
                .insert_message(&Message {
                    id: format!("m{index}"),
                    from_id: from.to_string(),
                    to_id: to.to_string(),
                    listing_id: None,
                    content: format!("message {index}"),
                    read: false,
                    created_at: base + Duration::seconds(index as i64),
                })
                .await
                .unwrap();
        }

        let thread = store.conversation("a", "b").await.unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].id, "m0");

        assert_eq!(store.unread_count("b").await.unwrap(), 2);
        assert_eq!(store.mark_conversation_read("b", "a").await.unwrap(), 2);
        assert_eq!(store.unread_count("b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sqlite_round_trips_a_listing() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let entry = listing("sql-1", 150_000, ListingStatus::Verified, false);
        store.upsert_listing(&entry).await.unwrap();

        let loaded = store.get_listing("sql-1").await.unwrap().unwrap();
        assert_eq!(loaded.title_fr, entry.title_fr);
        assert_eq!(loaded.images, entry.images);
        assert_eq!(loaded.status, ListingStatus::Verified);

        store.increment_views("sql-1").await.unwrap();
        let loaded = store.get_listing("sql-1").await.unwrap().unwrap();
        assert_eq!(loaded.views_count, 1);

        let (found, total) = store
            .search_listings(&ListingFilters::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, "sql-1");
    }

    #[tokio::test]
    async fn sqlite_pro_search_matches_governorate_json() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store
            .upsert_pro(&Pro {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
                business_name_fr: "Plomberie Karim".to_string(),
                business_name_ar: Some("سباكة كريم".to_string()),
                category: dari_core::models::ProCategory::Plumber,
                phone: "98123456".to_string(),
                bio_fr: None,
                bio_ar: None,
                governorates: vec!["tunis".to_string(), "ariana".to_string()],
                verified: true,
                rating: 4.5,
                reviews_count: 2,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let filters = ProFilters {
            governorate: Some("ariana".to_string()),
            ..ProFilters::default()
        };
        let (found, total) = store.search_pros(&filters).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, "p1");

        let filters = ProFilters {
            governorate: Some("sfax".to_string()),
            ..ProFilters::default()
        };
        let (_, total) = store.search_pros(&filters).await.unwrap();
        assert_eq!(total, 0);
    }
}
