use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dari_core::localized::{localized_field, localized_variant};
use dari_core::models::{
    ContactCard, Conversation, Favorite, Listing, ListingCard, ListingDetail, ListingStatus,
    Message, Page, Pagination, Pro, Profile, Review, Role,
};
use dari_core::text::excerpt;
use dari_core::validate::{
    CreateListing, CreateMessage, CreateReview, ListingFilters, ProFilters, RegisterPro,
    ToggleFavorite, UpdateListing, UpdateProfile, UpsertProfile, ValidationError, ValidationIssue,
};
use dari_core::Locale;
use dari_observability::AppMetrics;
use dari_storage::{
    FavoriteRepository, ListingRepository, MessageRepository, ProRepository, ProfileRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

const EXCERPT_GRAPHEMES: usize = 160;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteOutcome {
    pub action: FavoriteAction,
    pub listing_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProCard {
    pub id: String,
    pub display_business_name: String,
    pub display_bio: String,
    pub category: dari_core::models::ProCategory,
    pub category_label: String,
    pub phone: String,
    pub governorates: Vec<String>,
    pub verified: bool,
    pub rating: f32,
    pub reviews_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProDetail {
    #[serde(flatten)]
    pub card: ProCard,
    pub bio_fr: Option<String>,
    pub bio_ar: Option<String>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub profiles: usize,
    pub listings: usize,
    pub pros: usize,
    pub reviews: usize,
    pub messages: usize,
}

#[derive(Clone)]
pub struct MarketplaceService<S>
where
    S: ProfileRepository
        + ListingRepository
        + FavoriteRepository
        + MessageRepository
        + ProRepository,
{
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> MarketplaceService<S>
where
    S: ProfileRepository
        + ListingRepository
        + FavoriteRepository
        + MessageRepository
        + ProRepository,
{
    pub fn new(store: Arc<S>, metrics: Arc<AppMetrics>) -> Self {
        Self { store, metrics }
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    // ---- profiles ----

    pub async fn get_profile(&self, id: &str) -> Result<Profile, ServiceError> {
        self.store
            .get_profile(id)
            .await?
            .ok_or(ServiceError::NotFound("profile"))
    }

    #[instrument(skip(self, input))]
    pub async fn sync_profile(&self, input: UpsertProfile) -> Result<Profile, ServiceError> {
        input.validate()?;

        let id = input
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let existing = self.store.get_profile(&id).await?;

        let profile = Profile {
            id: id.clone(),
            full_name: input.full_name,
            email: input.email.trim().to_lowercase(),
            phone: input.phone,
            avatar_url: input.avatar_url,
            preferred_lang: input
                .preferred_lang
                .or(existing.as_ref().map(|profile| profile.preferred_lang))
                .unwrap_or_default(),
            role: existing
                .as_ref()
                .map(|profile| profile.role)
                .unwrap_or(Role::User),
            created_at: existing
                .map(|profile| profile.created_at)
                .unwrap_or_else(Utc::now),
        };
        self.store.upsert_profile(&profile).await?;

        info!(profile_id = %profile.id, "profile synced");
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfile,
    ) -> Result<Profile, ServiceError> {
        input.validate()?;

        let mut profile = self.get_profile(user_id).await?;
        profile.full_name = input.full_name;
        profile.phone = input.phone.filter(|phone| !phone.is_empty());
        profile.avatar_url = input.avatar_url.filter(|url| !url.is_empty());
        if let Some(preferred_lang) = input.preferred_lang {
            profile.preferred_lang = preferred_lang;
        }
        self.store.upsert_profile(&profile).await?;

        Ok(profile)
    }

    // ---- listings ----

    #[instrument(skip(self, filters))]
    pub async fn browse_listings(
        &self,
        filters: ListingFilters,
        locale: Locale,
    ) -> Result<Page<ListingCard>, ServiceError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let (listings, total) = self.store.search_listings(&filters).await?;
        let cards = listings
            .iter()
            .map(|listing| self.listing_card(listing, locale))
            .collect();

        self.metrics.observe_latency(started.elapsed());
        Ok(Page {
            data: cards,
            pagination: Pagination::new(filters.page, filters.limit, total),
        })
    }

    pub async fn listing_detail(
        &self,
        id: &str,
        locale: Locale,
    ) -> Result<ListingDetail, ServiceError> {
        self.metrics.inc_request();

        let listing = self
            .store
            .get_listing(id)
            .await?
            .filter(|listing| listing.status == ListingStatus::Verified)
            .ok_or(ServiceError::NotFound("listing"))?;

        self.store.increment_views(id).await?;

        let owner = self.store.get_profile(&listing.owner_id).await?;
        let owner_card = owner
            .map(|profile| ContactCard {
                id: profile.id,
                full_name: profile.full_name,
                avatar_url: profile.avatar_url,
                phone: profile.phone,
            })
            .unwrap_or_else(|| ContactCard {
                id: listing.owner_id.clone(),
                full_name: String::new(),
                avatar_url: None,
                phone: None,
            });

        let entity = entity_of(&listing);
        let display_title = self.resolve(&entity, "title", locale);
        let display_description = self.resolve(&entity, "description", locale);

        let mut listing = listing;
        listing.views_count += 1;

        Ok(ListingDetail {
            listing,
            display_title,
            display_description,
            owner: owner_card,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create_listing(
        &self,
        owner: &Profile,
        input: CreateListing,
    ) -> Result<Listing, ServiceError> {
        input.validate()?;

        let listing = Listing {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id.clone(),
            listing_type: input.listing_type,
            category: input.category,
            title_fr: input.title_fr,
            title_ar: input.title_ar,
            title_en: input.title_en,
            description_fr: input.description_fr,
            description_ar: input.description_ar,
            description_en: input.description_en,
            price: input.price,
            price_currency: input.price_currency,
            surface: input.surface,
            rooms: input.rooms,
            bathrooms: input.bathrooms,
            governorate: input.governorate,
            city: input.city,
            address: input.address,
            images: input.images,
            status: ListingStatus::Pending,
            featured: false,
            views_count: 0,
            created_at: Utc::now(),
        };
        self.store.upsert_listing(&listing).await?;
        self.metrics.inc_listing_created();

        info!(listing_id = %listing.id, owner_id = %owner.id, "listing submitted");
        Ok(listing)
    }

    pub async fn update_listing(
        &self,
        actor_id: &str,
        listing_id: &str,
        patch: UpdateListing,
    ) -> Result<Listing, ServiceError> {
        patch.validate()?;

        let mut listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or(ServiceError::NotFound("listing"))?;
        if listing.owner_id != actor_id {
            return Err(ServiceError::Forbidden);
        }

        patch.apply(&mut listing);
        self.store.upsert_listing(&listing).await?;

        info!(listing_id = %listing.id, "listing updated, back to moderation");
        Ok(listing)
    }

    pub async fn delete_listing(
        &self,
        actor_id: &str,
        listing_id: &str,
    ) -> Result<(), ServiceError> {
        let listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or(ServiceError::NotFound("listing"))?;
        if listing.owner_id != actor_id {
            return Err(ServiceError::Forbidden);
        }

        self.store.delete_listing(listing_id).await?;
        Ok(())
    }

    pub async fn moderation_queue(&self, actor: &Profile) -> Result<Vec<Listing>, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.store.pending_listings().await?)
    }

    #[instrument(skip(self, actor))]
    pub async fn moderate_listing(
        &self,
        actor: &Profile,
        listing_id: &str,
        status: ListingStatus,
    ) -> Result<Listing, ServiceError> {
        if actor.role != Role::Admin {
            return Err(ServiceError::Forbidden);
        }
        if status == ListingStatus::Pending {
            return Err(ServiceError::Invalid(ValidationError {
                issues: vec![ValidationIssue {
                    field: "status",
                    message: "must be verified or rejected".to_string(),
                }],
            }));
        }

        let mut listing = self
            .store
            .get_listing(listing_id)
            .await?
            .ok_or(ServiceError::NotFound("listing"))?;
        listing.status = status;
        self.store.upsert_listing(&listing).await?;
        self.metrics.inc_listing_moderated();

        info!(listing_id = %listing.id, status = status.as_code(), "listing moderated");
        Ok(listing)
    }

    // ---- favorites ----

    pub async fn favorites(&self, user_id: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.favorite_ids(user_id).await?)
    }

    pub async fn toggle_favorite(
        &self,
        user_id: &str,
        input: ToggleFavorite,
    ) -> Result<FavoriteOutcome, ServiceError> {
        input.validate()?;

        if self.store.has_favorite(user_id, &input.listing_id).await? {
            self.store
                .remove_favorite(user_id, &input.listing_id)
                .await?;
            return Ok(FavoriteOutcome {
                action: FavoriteAction::Removed,
                listing_id: input.listing_id,
            });
        }

        self.store
            .add_favorite(&Favorite {
                user_id: user_id.to_string(),
                listing_id: input.listing_id.clone(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(FavoriteOutcome {
            action: FavoriteAction::Added,
            listing_id: input.listing_id,
        })
    }

    // ---- messages ----

    #[instrument(skip(self, input))]
    pub async fn send_message(
        &self,
        from: &Profile,
        input: CreateMessage,
    ) -> Result<Message, ServiceError> {
        input.validate()?;

        if self.store.get_profile(&input.to_id).await?.is_none() {
            return Err(ServiceError::NotFound("recipient"));
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            from_id: from.id.clone(),
            to_id: input.to_id,
            listing_id: input.listing_id,
            content: input.content,
            read: false,
            created_at: Utc::now(),
        };
        self.store.insert_message(&message).await?;
        self.metrics.inc_message_sent();

        info!(message_id = %message.id, to_id = %message.to_id, "message sent");
        Ok(message)
    }

    /// Inbox view: one entry per counterpart, newest conversation first,
    /// with the unread count of incoming messages.
    pub async fn conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ServiceError> {
        let messages = self.store.messages_for_user(user_id).await?;

        let mut conversations: Vec<Conversation> = Vec::new();
        for message in messages {
            let other_id = if message.from_id == user_id {
                message.to_id.clone()
            } else {
                message.from_id.clone()
            };

            let position = conversations
                .iter()
                .position(|conversation| conversation.other_user.id == other_id);
            let index = match position {
                Some(index) => index,
                None => {
                    let other_card = self
                        .store
                        .get_profile(&other_id)
                        .await?
                        .map(|profile| ContactCard {
                            id: profile.id,
                            full_name: profile.full_name,
                            avatar_url: profile.avatar_url,
                            phone: profile.phone,
                        })
                        .unwrap_or_else(|| ContactCard {
                            id: other_id.clone(),
                            full_name: String::new(),
                            avatar_url: None,
                            phone: None,
                        });
                    conversations.push(Conversation {
                        other_user: other_card,
                        last_message: message.clone(),
                        unread_count: 0,
                    });
                    conversations.len() - 1
                }
            };

            if message.to_id == user_id && !message.read && message.from_id == other_id {
                conversations[index].unread_count += 1;
            }
        }

        Ok(conversations)
    }

    pub async fn conversation_with(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<Vec<Message>, ServiceError> {
        Ok(self.store.conversation(user_id, other_id).await?)
    }

    pub async fn mark_conversation_read(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<u64, ServiceError> {
        Ok(self.store.mark_conversation_read(user_id, other_id).await?)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64, ServiceError> {
        Ok(self.store.unread_count(user_id).await?)
    }

    // ---- pros ----

    #[instrument(skip(self, input))]
    pub async fn register_pro(
        &self,
        actor: &Profile,
        input: RegisterPro,
    ) -> Result<Pro, ServiceError> {
        input.validate()?;

        if self.store.pro_for_user(&actor.id).await?.is_some() {
            return Err(ServiceError::Conflict("already registered as pro"));
        }

        let pro = Pro {
            id: Uuid::new_v4().to_string(),
            user_id: actor.id.clone(),
            business_name_fr: input.business_name_fr,
            business_name_ar: input.business_name_ar,
            category: input.category,
            phone: input.phone,
            bio_fr: input.bio_fr,
            bio_ar: input.bio_ar,
            governorates: input.governorates,
            verified: false,
            rating: 0.0,
            reviews_count: 0,
            created_at: Utc::now(),
        };
        self.store.upsert_pro(&pro).await?;

        let mut promoted = actor.clone();
        if promoted.role == Role::User {
            promoted.role = Role::Pro;
            self.store.upsert_profile(&promoted).await?;
        }

        info!(pro_id = %pro.id, user_id = %actor.id, "pro registered");
        Ok(pro)
    }

    pub async fn list_pros(
        &self,
        filters: ProFilters,
        locale: Locale,
    ) -> Result<Page<ProCard>, ServiceError> {
        self.metrics.inc_request();

        let (pros, total) = self.store.search_pros(&filters).await?;
        let cards = pros.iter().map(|pro| self.pro_card(pro, locale)).collect();

        Ok(Page {
            data: cards,
            pagination: Pagination::new(filters.page, filters.limit, total),
        })
    }

    pub async fn pro_detail(&self, id: &str, locale: Locale) -> Result<ProDetail, ServiceError> {
        let pro = self
            .store
            .get_pro(id)
            .await?
            .ok_or(ServiceError::NotFound("pro"))?;
        let reviews = self.store.reviews_for_pro(id).await?;

        Ok(ProDetail {
            card: self.pro_card(&pro, locale),
            bio_fr: pro.bio_fr,
            bio_ar: pro.bio_ar,
            reviews,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn submit_review(
        &self,
        author: &Profile,
        input: CreateReview,
    ) -> Result<Review, ServiceError> {
        input.validate()?;

        let mut pro = self
            .store
            .get_pro(&input.pro_id)
            .await?
            .ok_or(ServiceError::NotFound("pro"))?;

        let review = Review {
            id: Uuid::new_v4().to_string(),
            pro_id: input.pro_id,
            author_id: author.id.clone(),
            rating: input.rating,
            comment: input.comment,
            created_at: Utc::now(),
        };
        self.store.insert_review(&review).await?;

        let reviews = self.store.reviews_for_pro(&review.pro_id).await?;
        let count = reviews.len() as i64;
        let sum: i64 = reviews.iter().map(|entry| i64::from(entry.rating)).sum();
        pro.rating = if count == 0 {
            0.0
        } else {
            sum as f32 / count as f32
        };
        pro.reviews_count = count;
        self.store.upsert_pro(&pro).await?;

        info!(review_id = %review.id, pro_id = %review.pro_id, "review recorded");
        Ok(review)
    }

    // ---- display helpers ----

    fn resolve(&self, entity: &Value, field: &str, locale: Locale) -> String {
        let resolved = localized_field(entity, field, locale);
        if !resolved.is_empty() && localized_variant(entity, field, locale).is_none() {
            self.metrics.inc_locale_fallback();
        }
        resolved
    }

    fn listing_card(&self, listing: &Listing, locale: Locale) -> ListingCard {
        let entity = entity_of(listing);
        let display_title = self.resolve(&entity, "title", locale);
        let display_excerpt = excerpt(&self.resolve(&entity, "description", locale), EXCERPT_GRAPHEMES);

        ListingCard {
            id: listing.id.clone(),
            listing_type: listing.listing_type,
            category: listing.category,
            display_title,
            display_excerpt,
            price: listing.price,
            price_currency: listing.price_currency.clone(),
            surface: listing.surface,
            rooms: listing.rooms,
            bathrooms: listing.bathrooms,
            governorate: listing.governorate.clone(),
            city: listing.city.clone(),
            cover_image: listing.images.first().cloned(),
            featured: listing.featured,
            created_at: listing.created_at,
        }
    }

    fn pro_card(&self, pro: &Pro, locale: Locale) -> ProCard {
        let entity = entity_of(pro);

        ProCard {
            id: pro.id.clone(),
            display_business_name: self.resolve(&entity, "business_name", locale),
            display_bio: self.resolve(&entity, "bio", locale),
            category: pro.category,
            category_label: pro.category.label(locale).to_string(),
            phone: pro.phone.clone(),
            governorates: pro.governorates.clone(),
            verified: pro.verified,
            rating: pro.rating,
            reviews_count: pro.reviews_count,
        }
    }

    // ---- seed ----

    /// Loads a small bilingual demo dataset. Idempotent thanks to fixed
    /// ids and upsert semantics everywhere.
    pub async fn seed_demo_data(&self) -> Result<SeedSummary, ServiceError> {
        let now = Utc::now();

        let profiles = vec![
            Profile {
                id: "admin".to_string(),
                full_name: "Dari Admin".to_string(),
                email: "admin@dari.tn".to_string(),
                phone: None,
                avatar_url: None,
                preferred_lang: Locale::Fr,
                role: Role::Admin,
                created_at: now,
            },
            Profile {
                id: "user-amira".to_string(),
                full_name: "Amira Ben Salah".to_string(),
                email: "amira@example.tn".to_string(),
                phone: Some("22456789".to_string()),
                avatar_url: None,
                preferred_lang: Locale::Ar,
                role: Role::User,
                created_at: now,
            },
            Profile {
                id: "user-karim".to_string(),
                full_name: "Karim Trabelsi".to_string(),
                email: "karim@example.tn".to_string(),
                phone: Some("98123456".to_string()),
                avatar_url: None,
                preferred_lang: Locale::Fr,
                role: Role::User,
                created_at: now,
            },
        ];
        for profile in &profiles {
            self.store.upsert_profile(profile).await?;
        }

        let listings = vec![
            Listing {
                id: "listing-carthage".to_string(),
                owner_id: "user-karim".to_string(),
                listing_type: dari_core::models::ListingType::Sale,
                category: dari_core::models::ListingCategory::Apartment,
                title_fr: "Appartement S+2 vue mer à Carthage".to_string(),
                title_ar: Some("شقة س+2 بإطلالة على البحر في قرطاج".to_string()),
                title_en: Some("Sea-view S+2 apartment in Carthage".to_string()),
                description_fr: Some(
                    "Bel appartement lumineux à deux pas des ruines, cuisine équipée.".to_string(),
                ),
                description_ar: Some("شقة مشرقة على بعد خطوات من الآثار، مطبخ مجهز.".to_string()),
                description_en: None,
                price: 420_000,
                price_currency: "TND".to_string(),
                surface: Some(110.0),
                rooms: Some(3),
                bathrooms: Some(2),
                governorate: "tunis".to_string(),
                city: "Carthage".to_string(),
                address: Some("Rue Hannibal".to_string()),
                images: vec!["https://img.dari.tn/carthage-1.jpg".to_string()],
                status: ListingStatus::Verified,
                featured: true,
                views_count: 0,
                created_at: now,
            },
            Listing {
                id: "listing-sousse".to_string(),
                owner_id: "user-karim".to_string(),
                listing_type: dari_core::models::ListingType::Rent,
                category: dari_core::models::ListingCategory::House,
                title_fr: "Maison de vacances à Sousse".to_string(),
                title_ar: Some("منزل عطلة في سوسة".to_string()),
                title_en: None,
                description_fr: Some("Maison meublée à 5 minutes de la plage.".to_string()),
                description_ar: None,
                description_en: None,
                price: 950,
                price_currency: "TND".to_string(),
                surface: Some(140.0),
                rooms: Some(4),
                bathrooms: Some(2),
                governorate: "sousse".to_string(),
                city: "Sousse".to_string(),
                address: None,
                images: vec!["https://img.dari.tn/sousse-1.jpg".to_string()],
                status: ListingStatus::Verified,
                featured: false,
                views_count: 0,
                created_at: now,
            },
            Listing {
                id: "listing-sfax".to_string(),
                owner_id: "user-amira".to_string(),
                listing_type: dari_core::models::ListingType::Sale,
                category: dari_core::models::ListingCategory::Land,
                title_fr: "Terrain constructible à Sfax".to_string(),
                title_ar: None,
                title_en: None,
                description_fr: None,
                description_ar: None,
                description_en: None,
                price: 180_000,
                price_currency: "TND".to_string(),
                surface: Some(500.0),
                rooms: None,
                bathrooms: None,
                governorate: "sfax".to_string(),
                city: "Sfax".to_string(),
                address: None,
                images: vec!["https://img.dari.tn/sfax-1.jpg".to_string()],
                status: ListingStatus::Pending,
                featured: false,
                views_count: 0,
                created_at: now,
            },
        ];
        for listing in &listings {
            self.store.upsert_listing(listing).await?;
        }

        let pro = Pro {
            id: "pro-karim".to_string(),
            user_id: "user-karim".to_string(),
            business_name_fr: "Plomberie Trabelsi".to_string(),
            business_name_ar: Some("سباكة الطرابلسي".to_string()),
            category: dari_core::models::ProCategory::Plumber,
            phone: "98123456".to_string(),
            bio_fr: Some("Interventions rapides sur le grand Tunis.".to_string()),
            bio_ar: Some("تدخلات سريعة في تونس الكبرى.".to_string()),
            governorates: vec!["tunis".to_string(), "ariana".to_string()],
            verified: true,
            rating: 5.0,
            reviews_count: 1,
            created_at: now,
        };
        self.store.upsert_pro(&pro).await?;

        let review = Review {
            id: "review-1".to_string(),
            pro_id: "pro-karim".to_string(),
            author_id: "user-amira".to_string(),
            rating: 5,
            comment: Some("Travail propre et rapide.".to_string()),
            created_at: now,
        };
        self.store.insert_review(&review).await?;

        let messages = vec![
            Message {
                id: "message-1".to_string(),
                from_id: "user-amira".to_string(),
                to_id: "user-karim".to_string(),
                listing_id: Some("listing-carthage".to_string()),
                content: "Bonjour, l'appartement est-il toujours disponible ?".to_string(),
                read: true,
                created_at: now,
            },
            Message {
                id: "message-2".to_string(),
                from_id: "user-karim".to_string(),
                to_id: "user-amira".to_string(),
                listing_id: Some("listing-carthage".to_string()),
                content: "Oui, visite possible ce week-end.".to_string(),
                read: false,
                created_at: now,
            },
        ];
        for message in &messages {
            self.store.insert_message(message).await?;
        }

        self.store
            .add_favorite(&Favorite {
                user_id: "user-amira".to_string(),
                listing_id: "listing-carthage".to_string(),
                created_at: now,
            })
            .await?;

        info!("demo dataset seeded");
        Ok(SeedSummary {
            profiles: profiles.len(),
            listings: listings.len(),
            pros: 1,
            reviews: 1,
            messages: messages.len(),
        })
    }
}

fn entity_of<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use dari_core::models::ListingType;
    use dari_storage::MemoryStore;

    use super::*;

    fn service() -> MarketplaceService<MemoryStore> {
        MarketplaceService::new(Arc::new(MemoryStore::new()), AppMetrics::shared())
    }

    async fn seeded() -> MarketplaceService<MemoryStore> {
        let service = service();
        service.seed_demo_data().await.unwrap();
        service
    }

    #[tokio::test]
    async fn browse_resolves_titles_for_the_requested_locale() {
        let service = seeded().await;

        let page = service
            .browse_listings(ListingFilters::default(), Locale::Ar)
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);

        let carthage = page
            .data
            .iter()
            .find(|card| card.id == "listing-carthage")
            .unwrap();
        assert_eq!(carthage.display_title, "شقة س+2 بإطلالة على البحر في قرطاج");

        // featured listing ranks first
        assert_eq!(page.data[0].id, "listing-carthage");
    }

    #[tokio::test]
    async fn browse_falls_back_to_french_when_variant_is_missing() {
        let service = seeded().await;

        let page = service
            .browse_listings(ListingFilters::default(), Locale::En)
            .await
            .unwrap();
        let sousse = page
            .data
            .iter()
            .find(|card| card.id == "listing-sousse")
            .unwrap();
        assert_eq!(sousse.display_title, "Maison de vacances à Sousse");
        assert!(service.metrics().snapshot().locale_fallback_total > 0);
    }

    #[tokio::test]
    async fn pending_listings_stay_out_of_browse_until_verified() {
        let service = seeded().await;
        let admin = service.get_profile("admin").await.unwrap();

        let page = service
            .browse_listings(ListingFilters::default(), Locale::Fr)
            .await
            .unwrap();
        assert!(page.data.iter().all(|card| card.id != "listing-sfax"));

        let queue = service.moderation_queue(&admin).await.unwrap();
        assert_eq!(queue.len(), 1);

        service
            .moderate_listing(&admin, "listing-sfax", ListingStatus::Verified)
            .await
            .unwrap();

        let page = service
            .browse_listings(ListingFilters::default(), Locale::Fr)
            .await
            .unwrap();
        assert!(page.data.iter().any(|card| card.id == "listing-sfax"));
    }

    #[tokio::test]
    async fn moderation_requires_the_admin_role() {
        let service = seeded().await;
        let amira = service.get_profile("user-amira").await.unwrap();

        let denied = service
            .moderate_listing(&amira, "listing-sfax", ListingStatus::Verified)
            .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden)));

        let admin = service.get_profile("admin").await.unwrap();
        let invalid = service
            .moderate_listing(&admin, "listing-sfax", ListingStatus::Pending)
            .await;
        assert!(matches!(invalid, Err(ServiceError::Invalid(_))));
    }

    #[tokio::test]
    async fn listing_detail_increments_views_and_hides_pending() {
        let service = seeded().await;

        let detail = service
            .listing_detail("listing-carthage", Locale::En)
            .await
            .unwrap();
        assert_eq!(detail.display_title, "Sea-view S+2 apartment in Carthage");
        assert_eq!(detail.listing.views_count, 1);
        assert_eq!(detail.owner.full_name, "Karim Trabelsi");

        let missing = service.listing_detail("listing-sfax", Locale::Fr).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn updates_reset_moderation_and_enforce_ownership() {
        let service = seeded().await;

        let patch = UpdateListing {
            price: Some(400_000),
            ..UpdateListing::default()
        };
        let updated = service
            .update_listing("user-karim", "listing-carthage", patch.clone())
            .await
            .unwrap();
        assert_eq!(updated.price, 400_000);
        assert_eq!(updated.status, ListingStatus::Pending);

        let denied = service
            .update_listing("user-amira", "listing-sousse", patch)
            .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden)));
    }

    #[tokio::test]
    async fn favorite_toggle_flips_between_added_and_removed() {
        let service = seeded().await;
        let input = ToggleFavorite {
            listing_id: "listing-sousse".to_string(),
        };

        let outcome = service
            .toggle_favorite("user-amira", input.clone())
            .await
            .unwrap();
        assert_eq!(outcome.action, FavoriteAction::Added);

        let outcome = service.toggle_favorite("user-amira", input).await.unwrap();
        assert_eq!(outcome.action, FavoriteAction::Removed);

        // the seeded favorite is still there
        assert_eq!(
            service.favorites("user-amira").await.unwrap(),
            vec!["listing-carthage".to_string()]
        );
    }

    #[tokio::test]
    async fn conversations_group_by_counterpart_with_unread_counts() {
        let service = seeded().await;

        let inbox = service.conversations("user-amira").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].other_user.id, "user-karim");
        assert_eq!(inbox[0].unread_count, 1);

        assert_eq!(service.unread_count("user-amira").await.unwrap(), 1);
        assert_eq!(
            service
                .mark_conversation_read("user-amira", "user-karim")
                .await
                .unwrap(),
            1
        );
        assert_eq!(service.unread_count("user-amira").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sending_to_an_unknown_recipient_fails() {
        let service = seeded().await;
        let amira = service.get_profile("user-amira").await.unwrap();

        let result = service
            .send_message(
                &amira,
                CreateMessage {
                    to_id: "ghost".to_string(),
                    listing_id: None,
                    content: "hello?".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn pro_registration_is_unique_and_promotes_the_role() {
        let service = seeded().await;
        let amira = service.get_profile("user-amira").await.unwrap();

        let input = RegisterPro {
            business_name_fr: "Peinture Amira".to_string(),
            business_name_ar: None,
            category: dari_core::models::ProCategory::Painter,
            phone: "22456789".to_string(),
            bio_fr: None,
            bio_ar: None,
            governorates: vec!["tunis".to_string()],
        };
        service.register_pro(&amira, input.clone()).await.unwrap();

        let promoted = service.get_profile("user-amira").await.unwrap();
        assert_eq!(promoted.role, Role::Pro);

        let again = service.register_pro(&promoted, input).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn reviews_recompute_the_aggregate_rating() {
        let service = seeded().await;
        let amira = service.get_profile("user-amira").await.unwrap();

        service
            .submit_review(
                &amira,
                CreateReview {
                    pro_id: "pro-karim".to_string(),
                    rating: 3,
                    comment: None,
                },
            )
            .await
            .unwrap();

        let detail = service.pro_detail("pro-karim", Locale::Fr).await.unwrap();
        assert_eq!(detail.card.reviews_count, 2);
        assert!((detail.card.rating - 4.0).abs() < f32::EPSILON);
        assert_eq!(detail.reviews.len(), 2);
    }

    #[tokio::test]
    async fn pro_cards_resolve_the_business_name_per_locale() {
        let service = seeded().await;

        let page = service
            .list_pros(ProFilters::default(), Locale::Ar)
            .await
            .unwrap();
        assert_eq!(page.data[0].display_business_name, "سباكة الطرابلسي");
        assert_eq!(page.data[0].category_label, "سباك");

        let page = service
            .list_pros(ProFilters::default(), Locale::En)
            .await
            .unwrap();
        // no English business name on file: French wins
        assert_eq!(page.data[0].display_business_name, "Plomberie Trabelsi");
    }

    #[tokio::test]
    async fn filters_narrow_the_browse_page() {
        let service = seeded().await;

        let filters = ListingFilters {
            listing_type: Some(ListingType::Rent),
            ..ListingFilters::default()
        };
        let page = service
            .browse_listings(filters, Locale::Fr)
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].id, "listing-sousse");
    }
}
