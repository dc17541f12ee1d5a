use serde_json::{Map, Value};

use crate::locale::Locale;

fn camel_suffix(locale: Locale) -> &'static str {
    match locale {
        Locale::Fr => "Fr",
        Locale::Ar => "Ar",
        Locale::En => "En",
    }
}

fn usable(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// One step of the fallback chain: try the snake_case key (`title_fr`)
/// first, then the camelCase key (`titleFr`). Data-access layers produce
/// both shapes for the same logical entity, so every step checks both.
fn variant<'a>(entity: &'a Map<String, Value>, field: &str, locale: Locale) -> Option<&'a str> {
    let code = locale.as_code();
    usable(entity.get(&format!("{field}_{code}")))
        .or_else(|| usable(entity.get(&format!("{field}{}", camel_suffix(locale)))))
}

/// Resolve the best display string for `field` on a multilingual entity.
///
/// Walks the fixed priority chain (requested locale, then fr, ar, en) and
/// returns the first non-empty string variant. Missing keys, nulls, empty
/// strings and non-string values are skipped; when nothing matches the
/// result is the empty string. Never fails, whatever the entity shape.
pub fn localized_field(entity: &Value, field: &str, locale: Locale) -> String {
    let Some(map) = entity.as_object() else {
        return String::new();
    };

    for step in locale.fallback_chain() {
        if let Some(text) = variant(map, field, step) {
            return text.to_string();
        }
    }

    String::new()
}

/// Single-locale read: same two-convention lookup and usability rule as
/// [`localized_field`], but without the fallback chain.
pub fn localized_variant(entity: &Value, field: &str, locale: Locale) -> Option<String> {
    entity
        .as_object()
        .and_then(|map| variant(map, field, locale).map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn listing() -> Value {
        json!({
            "title_fr": "Appartement moderne",
            "title_ar": "شقة حديثة",
            "title_en": "Modern apartment",
            "description_fr": "Un bel appartement",
            "description_ar": "",
            "description_en": null,
        })
    }

    #[test]
    fn returns_the_requested_locale_variant() {
        let entity = listing();
        assert_eq!(
            localized_field(&entity, "title", Locale::Fr),
            "Appartement moderne"
        );
        assert_eq!(localized_field(&entity, "title", Locale::Ar), "شقة حديثة");
        assert_eq!(
            localized_field(&entity, "title", Locale::En),
            "Modern apartment"
        );
    }

    #[test]
    fn camel_case_entities_resolve_too() {
        let entity = json!({
            "titleFr": "Appartement Prisma",
            "titleAr": "شقة بريزما",
            "titleEn": "Prisma apartment",
        });
        assert_eq!(
            localized_field(&entity, "title", Locale::Fr),
            "Appartement Prisma"
        );
        assert_eq!(
            localized_field(&entity, "title", Locale::En),
            "Prisma apartment"
        );
    }

    #[test]
    fn empty_variant_falls_back_to_french() {
        assert_eq!(
            localized_field(&listing(), "description", Locale::Ar),
            "Un bel appartement"
        );
    }

    #[test]
    fn null_variant_falls_back_to_french() {
        assert_eq!(
            localized_field(&listing(), "description", Locale::En),
            "Un bel appartement"
        );
    }

    #[test]
    fn french_serves_as_fallback_for_any_locale() {
        let partial = json!({ "title_fr": "Titre" });
        assert_eq!(localized_field(&partial, "title", Locale::Ar), "Titre");
        assert_eq!(localized_field(&partial, "title", Locale::En), "Titre");
    }

    #[test]
    fn arabic_then_english_when_french_is_missing() {
        let entity = json!({ "title_ar": "عنوان", "title_en": "Title" });
        assert_eq!(localized_field(&entity, "title", Locale::En), "Title");
        assert_eq!(localized_field(&entity, "title", Locale::Fr), "عنوان");

        let english_only = json!({ "title_en": "Title" });
        assert_eq!(localized_field(&english_only, "title", Locale::Fr), "Title");
    }

    #[test]
    fn mixed_conventions_resolve_per_step() {
        let entity = json!({ "titleFr": "Titre", "title_ar": "عنوان" });
        assert_eq!(localized_field(&entity, "title", Locale::Ar), "عنوان");
        assert_eq!(localized_field(&entity, "title", Locale::En), "Titre");
    }

    #[test]
    fn snake_case_wins_over_camel_case_within_a_step() {
        let entity = json!({ "title_fr": "serpent", "titleFr": "chameau" });
        assert_eq!(localized_field(&entity, "title", Locale::Fr), "serpent");
    }

    #[test]
    fn unusable_snake_key_lets_the_camel_key_through() {
        let entity = json!({ "title_fr": "", "titleFr": "chameau" });
        assert_eq!(localized_field(&entity, "title", Locale::Fr), "chameau");
    }

    #[test]
    fn non_string_values_are_skipped() {
        let entity = json!({ "price_fr": 1200, "price_en": "twelve hundred" });
        assert_eq!(
            localized_field(&entity, "price", Locale::Fr),
            "twelve hundred"
        );
    }

    #[test]
    fn no_matching_keys_yields_empty_string() {
        assert_eq!(localized_field(&json!({}), "address", Locale::Fr), "");
        assert_eq!(localized_field(&listing(), "address", Locale::Fr), "");
    }

    #[test]
    fn single_variant_read_does_not_fall_back() {
        let entity = listing();
        assert_eq!(
            localized_variant(&entity, "description", Locale::Ar),
            None
        );
        assert_eq!(
            localized_variant(&entity, "description", Locale::Fr).as_deref(),
            Some("Un bel appartement")
        );
    }

    #[test]
    fn non_object_entities_yield_empty_string() {
        assert_eq!(localized_field(&json!(null), "title", Locale::Fr), "");
        assert_eq!(localized_field(&json!([1, 2]), "title", Locale::Ar), "");
        assert_eq!(localized_field(&json!("text"), "title", Locale::En), "");
    }
}
