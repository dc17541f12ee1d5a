use serde::Serialize;

use crate::locale::Locale;
use crate::models::ProCategory;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Governorate {
    pub value: &'static str,
    pub label_fr: &'static str,
    pub label_ar: &'static str,
    pub label_en: &'static str,
}

impl Governorate {
    pub fn label(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Fr => self.label_fr,
            Locale::Ar => self.label_ar,
            Locale::En => self.label_en,
        }
    }
}

pub const GOVERNORATES: &[Governorate] = &[
    Governorate { value: "tunis", label_fr: "Tunis", label_ar: "تونس", label_en: "Tunis" },
    Governorate { value: "ariana", label_fr: "Ariana", label_ar: "أريانة", label_en: "Ariana" },
    Governorate { value: "ben-arous", label_fr: "Ben Arous", label_ar: "بن عروس", label_en: "Ben Arous" },
    Governorate { value: "manouba", label_fr: "Manouba", label_ar: "منوبة", label_en: "Manouba" },
    Governorate { value: "nabeul", label_fr: "Nabeul", label_ar: "نابل", label_en: "Nabeul" },
    Governorate { value: "zaghouan", label_fr: "Zaghouan", label_ar: "زغوان", label_en: "Zaghouan" },
    Governorate { value: "bizerte", label_fr: "Bizerte", label_ar: "بنزرت", label_en: "Bizerte" },
    Governorate { value: "beja", label_fr: "Béja", label_ar: "باجة", label_en: "Beja" },
    Governorate { value: "jendouba", label_fr: "Jendouba", label_ar: "جندوبة", label_en: "Jendouba" },
    Governorate { value: "kef", label_fr: "Le Kef", label_ar: "الكاف", label_en: "Kef" },
    Governorate { value: "siliana", label_fr: "Siliana", label_ar: "سليانة", label_en: "Siliana" },
    Governorate { value: "sousse", label_fr: "Sousse", label_ar: "سوسة", label_en: "Sousse" },
    Governorate { value: "monastir", label_fr: "Monastir", label_ar: "المنستير", label_en: "Monastir" },
    Governorate { value: "mahdia", label_fr: "Mahdia", label_ar: "المهدية", label_en: "Mahdia" },
    Governorate { value: "sfax", label_fr: "Sfax", label_ar: "صفاقس", label_en: "Sfax" },
    Governorate { value: "kairouan", label_fr: "Kairouan", label_ar: "القيروان", label_en: "Kairouan" },
    Governorate { value: "kasserine", label_fr: "Kasserine", label_ar: "القصرين", label_en: "Kasserine" },
    Governorate { value: "sidi-bouzid", label_fr: "Sidi Bouzid", label_ar: "سيدي بوزيد", label_en: "Sidi Bouzid" },
    Governorate { value: "gabes", label_fr: "Gabès", label_ar: "قابس", label_en: "Gabes" },
    Governorate { value: "medenine", label_fr: "Médenine", label_ar: "مدنين", label_en: "Medenine" },
    Governorate { value: "tataouine", label_fr: "Tataouine", label_ar: "تطاوين", label_en: "Tataouine" },
    Governorate { value: "gafsa", label_fr: "Gafsa", label_ar: "قفصة", label_en: "Gafsa" },
    Governorate { value: "tozeur", label_fr: "Tozeur", label_ar: "توزر", label_en: "Tozeur" },
    Governorate { value: "kebili", label_fr: "Kébili", label_ar: "قبلي", label_en: "Kebili" },
];

pub fn governorate(value: &str) -> Option<&'static Governorate> {
    GOVERNORATES
        .iter()
        .find(|entry| entry.value == value.trim().to_lowercase())
}

pub fn governorate_label(value: &str, locale: Locale) -> String {
    governorate(value)
        .map(|entry| entry.label(locale).to_string())
        .unwrap_or_else(|| value.to_string())
}

impl ProCategory {
    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Plumber, Locale::Fr) => "Plombier",
            (Self::Plumber, Locale::Ar) => "سباك",
            (Self::Plumber, Locale::En) => "Plumber",
            (Self::Electrician, Locale::Fr) => "Électricien",
            (Self::Electrician, Locale::Ar) => "كهربائي",
            (Self::Electrician, Locale::En) => "Electrician",
            (Self::Painter, Locale::Fr) => "Peintre",
            (Self::Painter, Locale::Ar) => "دهان",
            (Self::Painter, Locale::En) => "Painter",
            (Self::Carpenter, Locale::Fr) => "Menuisier",
            (Self::Carpenter, Locale::Ar) => "نجار",
            (Self::Carpenter, Locale::En) => "Carpenter",
            (Self::Mason, Locale::Fr) => "Maçon",
            (Self::Mason, Locale::Ar) => "بنّاء",
            (Self::Mason, Locale::En) => "Mason",
            (Self::Cleaner, Locale::Fr) => "Nettoyage",
            (Self::Cleaner, Locale::Ar) => "تنظيف",
            (Self::Cleaner, Locale::En) => "Cleaner",
            (Self::Mover, Locale::Fr) => "Déménagement",
            (Self::Mover, Locale::Ar) => "نقل",
            (Self::Mover, Locale::En) => "Mover",
            (Self::Ac, Locale::Fr) => "Climatisation",
            (Self::Ac, Locale::Ar) => "تكييف",
            (Self::Ac, Locale::En) => "AC Technician",
            (Self::Gardener, Locale::Fr) => "Jardinier",
            (Self::Gardener, Locale::Ar) => "بستاني",
            (Self::Gardener, Locale::En) => "Gardener",
            (Self::Other, Locale::Fr) => "Autre",
            (Self::Other, Locale::Ar) => "أخرى",
            (Self::Other, Locale::En) => "Other",
        }
    }
}
