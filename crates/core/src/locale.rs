use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    Fr,
    Ar,
    En,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl Default for Locale {
    fn default() -> Self {
        Self::Fr
    }
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Fr, Locale::Ar, Locale::En];

    pub fn from_optional_str(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "ar" || v == "ar-tn" || v == "ar-sa" || v == "arabic" => Self::Ar,
            Some(v) if v == "en" || v == "en-us" || v == "en-gb" || v == "english" => Self::En,
            Some(v) if v == "fr" || v == "fr-fr" || v == "fr-tn" || v == "french" => Self::Fr,
            _ => Self::default(),
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    pub fn direction(self) -> TextDirection {
        match self {
            Self::Ar => TextDirection::Rtl,
            Self::Fr | Self::En => TextDirection::Ltr,
        }
    }

    pub fn is_rtl(self) -> bool {
        self.direction() == TextDirection::Rtl
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fr => "Français",
            Self::Ar => "العربية",
            Self::En => "English",
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Self::Fr => "🇫🇷",
            Self::Ar => "🇹🇳",
            Self::En => "🇬🇧",
        }
    }

    /// Display fallback priority for a requested locale. French is the
    /// canonical content language, so it always comes right after the
    /// requested locale; Arabic and English close the chain.
    pub fn fallback_chain(self) -> [Locale; 4] {
        [self, Locale::Fr, Locale::Ar, Locale::En]
    }
}
