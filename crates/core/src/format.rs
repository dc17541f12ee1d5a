use chrono::{DateTime, Datelike, Utc};

use crate::locale::Locale;

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

// Tunisian month names, not the eastern Arabic ones.
const MONTHS_AR: [&str; 12] = [
    "جانفي",
    "فيفري",
    "مارس",
    "أفريل",
    "ماي",
    "جوان",
    "جويلية",
    "أوت",
    "سبتمبر",
    "أكتوبر",
    "نوفمبر",
    "ديسمبر",
];

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn group_thousands(amount: i64, separator: char) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }

    let leading = digits.len() % 3;
    for (index, ch) in digits.chars().enumerate() {
        if index != 0 && index % 3 == leading % 3 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }

    grouped
}

fn currency_symbol(currency: &str, locale: Locale) -> &str {
    match (currency, locale) {
        ("TND", Locale::Fr) => "DT",
        ("TND", Locale::Ar) => "د.ت",
        ("TND", Locale::En) => "TND",
        _ => currency,
    }
}

pub fn format_price(amount: i64, locale: Locale, currency: &str) -> String {
    let symbol = currency_symbol(currency, locale);
    match locale {
        Locale::Fr => format!("{} {symbol}", group_thousands(amount, ' ')),
        Locale::Ar => format!("{} {symbol}", group_thousands(amount, ',')),
        Locale::En => format!("{symbol} {}", group_thousands(amount, ',')),
    }
}

pub fn format_compact_price(amount: i64, locale: Locale) -> String {
    let (scaled, suffix) = if amount.abs() >= 1_000_000 {
        (
            amount as f64 / 1_000_000.0,
            match locale {
                Locale::Fr | Locale::En => "M",
                Locale::Ar => "مليون",
            },
        )
    } else if amount.abs() >= 1_000 {
        (
            amount as f64 / 1_000.0,
            match locale {
                Locale::Fr => "k",
                Locale::En => "K",
                Locale::Ar => "ألف",
            },
        )
    } else {
        return group_thousands(amount, if locale == Locale::En { ',' } else { ' ' });
    };

    let mut rendered = format!("{:.1}", scaled);
    if rendered.ends_with(".0") {
        rendered.truncate(rendered.len() - 2);
    }
    if locale == Locale::Fr || locale == Locale::Ar {
        rendered = rendered.replace('.', ",");
    }

    match locale {
        Locale::Ar => format!("{rendered} {suffix}"),
        Locale::Fr | Locale::En => format!("{rendered}{suffix}"),
    }
}

pub fn format_surface(value: f64, locale: Locale) -> String {
    let whole = group_thousands(
        value.round() as i64,
        if locale == Locale::En { ',' } else { ' ' },
    );
    format!("{whole} m²")
}

pub fn format_date(date: DateTime<Utc>, locale: Locale) -> String {
    let month = (date.month0() as usize).min(11);
    match locale {
        Locale::Fr => format!("{} {} {}", date.day(), MONTHS_FR[month], date.year()),
        Locale::Ar => format!("{} {} {}", date.day(), MONTHS_AR[month], date.year()),
        Locale::En => format!("{} {}, {}", MONTHS_EN[month], date.day(), date.year()),
    }
}

/// Coarse "posted N days/weeks/months ago" used on listing cards. `now`
/// is passed in so rendering stays deterministic.
pub fn format_relative_date(date: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> String {
    let days = (now - date).num_days().max(0);

    let (count, unit) = if days == 0 {
        return match locale {
            Locale::Fr => "aujourd'hui".to_string(),
            Locale::Ar => "اليوم".to_string(),
            Locale::En => "today".to_string(),
        };
    } else if days < 7 {
        (days, Unit::Day)
    } else if days < 30 {
        (days / 7, Unit::Week)
    } else if days < 365 {
        (days / 30, Unit::Month)
    } else {
        (days / 365, Unit::Year)
    };

    match locale {
        Locale::Fr => format!("il y a {count} {}", unit.french(count)),
        Locale::Ar => format!("منذ {count} {}", unit.arabic()),
        Locale::En => format!("{count} {} ago", unit.english(count)),
    }
}

enum Unit {
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn french(&self, count: i64) -> &'static str {
        let plural = count > 1;
        match self {
            Self::Day => {
                if plural {
                    "jours"
                } else {
                    "jour"
                }
            }
            Self::Week => {
                if plural {
                    "semaines"
                } else {
                    "semaine"
                }
            }
            Self::Month => "mois",
            Self::Year => {
                if plural {
                    "ans"
                } else {
                    "an"
                }
            }
        }
    }

    fn arabic(&self) -> &'static str {
        match self {
            Self::Day => "يوم",
            Self::Week => "أسبوع",
            Self::Month => "شهر",
            Self::Year => "سنة",
        }
    }

    fn english(&self, count: i64) -> &'static str {
        let plural = count > 1;
        match self {
            Self::Day => {
                if plural {
                    "days"
                } else {
                    "day"
                }
            }
            Self::Week => {
                if plural {
                    "weeks"
                } else {
                    "week"
                }
            }
            Self::Month => {
                if plural {
                    "months"
                } else {
                    "month"
                }
            }
            Self::Year => {
                if plural {
                    "years"
                } else {
                    "year"
                }
            }
        }
    }
}
