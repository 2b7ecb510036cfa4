use phonenumber::country::Id as CountryId;
use phonenumber::Mode;

/// A phone field value with its derived representations.
///
/// `national` and `e164` are recomputed from the raw string on every change;
/// they are never stored independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneValue {
    /// Two-letter country code, lowercase (e.g. `us`).
    pub country: String,
    /// The international-ish string as typed.
    pub raw: String,
    /// National formatting of the parsed number, empty when unparseable.
    pub national: String,
    /// E.164 representation, present only when the number is valid.
    pub e164: Option<String>,
}

impl PhoneValue {
    /// The widget's initial state: United States selected, nothing typed.
    pub fn empty() -> Self {
        Self {
            country: "us".to_string(),
            raw: String::new(),
            national: String::new(),
            e164: None,
        }
    }

    /// Re-derives the national and E.164 forms from a raw entry.
    ///
    /// The selected country acts as the default region, so national digits
    /// like `2125550100` with `us` still resolve; a leading `+` overrides it.
    pub fn parse(country: &str, raw: &str) -> Self {
        let country = country.trim().to_lowercase();
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            return Self {
                country,
                raw,
                national: String::new(),
                e164: None,
            };
        }

        let region = country.to_uppercase().parse::<CountryId>().ok();
        match phonenumber::parse(region, &raw) {
            Ok(number) => {
                let national = number.format().mode(Mode::National).to_string();
                let e164 = if phonenumber::is_valid(&number) {
                    Some(number.format().mode(Mode::E164).to_string())
                } else {
                    None
                };
                Self {
                    country,
                    raw,
                    national,
                    e164,
                }
            }
            Err(_) => Self {
                country,
                raw,
                national: String::new(),
                e164: None,
            },
        }
    }

    /// Companion fields sent alongside the named phone field so the server
    /// can read a normalized number without knowing the widget's format.
    pub fn transport_fields(&self, name: &str) -> Vec<(String, String)> {
        vec![
            (
                format!("{}_e164", name),
                self.e164.clone().unwrap_or_else(|| self.raw.clone()),
            ),
            (format!("{}_country", name), self.country.to_uppercase()),
        ]
    }
}

impl Default for PhoneValue {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_digits_derive_e164_from_country() {
        let value = PhoneValue::parse("us", "2125550100");
        assert_eq!(value.e164.as_deref(), Some("+12125550100"));
        assert_eq!(value.national, "(212) 555-0100");
    }

    #[test]
    fn international_prefix_overrides_country() {
        let value = PhoneValue::parse("gb", "+12125550100");
        assert_eq!(value.e164.as_deref(), Some("+12125550100"));
    }

    #[test]
    fn invalid_number_has_no_e164() {
        let value = PhoneValue::parse("us", "123");
        assert!(value.e164.is_none());
        assert_eq!(value.raw, "123");
    }

    #[test]
    fn empty_entry_stays_empty() {
        let value = PhoneValue::parse("us", "   ");
        assert_eq!(value.raw, "");
        assert_eq!(value.national, "");
        assert!(value.e164.is_none());
    }

    #[test]
    fn transport_fields_prefer_e164_and_uppercase_country() {
        let value = PhoneValue::parse("us", "2125550100");
        let fields = value.transport_fields("phone");
        assert_eq!(
            fields,
            vec![
                ("phone_e164".to_string(), "+12125550100".to_string()),
                ("phone_country".to_string(), "US".to_string()),
            ]
        );

        let invalid = PhoneValue::parse("us", "123");
        let fields = invalid.transport_fields("phone");
        assert_eq!(fields[0].1, "123", "raw string travels when invalid");
    }
}
