pub mod analytics;
pub mod banners;
pub mod categories;
pub mod conversations;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod seed;
pub mod users;
pub mod vendors;

/// URL-safe slug: lower-case ASCII alphanumerics separated by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims optional free text and drops it when blank.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One page of results plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Smart Phones", "smart-phones")]
    #[case("  Men's  Fashion & Shoes ", "men-s-fashion-shoes")]
    #[case("Inyange Juice 1L", "inyange-juice-1l")]
    #[case("--Kitenge--", "kitenge")]
    #[case("Café", "caf")]
    #[case("!!!", "")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Aline@IWANYU.com "), "aline@iwanyu.com");
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(Some(" Kigali ".into())), Some("Kigali".into()));
        assert_eq!(clean_optional(None), None);
    }
}
