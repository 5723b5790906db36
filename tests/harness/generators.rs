// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a pool of distinct sender emails.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("sender{}@client-{}.example.com", i, i % 7))
        .collect()
}

/// Names a real visitor might type, in both site languages.
pub fn generate_names() -> Vec<&'static str> {
    vec![
        "Fatima Al-Zahra",
        "John O'Brien",
        "محمد بن راشد",
        "Chloé Dubois",
        "Li Wei",
        "نور الهدى",
    ]
}

/// Messages that should pass every content heuristic.
pub fn generate_clean_messages() -> Vec<&'static str> {
    vec![
        "Hello, I would like to schedule a demo for our team.",
        "Could you send pricing for 50 seats? Budget is < 10k.",
        "مرحباً، أود الاستفسار عن خدماتكم للشركات.",
        "We met at the expo in Dubai and I'd like to follow up.",
        "Is your platform available in Arabic and English?",
    ]
}

/// Messages that carry a spam trigger: URLs, markup or keywords.
pub fn generate_spam_messages() -> Vec<&'static str> {
    vec![
        "Check this out: http://example.com",
        "Great deals at HTTPS://cheap.example.net/now",
        "Read more ftp://files.example.org/offer.zip",
        "Click <a href='x'>here</a> for a prize",
        "<script>alert('hi')</script> hello there",
        "Visit www.cheap-meds.example for discounts",
        "[url=spam.example]buy now[/url] limited offer",
        "[LINK=spam.example]cheap[/link] limited offer",
        "Best online Casino bonuses, sign up today",
        "Discount VIAGRA shipped worldwide overnight",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_emails_unique() {
        let emails = generate_emails(100);
        let unique: std::collections::HashSet<_> = emails.iter().collect();
        assert_eq!(unique.len(), 100);
    }
}
