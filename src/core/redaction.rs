//! PII redaction applied to generated replies before they are recorded or spoken.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SSN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid SSN pattern"));
static CARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b").expect("valid card pattern")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("valid phone pattern"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email pattern")
});

/// A class of personally identifiable information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiClass {
    Ssn,
    CreditCard,
    PhoneNumber,
    Email,
}

impl PiiClass {
    /// Application order. Card numbers are matched before phone numbers so a
    /// 16-digit card is never partially consumed by the phone pattern.
    pub const ORDERED: [PiiClass; 4] = [
        PiiClass::Ssn,
        PiiClass::CreditCard,
        PiiClass::PhoneNumber,
        PiiClass::Email,
    ];

    pub fn placeholder(&self) -> &'static str {
        match self {
            PiiClass::Ssn => "[SSN REDACTED]",
            PiiClass::CreditCard => "[CARD REDACTED]",
            PiiClass::PhoneNumber => "[PHONE REDACTED]",
            PiiClass::Email => "[EMAIL REDACTED]",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            PiiClass::Ssn => &SSN_RE,
            PiiClass::CreditCard => &CARD_RE,
            PiiClass::PhoneNumber => &PHONE_RE,
            PiiClass::Email => &EMAIL_RE,
        }
    }
}

impl std::str::FromStr for PiiClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssn" => Ok(PiiClass::Ssn),
            "credit_card" | "card" => Ok(PiiClass::CreditCard),
            "phone_number" | "phone" => Ok(PiiClass::PhoneNumber),
            "email" => Ok(PiiClass::Email),
            _ => Err(format!("Unknown PII class: {s}")),
        }
    }
}

/// Replaces configured PII classes with fixed placeholders.
///
/// Placeholders never match any pattern, so redaction is idempotent.
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    classes: Vec<PiiClass>,
}

impl PiiRedactor {
    /// Build a redactor for the given classes. Order and duplicates in the
    /// input are ignored; classes always apply in [`PiiClass::ORDERED`] order.
    pub fn new(classes: &[PiiClass]) -> Self {
        let classes = PiiClass::ORDERED
            .iter()
            .copied()
            .filter(|c| classes.contains(c))
            .collect();
        Self { classes }
    }

    /// A redactor that leaves text unchanged.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.classes.is_empty()
    }

    pub fn classes(&self) -> &[PiiClass] {
        &self.classes
    }

    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for class in &self.classes {
            if let Cow::Owned(replaced) = class.pattern().replace_all(&out, class.placeholder()) {
                out = Cow::Owned(replaced);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> PiiRedactor {
        PiiRedactor::new(&PiiClass::ORDERED)
    }

    #[test]
    fn test_email_redaction() {
        let redactor = PiiRedactor::new(&[PiiClass::Email]);
        assert_eq!(redactor.redact("Contact a@b.com"), "Contact [EMAIL REDACTED]");
    }

    #[test]
    fn test_each_class() {
        let r = all();
        assert_eq!(r.redact("SSN 123-45-6789."), "SSN [SSN REDACTED].");
        assert_eq!(
            r.redact("card 4111 1111 1111 1111 ok"),
            "card [CARD REDACTED] ok"
        );
        assert_eq!(r.redact("call 555-123-4567"), "call [PHONE REDACTED]");
        assert_eq!(r.redact("call 555.123.4567"), "call [PHONE REDACTED]");
    }

    #[test]
    fn test_card_takes_precedence_over_phone() {
        let r = all();
        assert_eq!(r.redact("4111-1111-1111-1111"), "[CARD REDACTED]");
    }

    #[test]
    fn test_only_listed_classes_apply() {
        let r = PiiRedactor::new(&[PiiClass::Ssn]);
        assert_eq!(
            r.redact("123-45-6789 and a@b.com"),
            "[SSN REDACTED] and a@b.com"
        );
    }

    #[test]
    fn test_idempotent() {
        let r = all();
        let text = "Reach me at a@b.com or 555-123-4567, SSN 123-45-6789";
        let once = r.redact(text).into_owned();
        let twice = r.redact(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_disabled_borrows() {
        let r = PiiRedactor::disabled();
        assert!(!r.is_enabled());
        assert!(matches!(r.redact("a@b.com"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_class() {
        assert_eq!("credit_card".parse::<PiiClass>().unwrap(), PiiClass::CreditCard);
        assert_eq!("EMAIL".parse::<PiiClass>().unwrap(), PiiClass::Email);
        assert!("dob".parse::<PiiClass>().is_err());
    }
}
