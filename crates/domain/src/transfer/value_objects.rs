//! Value objects for the transfer domain.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Negative amounts exist only as ledger deltas (debits); a transfer
/// amount itself must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = R$ 10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole-real value.
    pub fn from_reais(reais: i64) -> Self {
        Self { cents: reais * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-real portion.
    pub fn reais(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after whole reais).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Returns true for amounts of at least R$ 10 000 that are an exact
    /// multiple of R$ 1 000. Round transfers at this scale are a
    /// money-laundering signal for the risk analyzer.
    pub fn is_round_thousands(&self) -> bool {
        self.cents >= 1_000_000 && self.cents % 100_000 == 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-R$ {}.{:02}", self.reais().abs(), self.cents_part())
        } else {
            write!(f, "R$ {}.{:02}", self.reais(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money { cents: -self.cents }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

/// Classification of a payment key by its textual shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// 11-digit natural-person document.
    Cpf,
    /// 14-digit legal-entity document.
    Cnpj,
    /// Email address.
    Email,
    /// Phone number, optionally with a leading `+`.
    Phone,
    /// Randomly generated key (UUID-shaped).
    Random,
    /// Anything that matches no known shape.
    Other,
}

impl KeyKind {
    /// Returns the kind name as used in logs and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Cpf => "CPF",
            KeyKind::Cnpj => "CNPJ",
            KeyKind::Email => "EMAIL",
            KeyKind::Phone => "PHONE",
            KeyKind::Random => "RANDOM",
            KeyKind::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A destination payment key, as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixKey(String);

impl PixKey {
    /// Creates a key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies the key by shape.
    pub fn kind(&self) -> KeyKind {
        let key = self.0.as_str();
        let digits = key.chars().all(|c| c.is_ascii_digit());

        if digits && key.len() == 11 {
            KeyKind::Cpf
        } else if digits && key.len() == 14 {
            KeyKind::Cnpj
        } else if key.contains('@') {
            KeyKind::Email
        } else if is_phone(key) {
            KeyKind::Phone
        } else if is_random_key(key) {
            KeyKind::Random
        } else {
            KeyKind::Other
        }
    }

    /// Returns a privacy-preserving rendering of the key.
    ///
    /// Emails keep the first character of the local part and the full
    /// domain; documents keep leading and trailing digits. Used in display
    /// metadata and regulatory payloads; never log the raw key.
    pub fn masked(&self) -> String {
        let key = self.0.as_str();
        if let Some((local, domain)) = key.split_once('@') {
            let first = local.chars().next().unwrap_or('*');
            return format!("{first}****@{domain}");
        }
        let len = key.len();
        if !key.is_ascii() || len < 4 {
            "****".to_string()
        } else if len == 11 {
            format!("{}*****{}", &key[..3], &key[8..])
        } else {
            format!("{}****{}", &key[..2], &key[len - 2..])
        }
    }
}

fn is_phone(key: &str) -> bool {
    let rest = key.strip_prefix('+').unwrap_or(key);
    (10..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}

fn is_random_key(key: &str) -> bool {
    (32..=36).contains(&key.len())
        && key
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase() || c == '-')
}

impl std::fmt::Display for PixKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PixKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PixKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PixKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
