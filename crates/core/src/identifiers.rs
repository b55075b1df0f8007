//! Structured public identifiers.
//!
//! Codes carry a fixed-width business prefix followed by a zero-padded
//! per-scope sequence. Sequences wrap back to 1 once the ceiling is passed;
//! after a wrap, numbers still held by a code with the same prefix are skipped.

use std::collections::HashSet;

use crate::domain::listing::FuelType;
use crate::domain::owner::OwnerKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UidEntity {
    /// Scoped per owner.
    Listing,
    /// Scoped per add-on product.
    Voucher,
}

impl UidEntity {
    pub const fn ceiling(&self) -> u32 {
        match self {
            Self::Listing => 999,
            Self::Voucher => 99_999,
        }
    }

    pub const fn width(&self) -> usize {
        match self {
            Self::Listing => 3,
            Self::Voucher => 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingCodeParts<'a> {
    pub owner_kind: OwnerKind,
    pub brand: &'a str,
    pub province: &'a str,
    pub fuel_type: FuelType,
}

impl ListingCodeParts<'_> {
    pub fn prefix(&self) -> String {
        let mut prefix = String::with_capacity(6);
        prefix.push(self.owner_kind.code_letter());
        prefix.push_str(&initials(self.brand, 2));
        prefix.push_str(&initials(self.province, 2));
        prefix.push(self.fuel_type.code_letter());
        prefix
    }
}

pub fn next_sequence(max_existing: Option<u32>, ceiling: u32) -> u32 {
    match max_existing {
        Some(max) if max < ceiling => max + 1,
        _ => 1,
    }
}

/// First sequence from `start` upwards, wrapping past `ceiling`, that `taken`
/// does not hold. `None` once every number in the scope is in use.
pub fn first_free_sequence(start: u32, ceiling: u32, taken: &HashSet<u32>) -> Option<u32> {
    (start.max(1)..=ceiling).chain(1..start).find(|sequence| !taken.contains(sequence))
}

/// Trailing ASCII digit run of a code, if any.
pub fn parse_suffix(code: &str) -> Option<u32> {
    let digits: String = code
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

pub fn max_suffix<'a>(codes: impl IntoIterator<Item = &'a str>) -> Option<u32> {
    codes.into_iter().filter_map(parse_suffix).max()
}

pub fn listing_code(parts: &ListingCodeParts<'_>, sequence: u32) -> String {
    format!("{}-{:0width$}", parts.prefix(), sequence, width = UidEntity::Listing.width())
}

pub fn voucher_code(sequence: u32) -> String {
    format!("CMU-{:0width$}", sequence, width = UidEntity::Voucher.width())
}

fn initials(value: &str, count: usize) -> String {
    let mut out: String = value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(count)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    while out.len() < count {
        out.push('X');
    }
    out
}
