//! Shipping address selection.
//!
//! A checkout ships either to an address stored in the buyer's address book
//! (referenced by id) or to one typed into the form. [`AddressChoice`]
//! holds exactly one of the two, so selecting a stored address drops any
//! manual entry and vice versa.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AddressId;

const MIN_PHONE_DIGITS: usize = 9;
const MAX_PHONE_DIGITS: usize = 15;

/// Validation errors for manually entered addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Vui lòng nhập tên người nhận")]
    MissingRecipient,

    #[error("Vui lòng nhập địa chỉ")]
    MissingAddress,

    #[error("Số điện thoại không hợp lệ: {0}")]
    InvalidPhone(String),
}

/// An address typed into the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAddress {
    pub recipient_name: String,
    pub phone: String,
    pub full_address: String,
}

impl ManualAddress {
    /// Build a manual address, trimming every field.
    ///
    /// # Errors
    ///
    /// Returns an `AddressError` if the recipient or address text is blank,
    /// or if the phone number is not 9-15 digits (spaces, dots and dashes
    /// are ignored; a leading `+` is allowed).
    pub fn new(
        recipient_name: &str,
        phone: &str,
        full_address: &str,
    ) -> Result<Self, AddressError> {
        let recipient_name = recipient_name.trim();
        if recipient_name.is_empty() {
            return Err(AddressError::MissingRecipient);
        }
        let full_address = full_address.trim();
        if full_address.is_empty() {
            return Err(AddressError::MissingAddress);
        }

        Ok(Self {
            recipient_name: recipient_name.to_string(),
            phone: normalize_phone(phone)?,
            full_address: full_address.to_string(),
        })
    }
}

fn normalize_phone(raw: &str) -> Result<String, AddressError> {
    let trimmed = raw.trim();
    let (prefix, rest) = trimmed
        .strip_prefix('+')
        .map_or(("", trimmed), |rest| ("+", rest));

    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    let valid = digits.chars().all(|c| c.is_ascii_digit())
        && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len());
    if !valid {
        return Err(AddressError::InvalidPhone(trimmed.to_string()));
    }
    Ok(format!("{prefix}{digits}"))
}

/// An address from the buyer's address book, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    pub recipient_name: String,
    pub phone: String,
    pub full_address: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The address representation currently active in a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressChoice {
    #[default]
    None,
    Stored {
        id: AddressId,
    },
    Manual(ManualAddress),
}

impl AddressChoice {
    /// Select a stored address, discarding any manual entry.
    pub fn select_stored(&mut self, id: AddressId) {
        *self = Self::Stored { id };
    }

    /// Report the manual form's contents.
    ///
    /// `Some` replaces whatever was active, including a stored selection.
    /// `None` clears a manual entry but leaves a stored selection alone.
    pub fn set_manual(&mut self, manual: Option<ManualAddress>) {
        match manual {
            Some(address) => *self = Self::Manual(address),
            None => {
                if matches!(self, Self::Manual(_)) {
                    *self = Self::None;
                }
            }
        }
    }

    /// Forget any selection.
    pub fn clear(&mut self) {
        *self = Self::None;
    }

    #[must_use]
    pub const fn stored_id(&self) -> Option<AddressId> {
        match self {
            Self::Stored { id } => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn manual(&self) -> Option<&ManualAddress> {
        match self {
            Self::Manual(address) => Some(address),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manual() -> ManualAddress {
        ManualAddress::new("Nguyễn Văn A", "0912 345 678", "12 Lý Thái Tổ, Hà Nội").unwrap()
    }

    #[test]
    fn test_manual_address_trims_and_normalizes_phone() {
        let address = ManualAddress::new("  Trần B ", "+84 912.345.678", " Q1 ").unwrap();
        assert_eq!(address.recipient_name, "Trần B");
        assert_eq!(address.phone, "+84912345678");
        assert_eq!(address.full_address, "Q1");
    }

    #[test]
    fn test_manual_address_validation() {
        assert_eq!(
            ManualAddress::new(" ", "0912345678", "x"),
            Err(AddressError::MissingRecipient)
        );
        assert_eq!(
            ManualAddress::new("A", "0912345678", ""),
            Err(AddressError::MissingAddress)
        );
        assert!(matches!(
            ManualAddress::new("A", "12ab", "x"),
            Err(AddressError::InvalidPhone(_))
        ));
        assert!(matches!(
            ManualAddress::new("A", "0912", "x"),
            Err(AddressError::InvalidPhone(_))
        ));
    }

    #[test]
    fn test_selecting_stored_clears_manual() {
        let mut choice = AddressChoice::default();
        choice.set_manual(Some(manual()));
        assert!(choice.manual().is_some());

        choice.select_stored(AddressId::new(4));
        assert_eq!(choice.stored_id(), Some(AddressId::new(4)));
        assert!(choice.manual().is_none());
    }

    #[test]
    fn test_entering_manual_clears_stored() {
        let mut choice = AddressChoice::default();
        choice.select_stored(AddressId::new(4));

        choice.set_manual(Some(manual()));
        assert_eq!(choice.stored_id(), None);
        assert_eq!(choice.manual(), Some(&manual()));
    }

    #[test]
    fn test_clearing_manual_keeps_stored() {
        let mut choice = AddressChoice::default();
        choice.select_stored(AddressId::new(2));
        choice.set_manual(None);
        assert_eq!(choice.stored_id(), Some(AddressId::new(2)));

        choice.set_manual(Some(manual()));
        choice.set_manual(None);
        assert!(!choice.is_set());
    }

    #[test]
    fn test_choice_serialization_is_tagged() {
        let choice = AddressChoice::Stored {
            id: AddressId::new(9),
        };
        let json = serde_json::to_value(&choice).unwrap();
        assert_eq!(json["kind"], "stored");
        assert_eq!(json["id"], 9);
    }
}
