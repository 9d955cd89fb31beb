//! Attendee token derivation.
//!
//! Public RSVPs carry no account. A returning visitor either presents the
//! token from their confirmation link, or re-enters the contact detail they
//! used the first time; hashing the normalised contact reproduces the same
//! token, which is what makes anonymous RSVPs idempotent.

use sha2::{Digest, Sha256};

/// Derive the opaque attendee token for a contact detail.
///
/// Stable under case and surrounding whitespace so "Ada@example.org " and
/// "ada@example.org" land on the same slot. The raw contact never leaves
/// this function.
pub fn derive_attendee_token(contact: &str) -> String {
  let canonical = contact.trim().to_lowercase();

  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_contact_same_token() {
    assert_eq!(
      derive_attendee_token("ada@example.org"),
      derive_attendee_token("ada@example.org"),
    );
  }

  #[test]
  fn normalisation_ignores_case_and_whitespace() {
    assert_eq!(
      derive_attendee_token("  Ada@Example.org "),
      derive_attendee_token("ada@example.org"),
    );
  }

  #[test]
  fn different_contacts_differ() {
    assert_ne!(
      derive_attendee_token("ada@example.org"),
      derive_attendee_token("grace@example.org"),
    );
  }

  #[test]
  fn token_is_lowercase_hex() {
    let token = derive_attendee_token("ada@example.org");
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }
}
