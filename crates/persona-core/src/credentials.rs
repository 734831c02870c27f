//! Password and username generation

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng};

use crate::error::PersonaError;
use crate::identity::Locale;
use crate::translit;
use crate::Result;

/// Password alphabet: ASCII letters and digits
const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Shortest name fragment used in a username
pub const MIN_FRAGMENT_LEN: usize = 3;

/// Random password length in `7..=10`
pub fn random_password_length<R: Rng + ?Sized>(rng: &mut R) -> usize {
    rng.gen_range(7..=10)
}

/// Password of `length` characters drawn from the OS CSPRNG.
pub fn generate_password(length: usize) -> String {
    generate_password_with(&mut OsRng, length)
}

/// Password of `length` characters drawn from the given cryptographic source.
pub fn generate_password_with<R: Rng + CryptoRng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

/// Prefixes of `name` used as username fragments.
///
/// A name of exactly three letters is its own fragment; longer names yield
/// every proper prefix of at least three letters; shorter names yield none.
pub fn fragments(name: &str) -> Vec<String> {
    let letters: Vec<char> = name.chars().collect();
    match letters.len() {
        n if n < MIN_FRAGMENT_LEN => Vec::new(),
        n if n == MIN_FRAGMENT_LEN => vec![name.to_string()],
        n => (MIN_FRAGMENT_LEN..n)
            .map(|len| letters[..len].iter().collect())
            .collect(),
    }
}

/// Username candidates for a name pair.
///
/// For every first-name fragment and every last-name fragment both orderings
/// are emitted, `first+last` before `last+first`. RU candidates are
/// transliterated and stripped of apostrophes. Duplicates keep their first
/// position.
pub fn generate_usernames(
    first_name: &str,
    last_name: &str,
    locale: Locale,
) -> Result<Vec<String>> {
    let first_fragments = fragments(first_name);
    let last_fragments = fragments(last_name);

    let mut usernames: Vec<String> = Vec::new();
    for first in &first_fragments {
        for last in &last_fragments {
            for candidate in [format!("{first}{last}"), format!("{last}{first}")] {
                let candidate = if locale.requires_transliteration() {
                    translit::to_latin(&candidate).replace('\'', "")
                } else {
                    candidate
                };
                if !usernames.contains(&candidate) {
                    usernames.push(candidate);
                }
            }
        }
    }

    if usernames.is_empty() {
        return Err(PersonaError::InsufficientNameLength {
            first: first_name.to_string(),
            last: last_name.to_string(),
        });
    }
    Ok(usernames)
}
