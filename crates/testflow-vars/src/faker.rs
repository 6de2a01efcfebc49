//! Deterministic Faker provider backing the `faker.<namespace>.<method>`
//! interpolation directive. Seeded per run so suites with no live HTTP calls
//! and pure expressions reproduce the same values across runs.

use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use fake::Fake;
use parking_lot::Mutex;

use crate::error::VarsError;

/// Produces values for the Faker directive. `seed` fixes the sequence so a
/// suite with no live HTTP calls is reproducible run-to-run.
pub struct FakerProvider {
    rng: Mutex<StdRng>,
}

impl FakerProvider {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seed from the current time, used when the config doesn't pin one.
    pub fn time_seeded() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::seeded(seed)
    }

    /// `namespace` and `method` come from `faker.<namespace>.<method>`;
    /// `arg` is the optional integer argument for methods like
    /// `string.alphanumeric(12)`.
    pub fn generate(&self, namespace: &str, method: &str, arg: Option<usize>) -> Result<String, VarsError> {
        let mut rng = self.rng.lock();
        let value = match (namespace, method) {
            ("person", "firstName") => FirstName().fake_with_rng(&mut *rng),
            ("person", "lastName") => LastName().fake_with_rng(&mut *rng),
            ("person", "fullName") => Name().fake_with_rng(&mut *rng),
            ("internet", "email") => SafeEmail().fake_with_rng(&mut *rng),
            ("phone", "number") => PhoneNumber().fake_with_rng(&mut *rng),
            ("company", "name") => CompanyName().fake_with_rng(&mut *rng),
            ("location", "city") => fake::faker::address::en::CityName().fake_with_rng(&mut *rng),
            ("string", "uuid") => {
                let bytes: [u8; 16] = rng.gen();
                uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
            }
            ("string", "alphanumeric") => {
                let n = arg.unwrap_or(16);
                (&mut *rng)
                    .sample_iter(&Alphanumeric)
                    .take(n)
                    .map(char::from)
                    .collect()
            }
            _ => return Err(VarsError::UnknownFaker(format!("{namespace}.{method}"))),
        };
        Ok(value)
    }
}
