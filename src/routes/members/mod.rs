pub mod account;
pub mod info;
pub mod signup;

pub use account::*;
pub use info::*;
pub use signup::*;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Generates the random 10-character codes used both for email verification
/// and for temporary passwords.
pub(crate) fn generate_one_time_code() -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(10)
        .collect()
}
