mod extractors;
mod jwt;
mod password;

pub use extractors::{bearer_token, AuthenticatedMember, MaybeAuthenticated};
pub use jwt::{token_fingerprint, AccessClaims, RefreshClaims, TokenError, TokenIssuer};
pub use password::{compute_password_hash, validate_credentials, verify_password_hash, AuthError};
