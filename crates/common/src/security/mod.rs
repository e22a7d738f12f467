//! Security primitives: secrets that zeroize on drop and salted password
//! hashing.

pub mod password;
pub mod secure_string;

pub use password::PasswordHasher;
pub use secure_string::SecureString;
