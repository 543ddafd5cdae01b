pub mod builtin;

pub use builtin::{EncryptedSecret, VaultCrypto};
