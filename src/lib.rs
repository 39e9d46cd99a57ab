//! # Covertly - hide a message inside an ordinary file
//!
//! Covertly embeds a short UTF-8 message, optionally gated by a password, into
//! a carrier file so the file still looks, sounds and opens the same.
//!
//! ## Carriers
//!
//! | Kind  | Extensions          | Channel                                      |
//! |-------|---------------------|----------------------------------------------|
//! | Image | png, jpg, jpeg      | LSB of R, G, B per pixel (output is PNG)     |
//! | Text  | txt                 | zero-width U+200B / U+200D suffix            |
//! | Audio | wav, mp3            | LSB of each PCM sample (output is WAV)       |
//! | Video | mp4, avi, mov       | LSB of the blue channel per pixel per frame  |
//! | PDF   | pdf                 | `/Message` in the document info dictionary   |
//! | DOCX  | docx                | hidden (`w:vanish`) run in a tagged paragraph|
//!
//! The password is a plain tag compared on decode, not an encryption key.
//!
//! ## Example Usage
//!
//! ```rust
//! use covertly::{CarrierKind, Engine, Extraction};
//!
//! let engine = Engine::new();
//! let carrier = b"Shopping list: eggs, milk, bread.";
//!
//! let encoded = engine.encode(carrier, CarrierKind::Text, "the eagle lands", "owl").unwrap();
//! assert!(encoded.starts_with(carrier));
//!
//! let decoded = engine.decode(&encoded, CarrierKind::Text, "owl").unwrap();
//! assert_eq!(decoded, Extraction::Message("the eagle lands".to_string()));
//!
//! let wrong = engine.decode(&encoded, CarrierKind::Text, "cat").unwrap();
//! assert_eq!(wrong, Extraction::WrongPassword);
//! ```
//!
//! ## Modules
//!
//! - [`payload`]: frame serialization and password verification
//! - [`stego`]: per-carrier adapters and the [`stego::BitChannel`] trait
//! - [`normalize`]: conversion of uploads to canonical carriers
//! - [`engine`]: the [`Engine`] tying it together
//! - [`config`]: TOML configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod kind;
pub mod normalize;
pub mod payload;
pub mod stego;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use engine::{CarrierInfo, Engine, EngineBuilder, Extraction};
pub use error::{Failure, StegoError};
pub use kind::CarrierKind;
pub use normalize::{AudioTranscoder, DefaultNormalizer, NormalizedCarrier, Normalizer};
pub use payload::{NOT_FOUND_SENTINEL, WRONG_PASSWORD_SENTINEL};
pub use stego::video::OverflowPolicy;
pub use stego::{BitChannel, CancelToken, Framing, RawVideoCodec, VideoCodec};
