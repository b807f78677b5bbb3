//! Request context: what the caller asks for, who they are, and the
//! canonical fingerprint derived from both.
//!
//! 1. **[`profile`]**: the read-only inputs [`GenerationRequest`],
//!    [`UserProfile`], versioned [`Preferences`] and [`MacroTargets`].
//!
//! 2. **[`normalize`]**: [`ContextNormalizer`] turns those inputs into an
//!    order-independent [`FingerprintInput`]. Also home of
//!    [`safety_constraints`], the one definition of the safety set.
//!
//! 3. **[`fingerprint`]**: [`FingerprintHasher`] maps a fingerprint to a
//!    stable [`CacheKey`].

pub mod fingerprint;
mod lenient;
pub mod normalize;
pub mod profile;

pub use fingerprint::{CacheKey, FingerprintHasher, FingerprintInput};
pub use normalize::{ContextNormalizer, safety_constraints};
pub use profile::{
    CookingPreferences, DietaryPreferences, GenerationRequest, KitchenPreferences, MacroTargets,
    Preferences, UserProfile,
};
