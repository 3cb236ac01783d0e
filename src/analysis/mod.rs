//! Pure derivations over page snapshots: key decoding, version chains and
//! health classification. Nothing in here fails or holds state.

pub mod chains;
pub mod health;
pub mod keys;
