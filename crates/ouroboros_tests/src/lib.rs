//! Integration test crate for the Ouroboros front end.
//!
//! Everything interesting lives under `tests/`; this library exists so the
//! workspace member has a compilation target for `cargo test` to hang the
//! test binaries off.
