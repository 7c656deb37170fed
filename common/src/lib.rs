//! Types shared between the voter roll backend and its clients.
//!
//! - `model`: voter records and the per-row issues reported by the bulk import.
//! - `responses`: the JSON envelopes returned by the voter endpoints.

pub mod model;
pub mod responses;
