//! SkillPort: coding-practice tracking.
//!
//! Two halves share this crate:
//! - `tracker`: page watchers that detect solved problems on coding sites and
//!   relay them to the backend
//! - `routes` / `db` / `ingest`: the backend that validates, stores and
//!   aggregates submission records

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod response;
pub mod routes;
pub mod slug;
pub mod state;
pub mod tracker;
