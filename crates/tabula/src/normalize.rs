//! Normalization of raw schema representations.
//!
//! - `desired`: entity model -> [`DesiredSchema`](crate::DesiredSchema)
//! - `actual`: `DESC <table>` rows -> [`ActualSchema`](crate::ActualSchema)

mod actual;
mod desired;
