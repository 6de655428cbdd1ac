//! Client-side progress synchronization: fetching related records from
//! sometimes-unavailable sources, deriving display views from them, scoring
//! arithmetic, and optimistic local mutations that roll back consistently on
//! remote failure.

pub mod books;
pub mod history;
pub mod optimistic;
pub mod progress;
pub mod results;
pub mod scoring;
pub mod view;
pub mod workbooks;
