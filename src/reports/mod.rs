//! Report Writers (C9): transform merged page records, link edges,
//! existence records, and expected rows into the final report set.

pub mod catalog;
pub mod comparison;
pub mod csv_util;
pub mod existence;
pub mod extras;
pub mod links;
pub mod tree;

pub use catalog::{write_duplicate_titles, write_site_catalog};
pub use comparison::write_comparison;
pub use existence::write_existence;
pub use extras::{ExtrasKey, write_extras};
pub use links::write_internal_links;
pub use tree::write_tree;
