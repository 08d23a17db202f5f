mod search;
mod sort;

pub use search::{search_url, ProductPreview, ProductSearch, SearchPage};
pub use sort::SearchSort;
