/// Sort order applied to Walmart search results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    /// Cheapest first.
    #[default]
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Relevance to the search query.
    BestMatch,
    /// Most purchased first.
    BestSeller,
    /// Highest rated first.
    HighestRating,
}

impl SearchSort {
    /// The `sort` query-parameter value the site expects.
    pub fn as_param(self) -> &'static str {
        match self {
            SearchSort::PriceAsc => "price_low",
            SearchSort::PriceDesc => "price_high",
            SearchSort::BestMatch => "best_match",
            SearchSort::BestSeller => "best_seller",
            SearchSort::HighestRating => "rating_high",
        }
    }
}
