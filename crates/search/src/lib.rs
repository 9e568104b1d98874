//! Query understanding and ranking for the product catalog.
//
// raw query -> normalize -> extract_intent -> SearchGateway
//           -> (no ids) substring candidates -> rank

pub mod gateway;
pub mod intent;
pub mod normalize;
pub mod rank;

pub use gateway::{SearchGateway, DEFAULT_TIMEOUT};
pub use intent::{extract_intent, Intent, PRICE_ASC_KEYWORDS, PRICE_DESC_KEYWORDS};
pub use normalize::normalize;
pub use rank::{rank, score, score_candidates, ScoredCandidate};
