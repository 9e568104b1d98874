//! Fallback ranking used when the index has no opinion.
//!
//! Every candidate gets a fixed weighted score:
//!
//! ```text
//! 0.35 * text + 0.20 * rating/5 + 0.15 * ln(units_sold + 1)
//!   + 0.10 * discount + 0.10 * 1/price + 0.10 * in_stock
//! ```
//!
//! Lexical relevance is not scored here, so `text` is a constant baseline.
//! Equal scores are ordered by product id, ascending.

use std::cmp::Ordering;
use store::Product;

const TEXT_WEIGHT: f64 = 0.35;
const RATING_WEIGHT: f64 = 0.20;
const POPULARITY_WEIGHT: f64 = 0.15;
const DISCOUNT_WEIGHT: f64 = 0.10;
const PRICE_WEIGHT: f64 = 0.10;
const STOCK_WEIGHT: f64 = 0.10;

/// A product and its fallback score, alive for one ranking pass.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub product: Product,
    pub score: f64,
}

/// Weighted fallback score of a single product.
pub fn score(product: &Product) -> f64 {
    let text_score = 1.0;
    let rating_score = product.rating / 5.0;
    let popularity_score = (product.units_sold.max(0) as f64 + 1.0).ln();
    let discount_score = if product.mrp > 0.0 {
        (product.mrp - product.price) / product.mrp
    } else {
        0.0
    };
    let price_score = if product.price > 0.0 { 1.0 / product.price } else { 0.0 };
    let stock_score = if product.stock > 0 { 1.0 } else { 0.0 };

    TEXT_WEIGHT * text_score
        + RATING_WEIGHT * rating_score
        + POPULARITY_WEIGHT * popularity_score
        + DISCOUNT_WEIGHT * discount_score
        + PRICE_WEIGHT * price_score
        + STOCK_WEIGHT * stock_score
}

fn by_score_then_id(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.product.id.cmp(&b.product.id))
}

/// Score candidates and sort them best first.
pub fn score_candidates(candidates: Vec<Product>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|product| ScoredCandidate { score: score(&product), product })
        .collect();
    scored.sort_by(by_score_then_id);
    scored
}

/// Order `candidates` by fallback score. `_query` is accepted for parity with
/// the index path; the fallback formula does not look at it.
pub fn rank(candidates: Vec<Product>, _query: &str) -> Vec<Product> {
    score_candidates(candidates)
        .into_iter()
        .map(|candidate| candidate.product)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, price: f64, mrp: f64, rating: f64, units_sold: i64, stock: i64) -> Product {
        Product {
            id,
            title: format!("product {}", id),
            description: String::new(),
            price,
            mrp,
            stock,
            rating,
            total_reviews: 0,
            units_sold,
            return_rate: 0.0,
            currency: "Rupee".into(),
            created_at: 0,
            metadata: None,
        }
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_score_formula() {
        let p = product(1, 50.0, 100.0, 4.0, 99, 3);
        let expected = 0.35
            + 0.20 * 0.8
            + 0.15 * (100.0f64).ln()
            + 0.10 * 0.5
            + 0.10 * (1.0 / 50.0)
            + 0.10;
        assert!((score(&p) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_price_and_mrp_contribute_nothing() {
        let free = product(1, 0.0, 0.0, 0.0, 0, 0);
        assert!((score(&free) - 0.35).abs() < 1e-12);

        let no_mrp = product(2, 10.0, 0.0, 0.0, 0, 0);
        assert!((score(&no_mrp) - (0.35 + 0.10 * 0.1)).abs() < 1e-12);

        let ranked = rank(vec![free, no_mrp], "anything");
        assert_eq!(ids(&ranked), vec![2, 1]);
        assert!(ranked.iter().all(|p| score(p).is_finite()));
    }

    #[test]
    fn test_higher_score_comes_first() {
        let candidates = vec![
            product(1, 1000.0, 1000.0, 1.0, 0, 0),
            product(2, 1000.0, 2000.0, 5.0, 5000, 10),
            product(3, 1000.0, 1200.0, 3.0, 50, 1),
        ];
        let scored = score_candidates(candidates);
        assert_eq!(scored.iter().map(|c| c.product.id).collect::<Vec<_>>(), vec![2, 3, 1]);
        for pair in scored.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ties_break_by_id() {
        let candidates = vec![
            product(9, 100.0, 100.0, 4.0, 10, 1),
            product(3, 100.0, 100.0, 4.0, 10, 1),
            product(5, 100.0, 100.0, 4.0, 10, 1),
        ];
        assert_eq!(ids(&rank(candidates, "")), vec![3, 5, 9]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let candidates = vec![
            product(4, 250.0, 300.0, 4.5, 120, 0),
            product(1, 99.0, 199.0, 3.9, 10, 5),
            product(7, 0.0, 0.0, 5.0, 1_000_000, 1),
            product(2, 99.0, 199.0, 3.9, 10, 5),
        ];
        let first = rank(candidates.clone(), "phone");
        let second = rank(first.clone(), "phone");
        assert_eq!(ids(&first), ids(&second));

        let mut reversed = candidates;
        reversed.reverse();
        assert_eq!(ids(&rank(reversed, "phone")), ids(&first));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(rank(vec![], "phone").is_empty());
    }
}
