//! Low-stock rule.

/// A product is low on stock when its current stock is at or below its threshold.
///
/// Literal `<=`: a product with no stock and a zero threshold counts as low.
pub fn is_low_stock(current_stock: i64, low_stock_threshold: i64) -> bool {
    current_stock <= low_stock_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundary_is_inclusive() {
        assert!(is_low_stock(5, 5));
        assert!(!is_low_stock(6, 5));
    }

    #[test]
    fn empty_product_with_zero_threshold_is_low() {
        assert!(is_low_stock(0, 0));
    }
}
