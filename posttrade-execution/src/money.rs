use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary or price value to the provided currency scale, half-even.
///
/// Banker's rounding is the house convention for every derived amount (block average price,
/// settlement cash amount), so replayed derivations are bit-identical.
pub fn round_to_scale(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
}

/// Notional cash amount `qty × price`, rounded half-even at the provided currency scale.
pub fn notional(qty: Decimal, price: Decimal, scale: u32) -> Decimal {
    round_to_scale(qty * price, scale)
}
