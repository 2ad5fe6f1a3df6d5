use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Decimal math helpers (pure Decimal, no f64)
// ---------------------------------------------------------------------------

/// Taylor series exp(x) with range reduction for |x| > 2.
///
/// Uses exp(x) = exp(x/2^k)^(2^k) to bring the argument into a range where
/// the series converges quickly, then squares the result k times. Returns
/// `None` when the result does not fit in a Decimal (x above roughly 66).
pub fn exp_decimal(x: Decimal) -> Option<Decimal> {
    let two = Decimal::from(2);

    let mut k: u32 = 0;
    let mut reduced = x;
    while reduced.abs() > two {
        reduced /= two;
        k += 1;
    }

    // exp(reduced) = sum_{n=0}^{25} reduced^n / n!
    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1..=25u64 {
        term *= reduced / Decimal::from(n);
        sum += term;
    }

    for _ in 0..k {
        sum = sum.checked_mul(sum)?;
    }

    Some(sum)
}

/// Integer power by repeated squaring. Returns `None` on overflow.
pub fn pow_decimal(base: Decimal, exp: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = result.checked_mul(b)?;
        }
        e >>= 1;
        if e > 0 {
            b = b.checked_mul(b)?;
        }
    }
    Some(result)
}

/// Binomial coefficient C(n, k) as a Decimal.
pub fn binomial_coefficient(n: u32, k: u32) -> Decimal {
    if k > n {
        return Decimal::ZERO;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for j in 0..k {
        // exact at every step: acc * (n - j) is divisible by (j + 1)
        acc = acc * (n - j) as u128 / (j + 1) as u128;
    }
    Decimal::from(acc as u64)
}
