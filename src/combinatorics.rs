/// Exact binomial coefficient `C(n, k)`.
///
/// Returns 0 when `k < 0` or `k > n`, which is what zeroes out propensities of
/// reactions whose reactants are understocked. The product is accumulated as
/// `C(n-k+i, i)` for `i = 1..=k` so every intermediate value is itself an exact
/// binomial coefficient. Results that do not fit in a `u128` saturate at `u128::MAX`.
pub fn choose(n: i64, k: i64) -> u128 {
    if k < 0 || k > n {
        return 0;
    }
    if k == 0 || k == n {
        return 1;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut out: u128 = 1;
    for i in 1..=k {
        // out * (n-k+i) is divisible by i; cancel the common factor first
        let g = gcd(out, i);
        let factor = (n - k + i) / (i / g);
        out = match (out / g).checked_mul(factor) {
            Some(next) => next,
            None => return u128::MAX,
        };
    }
    out
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factorial(n: u128) -> u128 {
        (1..=n).product()
    }

    #[test]
    fn matches_factorial_reference() {
        for n in 0..=30i64 {
            for k in 0..=n {
                let expected =
                    factorial(n as u128) / (factorial(k as u128) * factorial((n - k) as u128));
                assert_eq!(choose(n, k), expected, "C({n}, {k})");
            }
        }
    }

    #[test]
    fn out_of_range_is_zero() {
        assert_eq!(choose(3, 4), 0);
        assert_eq!(choose(0, 1), 0);
        assert_eq!(choose(5, -1), 0);
        assert_eq!(choose(-2, 1), 0);
    }

    #[test]
    fn large_counts_stay_exact() {
        assert_eq!(choose(50_000, 2), 1_249_975_000);
        assert_eq!(choose(50_000, 3), 20_832_083_350_000);
        assert_eq!(choose(8192, 8190), choose(8192, 2));
    }

    #[test]
    fn fits_even_when_the_naive_product_would_not() {
        assert_eq!(choose(130, 65), 95_067_625_827_960_698_145_584_333_020_095_113_100);
        assert_eq!(choose(130, 65), choose(129, 64) + choose(129, 65));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        assert_eq!(choose(1_000_000, 500_000), u128::MAX);
    }
}
