//! Monomial expansion.
//!
//! A degree-`d` monomial is a multiset of `d` lagged variables. We enumerate
//! multisets as non-decreasing index sequences, which gives every monomial
//! exactly once, in degree-then-lexicographic order.

use crate::domain::Factor;

/// Number of monomials of degree `1..=degree` over `vars` variables.
///
/// Saturates instead of overflowing so callers can compare against caps.
pub fn monomial_count(vars: usize, degree: u32) -> u128 {
    let mut total: u128 = 0;
    for d in 1..=degree as u128 {
        // C(vars + d - 1, d)
        let mut c: u128 = 1;
        for i in 0..d {
            c = c.saturating_mul(vars as u128 + i) / (i + 1);
        }
        total = total.saturating_add(c);
    }
    total
}

/// All monomials of degree `1..=degree`, each as a folded factor list.
pub fn expand_monomials(vars: &[Factor], degree: u32) -> Vec<Vec<Factor>> {
    let mut out = Vec::new();
    if vars.is_empty() {
        return out;
    }
    for d in 1..=degree as usize {
        let mut idx = vec![0usize; d];
        loop {
            out.push(fold(vars, &idx));

            // Advance to the next non-decreasing sequence.
            let mut pos = d;
            while pos > 0 && idx[pos - 1] == vars.len() - 1 {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            let next = idx[pos - 1] + 1;
            for slot in idx.iter_mut().skip(pos - 1) {
                *slot = next;
            }
        }
    }
    out
}

fn fold(vars: &[Factor], idx: &[usize]) -> Vec<Factor> {
    let mut factors: Vec<Factor> = Vec::with_capacity(idx.len());
    for &i in idx {
        let v = vars[i];
        match factors.last_mut() {
            Some(last) if last.signal == v.signal && last.lag == v.lag => last.exponent += v.exponent,
            _ => factors.push(v),
        }
    }
    factors
}
