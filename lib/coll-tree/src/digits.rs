// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Positional base-k arithmetic for the k-nomial shapes.

/// `base^exp`.
pub(crate) fn ipow(base: usize, exp: usize) -> usize {
    base.pow(exp as u32)
}

/// Number of base-`k` digits needed to write `n` (0 for `n == 0`).
///
/// For `n = nranks - 1` this is `ceil(log_k(nranks))`, the depth of a
/// k-nomial tree over `nranks` ranks.
pub(crate) fn num_digits(k: usize, mut n: usize) -> usize {
    let mut digits = 0;
    while n > 0 {
        n /= k;
        digits += 1;
    }
    digits
}

/// Digit of `n` at position `pos` (0 = least significant).
pub(crate) fn get_digit(k: usize, n: usize, pos: usize) -> usize {
    (n / ipow(k, pos)) % k
}

/// `n` with the digit at position `pos` replaced by `value`.
pub(crate) fn set_digit(k: usize, n: usize, pos: usize, value: usize) -> usize {
    let place = ipow(k, pos);
    n - get_digit(k, n, pos) * place + value * place
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_digits() {
        assert_eq!(num_digits(2, 0), 0);
        assert_eq!(num_digits(2, 1), 1);
        assert_eq!(num_digits(2, 7), 3);
        assert_eq!(num_digits(2, 8), 4);
        assert_eq!(num_digits(3, 8), 2);
        assert_eq!(num_digits(3, 9), 3);
        assert_eq!(num_digits(10, 999), 3);
    }

    #[test]
    fn test_digits() {
        // 46 = 1*27 + 2*9 + 0*3 + 1
        assert_eq!(get_digit(3, 46, 0), 1);
        assert_eq!(get_digit(3, 46, 1), 0);
        assert_eq!(get_digit(3, 46, 2), 2);
        assert_eq!(get_digit(3, 46, 3), 1);
        assert_eq!(get_digit(3, 46, 4), 0);

        assert_eq!(set_digit(3, 46, 0, 0), 45);
        assert_eq!(set_digit(3, 46, 1, 2), 52);
        assert_eq!(set_digit(3, 46, 3, 0), 19);
        assert_eq!(set_digit(2, 5, 2, 0), 1);
    }
}
