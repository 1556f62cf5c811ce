//! Parity interleaving: a transition-forcing device, not an error check.
//!
//! After every complete group of 8 bits transmitted on a channel, one parity
//! bit is appended — the XOR of the group, except an all-zero group forces
//! parity 1, guaranteeing at least one audio transition every nine symbols
//! so prolonged silence never looks indistinguishable from signal loss.
//! Partial trailing groups (fewer than 8 bits) get no parity bit.
//!
//! Decision: parity is never validated on receive (see DESIGN.md). The
//! checksum is the sole integrity gate; parity here exists purely to bound
//! how long a channel can stay silent.

/// The parity bit for one full 8-bit group.
fn parity_bit(group: &[u8]) -> u8 {
    debug_assert_eq!(group.len(), 8);
    if group.iter().all(|&b| b == 0) {
        1
    } else {
        group.iter().fold(0u8, |acc, &b| acc ^ b)
    }
}

/// Inserts a parity bit after every complete group of 8 bits.
pub fn add_parity_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() + bits.len() / 8 + 1);
    let mut cursor = 0;
    while cursor < bits.len() {
        let end = (cursor + 8).min(bits.len());
        let group = &bits[cursor..end];
        out.extend_from_slice(group);
        if group.len() == 8 {
            out.push(parity_bit(group));
        }
        cursor += 8;
    }
    out
}

/// The exact inverse of [`add_parity_bits`]: drops every 9th bit (1-indexed).
pub fn remove_parity_bits(bits: &[u8]) -> Vec<u8> {
    bits.iter()
        .enumerate()
        .filter(|(i, _)| (i + 1) % 9 != 0)
        .map(|(_, &b)| b)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn parity_round_trips_for_random_lengths() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for length in 0..200usize {
            let bits: Vec<u8> = (0..length).map(|_| rng.gen_range(0..=1)).collect();
            let round_tripped = remove_parity_bits(&add_parity_bits(&bits));
            assert_eq!(round_tripped, bits, "round trip failed at length {length}");
        }
    }

    #[test]
    fn all_zero_group_forces_a_one_bit() {
        let bits = [0u8; 8];
        let with_parity = add_parity_bits(&bits);
        assert_eq!(with_parity.len(), 9);
        assert_eq!(with_parity[8], 1);
    }

    #[test]
    fn partial_trailing_group_gets_no_parity() {
        let bits = [1u8, 0, 1];
        assert_eq!(add_parity_bits(&bits), vec![1, 0, 1]);
    }

    #[test]
    fn full_group_parity_is_xor() {
        let bits = [1u8, 1, 0, 0, 0, 0, 0, 0];
        let with_parity = add_parity_bits(&bits);
        assert_eq!(with_parity[8], 0); // two 1s XOR to 0
    }
}
