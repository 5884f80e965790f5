//! Stable client-side identity
//!
//! The player id is generated once per client run and reused on every
//! reconnect, which is what lets the server hand the same seat (and vote)
//! back to us.

use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of generated player ids
pub const ID_LEN: usize = 6;

/// Generates a random lowercase base-36 player id
pub fn random_player_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Display name used when the user did not pick one
pub fn default_name(player_id: &str) -> String {
    let prefix: String = player_id.chars().take(4).collect();
    format!("Player-{}", prefix)
}
