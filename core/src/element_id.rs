use rand::Rng;

pub const ELEMENT_ID_PREFIX: &str = "id_";
pub const ELEMENT_ID_LEN: usize = 64;
pub const ELEMENT_ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random identifier: [`ELEMENT_ID_PREFIX`] followed by `len` alphanumerics.
pub fn generate_element_id<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let alphabet = ELEMENT_ID_ALPHABET.as_bytes();
    let mut id = String::with_capacity(ELEMENT_ID_PREFIX.len() + len);
    id.push_str(ELEMENT_ID_PREFIX);
    for _ in 0..len {
        let idx = rng.random_range(0..alphabet.len());
        id.push(alphabet[idx] as char);
    }
    id
}

pub fn is_generated_element_id(value: &str, len: usize) -> bool {
    match value.strip_prefix(ELEMENT_ID_PREFIX) {
        Some(body) => body.len() == len && body.chars().all(|ch| ELEMENT_ID_ALPHABET.contains(ch)),
        None => false,
    }
}
