use crate::error::{FortuneError, Result};
use rand::Rng;

/// Splits a colon separated path list.
///
/// A colon preceded by a backslash stays in the token, backslash included.
/// Empty tokens stand for the current directory and come back as `"."`.
pub fn split_path_list(path_list: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    for (i, c) in path_list.char_indices() {
        if c == ':' && prev != Some('\\') {
            tokens.push(token_or_dot(&path_list[start..i]));
            start = i + 1;
        }
        prev = Some(c);
    }
    tokens.push(token_or_dot(&path_list[start..]));
    tokens
}

fn token_or_dot(token: &str) -> String {
    match token {
        "" => ".".to_string(),
        t => t.to_string(),
    }
}

/// Picks one entry of a colon separated path list uniformly at random.
pub fn choose_random_path<R: Rng + ?Sized>(path_list: &str, rng: &mut R) -> Result<String> {
    if path_list.is_empty() {
        return Err(FortuneError::EmptyInput);
    }
    let mut tokens = split_path_list(path_list);
    let i = rng.gen_range(0..tokens.len());
    Ok(tokens.swap_remove(i))
}
