use base64::{STANDARD, decode_config};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyDecodeError {
    #[error("key of length {0} cannot be base64 (length % 4 == 1)")]
    InvalidLength(usize),
    #[error("key is not valid base64: {0}")]
    InvalidEncoding(String),
}

/// Decodes an unpadded URL-safe base64 key (as served for VAPID) into raw bytes.
pub fn url_base64_to_bytes(input: &str) -> Result<Vec<u8>, KeyDecodeError> {
    let trimmed = input.trim();
    let padding = (4 - trimmed.len() % 4) % 4;
    if padding == 3 {
        return Err(KeyDecodeError::InvalidLength(trimmed.len()));
    }

    let mut standard = String::with_capacity(trimmed.len() + padding);
    standard.extend(trimmed.chars().map(|ch| match ch {
        '-' => '+',
        '_' => '/',
        other => other,
    }));
    standard.extend(std::iter::repeat_n('=', padding));

    decode_config(&standard, STANDARD).map_err(|err| KeyDecodeError::InvalidEncoding(err.to_string()))
}
