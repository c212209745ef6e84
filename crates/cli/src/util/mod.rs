use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub type CliResult<T> = anyhow::Result<T>;

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Parses hex digits, ignoring ASCII whitespace, `:` separators and an
/// optional `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let digits: Vec<u8> =
        body.bytes().filter(|b| !b.is_ascii_whitespace() && *b != b':').collect();
    if digits.len() % 2 != 0 {
        bail!("hex input has an odd number of digits ({})", digits.len());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).context("hex input is not ASCII")?;
            u8::from_str_radix(text, 16).with_context(|| format!("invalid hex byte '{text}'"))
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn parse_base64(input: &str) -> CliResult<Vec<u8>> {
    STANDARD.decode(input.trim()).context("invalid base64 input")
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
