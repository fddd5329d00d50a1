use crate::config::PortRange;
use crate::error::{AppError, Result};

/// Matches `^\w+$` (ASCII word characters).
pub fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_name(name: &str) -> Result<()> {
    if !is_token(name) {
        return Err(AppError::invalid_input(format!("Invalid name '{name}'")));
    }
    Ok(())
}

pub fn validate_user(user: &str) -> Result<()> {
    if !is_token(user) {
        return Err(AppError::invalid_input("Invalid user").with("user", user));
    }
    Ok(())
}

/// An empty filter is valid and matches every instance.
pub fn validate_filter(filter: &str) -> Result<()> {
    if !filter.is_empty() && !is_token(filter) {
        return Err(AppError::invalid_input("Invalid filter").with("filter", filter));
    }
    Ok(())
}

/// Port given as text by a caller.
pub fn parse_port(value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(AppError::invalid_input("Invalid port").with("port", value)),
    }
}

pub fn validate_port(port: u16, range: PortRange) -> Result<()> {
    if !range.contains(port) {
        return Err(AppError::invalid_input("Invalid port")
            .with("port", port.to_string())
            .with("range", range.to_string()));
    }
    Ok(())
}

/// Host and password end up as `key=value` lines in the install file.
fn is_inf_safe(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c.is_control())
}

pub fn validate_host(host: &str) -> Result<()> {
    if !is_inf_safe(host) {
        return Err(AppError::invalid_input("Invalid host").with("host", host));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if !is_inf_safe(password) {
        return Err(AppError::invalid_input("Invalid password"));
    }
    Ok(())
}

pub fn validate_base_dn(base_dn: &str) -> Result<()> {
    if !is_valid_dn(base_dn) {
        return Err(AppError::invalid_input("Invalid base_dn parameter").with("base_dn", base_dn));
    }
    Ok(())
}

/// Structural check of an RFC 4514 distinguished name.
pub fn is_valid_dn(dn: &str) -> bool {
    if dn.trim().is_empty() || dn.chars().any(char::is_control) {
        return false;
    }
    let Some(rdns) = split_unescaped(dn, ',') else {
        return false;
    };
    rdns.iter().all(|rdn| {
        split_unescaped(rdn, '+').is_some_and(|avas| avas.iter().all(|ava| is_valid_ava(ava)))
    })
}

/// Split on `sep` where it is not preceded by a backslash escape.
/// Returns `None` for a dangling trailing backslash.
fn split_unescaped(value: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&value[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    if escaped {
        return None;
    }
    parts.push(&value[start..]);
    Some(parts)
}

fn is_valid_ava(ava: &str) -> bool {
    let Some((attr, value)) = ava.split_once('=') else {
        return false;
    };
    is_attribute_type(attr.trim()) && is_attribute_value(value.trim())
}

fn is_attribute_type(attr: &str) -> bool {
    let mut chars = attr.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        Some(first) if first.is_ascii_digit() => attr
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())),
        _ => false,
    }
}

fn is_attribute_value(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return !hex.is_empty() && hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit());
    }

    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if is_escapable(next) => {}
                Some(hi) if hi.is_ascii_hexdigit() => {
                    if !chars.next().is_some_and(|lo| lo.is_ascii_hexdigit()) {
                        return false;
                    }
                }
                _ => return false,
            },
            '"' | '<' | '>' | ';' | '=' => return false,
            _ => {}
        }
    }
    true
}

fn is_escapable(c: char) -> bool {
    matches!(
        c,
        ' ' | '"' | '#' | '+' | ',' | ';' | '<' | '=' | '>' | '\\'
    )
}
