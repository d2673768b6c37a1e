//! `key:value` token lines.
//!
//! Both the event header line and the payload of process state events are a
//! whitespace separated list of `key:value` tokens, e.g.
//! `processname:cat groupname:cat from_state:STARTING pid:2766`.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token {0:?} is not a key:value pair")]
    MissingSeparator(String),

    #[error("token {0:?} has an empty key")]
    EmptyKey(String),
}

/// Parse a token line into a map.
///
/// Values are split on the first `:` only, so `when:12:30` yields
/// `when -> 12:30`. A repeated key keeps its last value.
pub fn parse_tokens(line: &str) -> Result<HashMap<String, String>, TokenError> {
    let mut map = HashMap::new();
    for token in line.split_whitespace() {
        let (key, value) = token
            .split_once(':')
            .ok_or_else(|| TokenError::MissingSeparator(token.to_string()))?;
        if key.is_empty() {
            return Err(TokenError::EmptyKey(token.to_string()));
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}
