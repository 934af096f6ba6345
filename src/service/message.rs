//! Wire messages exchanged between depots.
//!
//! Every message is a single line of colon-separated fields, with the verb in
//! the first field. Parsing is strict: a line whose shape or field contents
//! are off in any way yields `None` and is dropped by the caller. Peers are
//! never told about their mistakes.

use std::fmt;

/// Field separator within a protocol line.
pub const FIELD_SEPARATOR: char = ':';

/// A protocol message, decoded from or encoded to a single wire line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Identity handshake: the sender's listening port and node name.
    Im { port: u16, name: String },
    /// Directive to dial another depot on the loopback interface.
    Connect { port: u16 },
    /// Goods arriving into the local ledger.
    Deliver { qty: i64, good: String },
    /// Goods leaving the local ledger.
    Withdraw { qty: i64, good: String },
    /// Debit locally and deliver to a named neighbour.
    Transfer { qty: i64, good: String, dest: String },
    /// Record a command under `key` for later replay.
    Defer { key: u64, line: String },
    /// Replay all unexecuted commands recorded under `key`.
    Execute { key: u64 },
}

impl Message {
    /// Decode a single line. Returns `None` for anything malformed:
    /// unknown verb, wrong field count, invalid number or invalid name.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let args = &fields[1..];

        match fields[0] {
            "IM" => match args {
                [port, name] => Some(Self::Im {
                    port: parse_port(port)?,
                    name: parse_name(name)?,
                }),
                _ => None,
            },
            "Connect" => match args {
                [port] => Some(Self::Connect {
                    port: parse_port(port)?,
                }),
                _ => None,
            },
            "Deliver" => match args {
                [qty, good] => Some(Self::Deliver {
                    qty: parse_quantity(qty)?,
                    good: parse_name(good)?,
                }),
                _ => None,
            },
            "Withdraw" => match args {
                [qty, good] => Some(Self::Withdraw {
                    qty: parse_quantity(qty)?,
                    good: parse_name(good)?,
                }),
                _ => None,
            },
            "Transfer" => match args {
                [qty, good, dest] => Some(Self::Transfer {
                    qty: parse_quantity(qty)?,
                    good: parse_name(good)?,
                    dest: parse_name(dest)?,
                }),
                _ => None,
            },
            // The recorded command must have the shape `verb:a:b` or
            // `verb:a:b:c`. Its semantics are only checked at replay.
            "Defer" => match args {
                [key, inner @ ..] if (3..=4).contains(&inner.len()) => Some(Self::Defer {
                    key: parse_key(key)?,
                    line: inner.join(":"),
                }),
                _ => None,
            },
            "Execute" => match args {
                [key] => Some(Self::Execute {
                    key: parse_key(key)?,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    /// Encode as a wire line, newline-terminated.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Im { port, name } => write!(f, "IM:{port}:{name}"),
            Self::Connect { port } => write!(f, "Connect:{port}"),
            Self::Deliver { qty, good } => write!(f, "Deliver:{qty}:{good}"),
            Self::Withdraw { qty, good } => write!(f, "Withdraw:{qty}:{good}"),
            Self::Transfer { qty, good, dest } => write!(f, "Transfer:{qty}:{good}:{dest}"),
            Self::Defer { key, line } => write!(f, "Defer:{key}:{line}"),
            Self::Execute { key } => write!(f, "Execute:{key}"),
        }
    }
}

/// Check a node or good name: non-empty, and free of whitespace, line
/// terminators and the field separator.
pub fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && !s.contains([' ', '\n', '\r', FIELD_SEPARATOR])
}

fn parse_name(s: &str) -> Option<String> {
    is_valid_name(s).then(|| s.to_owned())
}

/// Decode a decimal field. The entire field must be digits: signs, spaces
/// and trailing garbage all disqualify it.
fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// A listening port: positive, fitting in 16 bits.
pub fn parse_port(s: &str) -> Option<u16> {
    match parse_decimal(s)? {
        0 => None,
        n => u16::try_from(n).ok(),
    }
}

/// A goods quantity: positive. Zero is rejected on the wire.
pub fn parse_quantity(s: &str) -> Option<i64> {
    match parse_decimal(s)? {
        0 => None,
        n => i64::try_from(n).ok(),
    }
}

/// A defer key: positive.
pub fn parse_key(s: &str) -> Option<u64> {
    match parse_decimal(s)? {
        0 => None,
        n => Some(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_parse_im() {
        assert_eq!(
            Message::parse("IM:9000:alpha"),
            Some(Message::Im {
                port: 9000,
                name: "alpha".to_owned()
            })
        );
        assert_eq!(Message::parse("IM:0:alpha"), None);
        assert_eq!(Message::parse("IM:65536:alpha"), None);
        assert_eq!(Message::parse("IM:9000:"), None);
        assert_eq!(Message::parse("IM:9000:al pha"), None);
        assert_eq!(Message::parse("IM:9000"), None);
        assert_eq!(Message::parse("IM:9000:alpha:extra"), None);
    }

    #[test]
    fn test_parse_ledger_verbs() {
        assert_eq!(
            Message::parse("Deliver:5:milk"),
            Some(Message::Deliver {
                qty: 5,
                good: "milk".to_owned()
            })
        );
        assert_eq!(
            Message::parse("Withdraw:3:coal"),
            Some(Message::Withdraw {
                qty: 3,
                good: "coal".to_owned()
            })
        );
        assert_eq!(
            Message::parse("Transfer:3:coal:beta"),
            Some(Message::Transfer {
                qty: 3,
                good: "coal".to_owned(),
                dest: "beta".to_owned()
            })
        );
        assert_eq!(Message::parse("Transfer:3:coal"), None);
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        assert_eq!(Message::parse("Deliver:abc:milk"), None);
        assert_eq!(Message::parse("Deliver:+5:milk"), None);
        assert_eq!(Message::parse("Deliver:-5:milk"), None);
        assert_eq!(Message::parse("Deliver:5x:milk"), None);
        assert_eq!(Message::parse("Deliver:0:milk"), None);
        assert_eq!(Message::parse("Deliver::milk"), None);
        assert_eq!(Message::parse("Deliver: 5:milk"), None);
        assert_eq!(Message::parse("Deliver:99999999999999999999:milk"), None);
    }

    #[test]
    fn test_parse_defer_shapes() {
        assert_eq!(
            Message::parse("Defer:42:Deliver:4:widget"),
            Some(Message::Defer {
                key: 42,
                line: "Deliver:4:widget".to_owned()
            })
        );
        assert_eq!(
            Message::parse("Defer:42:Transfer:4:widget:beta"),
            Some(Message::Defer {
                key: 42,
                line: "Transfer:4:widget:beta".to_owned()
            })
        );
        // Too short or too long an inner command.
        assert_eq!(Message::parse("Defer:42:Execute:7"), None);
        assert_eq!(Message::parse("Defer:42:Transfer:4:widget:beta:junk"), None);
        assert_eq!(Message::parse("Defer:0:Deliver:4:widget"), None);
    }

    #[test]
    fn test_parse_unknown_verbs() {
        assert_eq!(Message::parse("Garbage:1:2"), None);
        assert_eq!(Message::parse("deliver:5:milk"), None);
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse(":::"), None);
    }

    #[test]
    fn test_name_predicate() {
        assert!(is_valid_name("milk"));
        assert!(is_valid_name("Milk-2.0"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("a:b"));
        assert!(!is_valid_name("a\nb"));
        assert!(!is_valid_name("a\rb"));
    }

    #[quickcheck]
    fn prop_parse_never_panics(line: String) -> bool {
        Message::parse(&line);
        true
    }

    #[quickcheck]
    fn prop_encode_decode(qty: u32) -> bool {
        let msg = Message::Transfer {
            qty: qty.max(1) as i64,
            good: "coal".to_owned(),
            dest: "beta".to_owned(),
        };
        Message::parse(msg.to_line().trim_end()) == Some(msg)
    }
}
