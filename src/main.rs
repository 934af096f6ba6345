use std::io;
use std::io::Write as _;
use std::net;
use std::process;
use std::str::FromStr as _;
use std::sync::Arc;

use anyhow::Context as _;

use depot_node::logger;
use depot_node::service;
use depot_node::service::inventory::Inventory;
use depot_node::service::message;
use depot_node::service::Depot;
use depot_node::signals;

pub const ENV_LOG: &str = "DEPOT_LOG";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
enum UsageError {
    #[error("usage: depot <name> [<good> <qty>]...")]
    Usage,
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),
}

impl UsageError {
    fn code(&self) -> i32 {
        match self {
            Self::Usage => 1,
            Self::InvalidName(_) => 2,
            Self::InvalidQuantity(_) => 3,
        }
    }
}

impl From<lexopt::Error> for UsageError {
    fn from(_: lexopt::Error) -> Self {
        Self::Usage
    }
}

/// Validated command line: the node name plus seeded goods.
#[derive(Debug, PartialEq, Eq)]
struct Options {
    name: String,
    goods: Vec<(String, i64)>,
}

impl Options {
    fn from_env() -> Result<Self, UsageError> {
        Self::from_parser(lexopt::Parser::from_env())
    }

    fn from_parser(mut parser: lexopt::Parser) -> Result<Self, UsageError> {
        // Every token is positional. Raw access keeps dash-leading tokens
        // (a would-be negative quantity) in the normal validation path.
        let args: Vec<String> = parser
            .raw_args()?
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        let mut args = args.into_iter();
        let name = match args.next() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(UsageError::Usage),
        };
        if !message::is_valid_name(&name) {
            return Err(UsageError::InvalidName(name));
        }

        let rest: Vec<String> = args.collect();
        if rest.len() % 2 != 0 {
            return Err(UsageError::Usage);
        }

        let mut goods = Vec::new();
        for pair in rest.chunks(2) {
            let (good, qty) = (&pair[0], &pair[1]);

            if !message::is_valid_name(good) {
                return Err(UsageError::InvalidName(good.clone()));
            }
            goods.push((good.clone(), parse_seed(qty)?));
        }

        Ok(Self { name, goods })
    }
}

/// Seed quantities may be zero, unlike quantities on the wire, and must
/// fit a signed 32-bit integer.
fn parse_seed(s: &str) -> Result<i64, UsageError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UsageError::InvalidQuantity(s.to_owned()));
    }
    s.parse::<i32>()
        .map(i64::from)
        .map_err(|_| UsageError::InvalidQuantity(s.to_owned()))
}

fn execute(options: Options) -> anyhow::Result<()> {
    signals::ignore_sigpipe();

    let listener = net::TcpListener::bind((net::Ipv4Addr::UNSPECIFIED, 0))
        .context("failed to bind listening socket")?;
    let port = listener
        .local_addr()
        .context("failed to read listening address")?
        .port();

    let depot = Arc::new(Depot::new(
        options.name,
        port,
        Inventory::from_iter(options.goods),
    ));
    signals::watch(depot.clone()).context("failed to install signal watcher")?;

    // The one and only startup line. Stdout may be a pipe, so flush.
    println!("{port}");
    io::stdout().flush().ok();

    service::listen(depot, listener);

    Ok(())
}

fn main() {
    if let Ok(level) = std::env::var(ENV_LOG) {
        let level = log::Level::from_str(&level).unwrap_or(log::Level::Debug);
        logger::init(level).ok();
    }

    let options = match Options::from_env() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            process::exit(err.code());
        }
    };

    if let Err(err) = execute(options) {
        eprintln!("error: depot: {err}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, UsageError> {
        Options::from_parser(lexopt::Parser::from_args(args.iter().copied()))
    }

    #[test]
    fn test_name_and_seeds() {
        assert_eq!(
            parse(&["alpha", "milk", "5", "bread", "0"]),
            Ok(Options {
                name: "alpha".to_owned(),
                goods: vec![("milk".to_owned(), 5), ("bread".to_owned(), 0)],
            })
        );
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(parse(&[]), Err(UsageError::Usage));
        assert_eq!(parse(&[""]), Err(UsageError::Usage));
        assert_eq!(parse(&["alpha", "milk"]), Err(UsageError::Usage));
        assert_eq!(parse(&[]).unwrap_err().code(), 1);
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            parse(&["al:pha"]),
            Err(UsageError::InvalidName("al:pha".to_owned()))
        );
        assert_eq!(
            parse(&["alpha", "mi lk", "5"]),
            Err(UsageError::InvalidName("mi lk".to_owned()))
        );
        assert_eq!(parse(&["al:pha"]).unwrap_err().code(), 2);
    }

    #[test]
    fn test_invalid_quantities() {
        for qty in ["x", "-1", "+1", "5x", "", "99999999999"] {
            assert_eq!(
                parse(&["alpha", "milk", qty]),
                Err(UsageError::InvalidQuantity(qty.to_owned())),
                "quantity {qty:?}"
            );
        }
        assert_eq!(parse(&["alpha", "milk", "x"]).unwrap_err().code(), 3);
    }
}
