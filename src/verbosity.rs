use num_traits::PrimInt;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    None,
    Some,
    Very,
}

impl<X> From<X> for Verbosity
where
    X: PrimInt,
{
    fn from(value: X) -> Self {
        if value < X::one() {
            Verbosity::None
        } else if value < X::one() + X::one() {
            Verbosity::Some
        } else {
            Verbosity::Very
        }
    }
}

impl Verbosity {
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::None => LevelFilter::WARN,
            Verbosity::Some => LevelFilter::INFO,
            Verbosity::Very => LevelFilter::DEBUG,
        }
    }

    /// Installs the diagnostic logger on stderr. `RUST_LOG`, when set,
    /// takes precedence over the `-v` count.
    pub fn init_logging(self) {
        let filter = EnvFilter::builder()
            .with_default_directive(self.level_filter().into())
            .from_env_lossy();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_map_to_levels() {
        assert_eq!(Verbosity::from(0u64), Verbosity::None);
        assert_eq!(Verbosity::from(1u64), Verbosity::Some);
        assert_eq!(Verbosity::from(2u64), Verbosity::Very);
        assert_eq!(Verbosity::from(7u8), Verbosity::Very);
        assert_eq!(Verbosity::Some.level_filter(), LevelFilter::INFO);
    }
}
