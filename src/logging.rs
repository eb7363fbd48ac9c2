use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// The filter used when `RUST_LOG` is not set.
fn default_directive(level: &str, verbose: bool) -> String {
    if verbose { "debug".to_string() } else { level.to_string() }
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for command output.
pub fn init(level: &str, verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level, verbose)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("info", false, "info")]
    #[case("warn,mipmap_library=debug", false, "warn,mipmap_library=debug")]
    #[case("info", true, "debug")]
    fn test_default_directive(#[case] level: &str, #[case] verbose: bool, #[case] expected: &str) {
        assert_eq!(default_directive(level, verbose), expected);
    }
}
