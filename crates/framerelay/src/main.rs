mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "framerelay", version, about = "Serve live frames to a polling core")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "framerelay",
            "serve",
            "--port",
            "7000",
            "--pattern",
            "--fps",
            "15",
            "--orientation",
            "flip-vertical",
        ])
        .expect("serve args should parse");

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 7000);
        assert_eq!(args.fps, 15.0);
        assert!(args.pattern);
        assert!(matches!(args.orientation, cmd::OrientationArg::FlipVertical));
        assert!(matches!(args.encoding, cmd::EncodingArg::Jpeg));
        assert_eq!(args.jpeg_quality, framerelay_relay::DEFAULT_JPEG_QUALITY);
    }

    #[test]
    fn serve_requires_a_source() {
        let err = Cli::try_parse_from(["framerelay", "serve", "--port", "7000"])
            .expect_err("missing source should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_conflicting_sources() {
        let err = Cli::try_parse_from([
            "framerelay",
            "serve",
            "--port",
            "7000",
            "--pattern",
            "--source",
            "frames.raw",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_repeated_settings() {
        let cli = Cli::try_parse_from([
            "framerelay",
            "--format",
            "json",
            "poll",
            "--bind",
            "127.0.0.1:0",
            "--set",
            "fps=30",
            "--set",
            "mode=auto:3",
            "--count",
            "2",
        ])
        .expect("poll args should parse");

        let Command::Poll(args) = cli.command else {
            panic!("expected poll");
        };
        assert_eq!(args.settings, vec!["fps=30", "mode=auto:3"]);
        assert_eq!(args.count, Some(2));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
