//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tracer",
    about = "Render the socket-read tracing payload for an instrumentation engine",
    after_help = "\
EXAMPLES:
    tracer --trigger-port 4444                      Print the payload to stdout
    tracer --trigger-port 4444 --output agent.js    Write the payload to a file"
)]
pub struct Args {
    /// Peer port whose traffic starts the execution trace
    #[arg(short = 'p', long, value_name = "PORT")]
    pub trigger_port: u16,

    /// Write the payload to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_and_output() {
        let args =
            Args::try_parse_from(["tracer", "--trigger-port", "4444", "-o", "agent.js"]).unwrap();
        assert_eq!(args.trigger_port, 4444);
        assert_eq!(args.output, Some(PathBuf::from("agent.js")));
        assert!(!args.quiet);
    }

    #[test]
    fn test_trigger_port_is_required() {
        assert!(Args::try_parse_from(["tracer"]).is_err());
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        assert!(Args::try_parse_from(["tracer", "--trigger-port", "70000"]).is_err());
    }
}
