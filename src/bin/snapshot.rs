//! Headless Snapshot Tool
//!
//! Reconstructs a line-oriented screen snapshot from a captured raw byte
//! stream, without spawning anything. Useful for inspecting session
//! captures offline and for debugging the reconstruction itself.
//!
//! # Usage
//!
//! ```bash
//! # Reconstruct a capture from stdin
//! cat capture.bin | pilotfish-snapshot
//!
//! # Reconstruct from a file, emit JSON
//! pilotfish-snapshot --input capture.bin --json
//! ```

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use pilotfish::reconstruct;

/// Command-line arguments
#[derive(Default)]
struct Args {
    /// Input file (stdin if not specified)
    input: Option<PathBuf>,
    /// Output file (stdout if not specified)
    output: Option<PathBuf>,
    /// Output as JSON instead of plain text
    json: bool,
    /// Show help
    help: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" => {
                args.help = true;
            }
            "-i" | "--input" => {
                i += 1;
                if i < argv.len() {
                    args.input = Some(PathBuf::from(&argv[i]));
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i < argv.len() {
                    args.output = Some(PathBuf::from(&argv[i]));
                }
            }
            "-j" | "--json" => {
                args.json = true;
            }
            _ => {}
        }
        i += 1;
    }

    args
}

fn print_help() {
    eprintln!(
        r#"pilotfish-snapshot - Reconstruct a screen snapshot from captured output

USAGE:
    pilotfish-snapshot [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -i, --input <FILE>      Input file (stdin if not specified)
    -o, --output <FILE>     Output file (stdout if not specified)
    -j, --json              Output as JSON instead of plain text

EXAMPLES:
    # Reconstruct a capture from stdin
    cat capture.bin | pilotfish-snapshot

    # Reconstruct from a file, emit JSON
    pilotfish-snapshot -i capture.bin -j
"#
    );
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args();

    if args.help {
        print_help();
        return Ok(());
    }

    // Read input
    let input_data = if let Some(path) = &args.input {
        std::fs::read(path)?
    } else {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        data
    };

    // Reconstruct the screen
    let snapshot = reconstruct(&String::from_utf8_lossy(&input_data));

    let output_data = if args.json {
        snapshot.to_json().map_err(io::Error::other)?
    } else {
        snapshot.to_text()
    };

    if let Some(path) = &args.output {
        let mut file = File::create(path)?;
        file.write_all(output_data.as_bytes())?;
        file.write_all(b"\n")?;
    } else {
        let mut stdout = io::stdout();
        stdout.write_all(output_data.as_bytes())?;
        stdout.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pilotfish::reconstruct;

    #[test]
    fn test_reconstruct_basic_capture() {
        let snapshot = reconstruct("\x1b[2J\x1b[HHello, World!\r\n");
        assert!(snapshot.contains("Hello, World!"));
    }

    #[test]
    fn test_reconstruct_json_output() {
        let snapshot = reconstruct("line one\nline two");
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("line one"));
        assert!(json.contains("line two"));
    }
}
