use chatmark::{RenderConfig, Renderer};
use serde::Serialize;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Chatmark(chatmark::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Chatmark(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<chatmark::Error> for CliError {
    fn from(value: chatmark::Error) -> Self {
        Self::Chatmark(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Detect,
    Tree,
    Policy,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    configs: Vec<String>,
    pretty: bool,
    verbose: bool,
}

fn usage() -> &'static str {
    "chatmark-cli\n\
\n\
USAGE:\n\
  chatmark-cli [render] [--config <json-file>] [--verbose] [<path>|-]\n\
  chatmark-cli detect [--config <json-file>] [--verbose] [<path>|-]\n\
  chatmark-cli tree [--pretty] [--config <json-file>] [--verbose] [<path>|-]\n\
  chatmark-cli policy [--pretty] [--config <json-file>]\n\
\n\
NOTES:\n\
  - --config may be repeated; later files are layered over earlier ones.\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - render prints the sanitized HTML fragment (or the escaped text when no markup is detected).\n\
  - detect prints the first matching detector rule id, or 'none'.\n\
  - tree prints the rendered output as JSON: {\"kind\": \"empty\"|\"literal\"|\"structured\", ...}.\n\
  - policy prints the effective sanitization allowlist as JSON.\n\
  - Logging goes to stderr; RUST_LOG overrides the default filter (warn, or debug with --verbose).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "detect" => args.command = Command::Detect,
            "tree" => args.command = Command::Tree,
            "policy" => args.command = Command::Policy,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.configs.push(path.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(paths: &[String]) -> Result<RenderConfig, CliError> {
    let mut config = RenderConfig::default();
    for path in paths {
        config.overlay(&RenderConfig::from_json_str(&std::fs::read_to_string(path)?)?);
    }
    Ok(config)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args.configs)?;
    let renderer = Renderer::from_config(&config)?;

    match args.command {
        Command::Policy => write_json(renderer.policy(), args.pretty),
        Command::Detect => {
            let text = read_input(args.input.as_deref())?;
            let rule = renderer.detectors().matching_rule(&text);
            println!("{}", rule.unwrap_or("none"));
            Ok(())
        }
        Command::Tree => {
            let text = read_input(args.input.as_deref())?;
            write_json(&renderer.render(&text), args.pretty)
        }
        Command::Render => {
            let text = read_input(args.input.as_deref())?;
            println!("{}", renderer.render(&text).to_html());
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("chatmark-cli")
            .chain(items.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_to_render_from_stdin() {
        let args = parse_args(&argv(&[])).unwrap();
        assert!(matches!(args.command, Command::Render));
        assert_eq!(args.input, None);
        assert!(!args.pretty && !args.verbose);
    }

    #[test]
    fn parses_commands_flags_and_paths() {
        let args = parse_args(&argv(&["tree", "--pretty", "--config", "c.json", "-v", "in.md"]))
            .unwrap();
        assert!(matches!(args.command, Command::Tree));
        assert!(args.pretty && args.verbose);
        assert_eq!(args.configs, vec!["c.json"]);

        let args = parse_args(&argv(&["--config", "a.json", "--config", "b.json"])).unwrap();
        assert_eq!(args.configs, vec!["a.json", "b.json"]);
        assert_eq!(args.input.as_deref(), Some("in.md"));

        let args = parse_args(&argv(&["detect", "--", "--odd-name.md"])).unwrap();
        assert_eq!(args.input.as_deref(), Some("--odd-name.md"));
    }

    #[test]
    fn rejects_unknown_flags_and_extra_paths() {
        for bad in [
            &["--nope"][..],
            &["a.md", "b.md"],
            &["--config"],
            &["-", "x.md"],
            &["--", "a", "b"],
        ] {
            assert!(
                matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))),
                "{bad:?}"
            );
        }
    }
}
