//! mdcalc - Evaluate formulas in Markdown tables

mod config;

use anyhow::{Context, bail};
use std::env;
use std::io::Read;
use std::path::PathBuf;

use mdcalc_core::{CalcOptions, FormulaSyntax, apply_replacements, calculate};

fn print_usage() {
    eprintln!("Usage: mdcalc [OPTIONS] <FILE|->");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <FILE|->                  Markdown document to evaluate ('-' reads stdin)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i, --in-place            Write the updated document back to FILE");
    eprintln!("  --json                    Print replacement instructions as JSON");
    eprintln!("  --config <path>           Load options from TOML file");
    eprintln!("  --precision <n>           Fractional digits of numeric results (default: 4)");
    eprintln!("  --include-header          Count the header row as row 1 of each table");
    eprintln!("  --syntax <hash|brace>     Formula annotation syntax (default: hash)");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    in_place: bool,
    json: bool,
    config_file: Option<PathBuf>,
    precision: Option<i64>,
    include_header: bool,
    syntax: Option<FormulaSyntax>,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-i" | "--in-place" => parsed.in_place = true,
            "--json" => parsed.json = true,
            "--include-header" => parsed.include_header = true,
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                parsed.config_file = Some(PathBuf::from(&args[i]));
            }
            "--precision" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --precision requires a value");
                    std::process::exit(1);
                }
                match args[i].parse::<i64>() {
                    Ok(p) => parsed.precision = Some(p),
                    Err(_) => {
                        eprintln!("Error: Invalid precision: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--syntax" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --syntax requires a value");
                    std::process::exit(1);
                }
                match args[i].parse::<FormulaSyntax>() {
                    Ok(syntax) => parsed.syntax = Some(syntax),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            "-" if parsed.input.is_none() => parsed.input = Some(PathBuf::from("-")),
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if parsed.input.is_none() {
                    parsed.input = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    if let Err(e) = run(parsed) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let Some(input) = args.input.as_deref() else {
        print_usage();
        bail!("missing input file");
    };
    let from_stdin = input.as_os_str() == "-";
    if from_stdin && args.in_place {
        bail!("--in-place cannot be used when reading stdin");
    }

    let (mut options, warnings) = config::load_options(args.config_file.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    apply_overrides(&mut options, &args);

    let text = if from_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let calc = calculate(&text, &options);
    for warning in &calc.warnings {
        eprintln!("Warning: {}", warning);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&calc.replacements)
            .context("failed to serialize replacements")?;
        println!("{}", json);
        return Ok(());
    }

    let updated = apply_replacements(&text, &calc.replacements)
        .context("failed to apply replacements")?;
    if args.in_place {
        if updated != text {
            std::fs::write(input, &updated)
                .with_context(|| format!("failed to write {}", input.display()))?;
        }
        eprintln!(
            "Updated {} formula(s) in {}",
            calc.replacements.len(),
            input.display()
        );
    } else {
        print!("{}", updated);
    }
    Ok(())
}

fn apply_overrides(options: &mut CalcOptions, args: &Args) {
    if let Some(precision) = args.precision {
        options.precision_rounding = precision;
    }
    if args.include_header {
        options.include_table_header_in_cell_numeration = true;
    }
    if let Some(syntax) = args.syntax {
        options.formula_syntax = syntax;
    }
}
