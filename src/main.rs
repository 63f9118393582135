fn is_json_args() -> bool {
    std::env::args().any(|arg| arg == "--json")
}

fn report(err: &qrgo::CliError) {
    if is_json_args() {
        eprintln!("{}", err.to_json());
    } else {
        eprintln!("Error: {}", err.message);
        if let Some(hint) = &err.hint {
            eprintln!("Hint: {hint}");
        }
    }
}

fn main() {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let raw_args: Vec<String> = std::env::args().collect();
    let parsed = match qrgo::parse_cli(raw_args) {
        Ok(parsed) => parsed,
        Err(err) => {
            report(&err);
            std::process::exit(err.code);
        }
    };

    qrgo::init_tracing(&parsed.cli);
    if let Err(err) = qrgo::run_with_parsed(parsed) {
        report(&err);
        std::process::exit(err.code);
    }
}
