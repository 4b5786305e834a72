// src/main.rs

use runtime_validator::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level, args.verbose()) {
        eprintln!("runtime-validator: {err:#}");
    }

    let code = match run(args).await {
        Ok(exit) => exit.code(),
        Err(err) => {
            eprintln!("runtime-validator error: {err}");
            err.exit_code()
        }
    };

    std::process::exit(code);
}
