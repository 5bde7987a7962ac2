use std::env;
use std::fs;
use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let args: Vec<String> = env::args().collect();
  if args.len() < 2 || args.len() > 3 {
    let program = args.first().map(String::as_str).unwrap_or("parenc");
    eprintln!("usage: {program} <input file> [output base path]");
    process::exit(1);
  }

  let input_path = &args[1];
  let source = match fs::read_to_string(input_path) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("error: could not read {input_path}: {err}");
      process::exit(1);
    }
  };

  match parenc::transpile(&source, input_path) {
    Ok(transpiled) => {
      if let Some(output_base) = args.get(2) {
        let source_path = Path::new(output_base).with_extension("c");
        let header_path = Path::new(output_base).with_extension("h");
        if let Err(err) = fs::write(&source_path, &transpiled.source)
          .and_then(|_| fs::write(&header_path, &transpiled.header))
        {
          eprintln!("error: could not write output: {err}");
          process::exit(1);
        }
      } else {
        print!("{}", transpiled.source);
      }
    }
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}
