use std::path::PathBuf;
use std::process;

use clap::{Arg, Command};

use gii2stl::pipeline::{self, Job};

fn cli() -> Command {
    Command::new("gii2stl")
        .about("Convert a pair of GIfTI surfaces to a combined, smoothed STL")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .num_args(1..)
                .required(true)
                .value_name("FILE")
                .help("Input GIfTI surface files (exactly two)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .required(true)
                .value_name("FILE")
                .help("Combined output STL (base name for intermediates and the smoothed result)"),
        )
        .arg(
            Arg::new("smoothing-script")
                .short('s')
                .long("smoothing-script")
                .required(true)
                .value_name("FILE")
                .help("Filter-script file applied to the combined mesh"),
        )
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let matches = cli().get_matches();

    let inputs: Vec<PathBuf> = matches
        .get_many::<String>("input")
        .expect("required argument")
        .map(PathBuf::from)
        .collect();
    if inputs.len() != 2 {
        println!(
            "Please provide exactly two input GIfTI surface files, one per hemisphere."
        );
        process::exit(1);
    }

    let job = Job {
        inputs: [inputs[0].clone(), inputs[1].clone()],
        output: PathBuf::from(matches.get_one::<String>("output").expect("required argument")),
        script: PathBuf::from(
            matches
                .get_one::<String>("smoothing-script")
                .expect("required argument"),
        ),
    };

    if let Err(e) = pipeline::run(&job) {
        log::error!("{e}");
        process::exit(1);
    }
}
