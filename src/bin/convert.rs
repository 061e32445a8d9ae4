use clap::Parser;
use lt2opencorpora::{convert::Converter, tagset::TagSet, Error};

#[derive(Parser)]
#[clap(version = "0.1")]
struct Opts {
    /// Source dictionary (plain text, optionally .gz or .bz2).
    input: String,
    /// Destination for the OpenCorpora XML.
    output: String,
    /// Tagset mapping CSV. The bundled mapping is used when omitted.
    #[clap(long, short)]
    mapping: Option<String>,
}

fn run(opts: &Opts) -> Result<(), Error> {
    let tag_set = match &opts.mapping {
        Some(path) => TagSet::from_path(path)?,
        None => TagSet::bundled()?,
    };

    let stats = Converter::new(tag_set).run(&opts.input, &opts.output)?;

    println!(
        "{} lemmata written, {} dropped, {} double forms",
        stats.lemmata_written, stats.lemmata_dropped, stats.doubleforms
    );

    Ok(())
}

fn main() {
    env_logger::init();
    let opts = Opts::parse();

    if let Err(err) = run(&opts) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
