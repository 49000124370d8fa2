use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = segdoc::cli::Cli::parse();
    segdoc::infra::logging::init(cli.verbose);
    segdoc::cli::run(cli)
}
